use crate::bitstring::{symbols_to_string, BitString};
use crate::pattern::window::for_each_window_key;
use fnv::FnvHashSet;
use std::collections::BTreeMap;

/// Fixed chunk sizes used for n-gram diversity metrics
pub const CHUNK_SIZES: [usize; 4] = [2, 3, 4, 8];

/// Type alias for n-gram frequency map (chunk text → count)
pub type NGramMap = BTreeMap<String, usize>;

/// Count non-overlapping chunks of `chunk` bits
///
/// A trailing partial chunk is ignored.
///
/// # Example
/// ```
/// use bitscope::{pattern::ngram_distribution, BitString};
///
/// let bits = BitString::parse("1010011").unwrap();
/// let ngrams = ngram_distribution(&bits, 2);
///
/// assert_eq!(ngrams.get("10"), Some(&2));
/// assert_eq!(ngrams.get("01"), Some(&1));
/// ```
pub fn ngram_distribution(bits: &BitString, chunk: usize) -> NGramMap {
    let mut ngrams = NGramMap::new();
    if chunk == 0 {
        return ngrams;
    }

    for window in bits.as_slice().chunks_exact(chunk) {
        *ngrams.entry(symbols_to_string(window)).or_insert(0) += 1;
    }

    ngrams
}

/// Distinct n-grams divided by total n-gram occurrences
///
/// High values indicate diverse content, low values repetitive content.
pub fn ngram_coverage(ngrams: &NGramMap) -> f64 {
    if ngrams.is_empty() {
        return 0.0;
    }

    let unique_count = ngrams.len();
    let total_count: usize = ngrams.values().sum();

    unique_count as f64 / total_count as f64
}

/// Coverage of the non-overlapping `chunk`-bit distribution
pub fn chunk_diversity(bits: &BitString, chunk: usize) -> f64 {
    ngram_coverage(&ngram_distribution(bits, chunk))
}

/// `distinctPatterns / totalPatterns` over sliding windows of `window` bits
pub fn pattern_diversity(bits: &BitString, window: usize) -> f64 {
    let mut distinct = FnvHashSet::default();
    let mut total = 0usize;
    for_each_window_key(bits.as_slice(), window, |_, key| {
        distinct.insert(key);
        total += 1;
    });

    if total == 0 {
        return 0.0;
    }
    distinct.len() as f64 / total as f64
}

/// Most frequent n-grams, ties broken by n-gram text
pub fn top_ngrams(ngrams: &NGramMap, k: usize) -> Vec<(String, usize)> {
    let mut ngram_vec: Vec<_> = ngrams
        .iter()
        .map(|(ngram, count)| (ngram.clone(), *count))
        .collect();

    // BTreeMap iteration is already ordered by text, stable sort keeps it
    ngram_vec.sort_by(|a, b| b.1.cmp(&a.1));

    ngram_vec.into_iter().take(k).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> BitString {
        BitString::parse(s).unwrap()
    }

    #[test]
    fn test_ngram_distribution_nibbles() {
        let ngrams = ngram_distribution(&bits("1111000011110101"), 4);
        assert_eq!(ngrams.len(), 3);
        assert_eq!(ngrams.get("1111"), Some(&2));
        assert_eq!(ngrams.get("0000"), Some(&1));
        assert_eq!(ngrams.get("0101"), Some(&1));
    }

    #[test]
    fn test_ngram_distribution_drops_partial_tail() {
        let ngrams = ngram_distribution(&bits("10110"), 2);
        let total: usize = ngrams.values().sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_ngram_distribution_zero_chunk() {
        assert!(ngram_distribution(&bits("1010"), 0).is_empty());
    }

    #[test]
    fn test_ngram_coverage() {
        let mut ngrams = NGramMap::new();
        ngrams.insert("00".to_string(), 1);
        ngrams.insert("01".to_string(), 1);
        ngrams.insert("10".to_string(), 1);

        // 3 unique n-grams, 3 total occurrences = 100% coverage
        assert_eq!(ngram_coverage(&ngrams), 1.0);
    }

    #[test]
    fn test_ngram_coverage_repetitive() {
        let mut ngrams = NGramMap::new();
        ngrams.insert("00".to_string(), 10);
        ngrams.insert("11".to_string(), 1);

        // 2 unique n-grams, 11 total occurrences = ~18% coverage
        let coverage = ngram_coverage(&ngrams);
        assert!((coverage - 0.181).abs() < 0.01);
    }

    #[test]
    fn test_pattern_diversity() {
        // windows of 2 over "0000": 00 x3 -> 1/3
        assert!((pattern_diversity(&bits("0000"), 2) - 1.0 / 3.0).abs() < 1e-12);
        // windows of 2 over "0110": 01, 11, 10 -> 3/3
        assert_eq!(pattern_diversity(&bits("0110"), 2), 1.0);
        assert_eq!(pattern_diversity(&bits("0"), 2), 0.0);
    }

    #[test]
    fn test_chunk_diversity_constant() {
        assert_eq!(chunk_diversity(&bits("00000000"), 2), 0.25);
        assert_eq!(chunk_diversity(&bits(""), 8), 0.0);
    }

    #[test]
    fn test_top_ngrams() {
        let mut ngrams = NGramMap::new();
        ngrams.insert("00".to_string(), 10);
        ngrams.insert("01".to_string(), 5);
        ngrams.insert("11".to_string(), 5);
        ngrams.insert("10".to_string(), 1);

        let top = top_ngrams(&ngrams, 3);

        assert_eq!(top.len(), 3);
        assert_eq!(top[0], ("00".to_string(), 10));
        assert_eq!(top[1], ("01".to_string(), 5));
        assert_eq!(top[2], ("11".to_string(), 5));
    }
}
