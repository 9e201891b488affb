//! Windowed repetition ("ideality") scoring
//!
//! A range is split into `window_size`-aligned chunks starting at `start`.
//! A chunk is *repeating* when it equals the chunk immediately before or
//! after it, so a range made of k ≥ 2 copies of one block scores 100%. A
//! trailing partial chunk never repeats but still counts toward `total_bits`.
//!
//! Chunks are disjoint and each is compared with one neighbour, so a full
//! scan costs O(range length) regardless of the window size.

use crate::bitstring::BitString;
use serde::{Deserialize, Serialize};

/// Window sizes evaluated by [`calculate_all_idealities`]
pub const DEFAULT_WINDOW_SIZES: [usize; 12] = [2, 3, 4, 5, 6, 7, 8, 10, 12, 16, 24, 32];

/// Ideality of one range at one window size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdealityResult {
    pub window_size: usize,
    /// `repeating_count / total_bits · 100`, within [0, 100]
    pub ideality_percentage: f64,
    /// Bits that belong to repeating chunks
    pub repeating_count: usize,
    /// Length of the evaluated range
    pub total_bits: usize,
    /// Absolute indices of every bit in a repeating chunk, ascending
    pub ideal_bit_indices: Vec<usize>,
}

impl IdealityResult {
    fn zeroed(window_size: usize) -> Self {
        Self {
            window_size,
            ideality_percentage: 0.0,
            repeating_count: 0,
            total_bits: 0,
            ideal_bit_indices: Vec::new(),
        }
    }
}

/// Score the inclusive range `[start, end]` at `window_size`
///
/// `end` is clamped to the last bit. Returns a zeroed result when
/// `start >= end` (after clamping) or `window_size < 1`.
///
/// # Example
/// ```
/// use bitscope::{ideality::calculate_ideality, BitString};
///
/// let bits = BitString::parse("10101010").unwrap();
/// let result = calculate_ideality(&bits, 2, 0, 7);
/// assert_eq!(result.ideality_percentage, 100.0);
/// ```
pub fn calculate_ideality(
    bits: &BitString,
    window_size: usize,
    start: usize,
    end: usize,
) -> IdealityResult {
    if window_size < 1 || bits.is_empty() {
        return IdealityResult::zeroed(window_size);
    }
    let end = end.min(bits.len() - 1);
    if start >= end {
        return IdealityResult::zeroed(window_size);
    }

    let range = &bits.as_slice()[start..=end];
    let chunks: Vec<&[u8]> = range.chunks_exact(window_size).collect();

    let mut repeating = vec![false; chunks.len()];
    for i in 1..chunks.len() {
        if chunks[i] == chunks[i - 1] {
            repeating[i - 1] = true;
            repeating[i] = true;
        }
    }

    let ideal_bit_indices: Vec<usize> = repeating
        .iter()
        .enumerate()
        .filter(|(_, &is_repeating)| is_repeating)
        .flat_map(|(chunk, _)| {
            let chunk_start = start + chunk * window_size;
            chunk_start..chunk_start + window_size
        })
        .collect();

    let total_bits = range.len();
    let repeating_count = ideal_bit_indices.len();

    IdealityResult {
        window_size,
        ideality_percentage: repeating_count as f64 / total_bits as f64 * 100.0,
        repeating_count,
        total_bits,
        ideal_bit_indices,
    }
}

/// Score `[start, end]` at every size in [`DEFAULT_WINDOW_SIZES`]
pub fn calculate_all_idealities(bits: &BitString, start: usize, end: usize) -> Vec<IdealityResult> {
    calculate_idealities_for(bits, start, end, &DEFAULT_WINDOW_SIZES)
}

/// Score `[start, end]` at each of `window_sizes`, in the given order
pub fn calculate_idealities_for(
    bits: &BitString,
    start: usize,
    end: usize,
    window_sizes: &[usize],
) -> Vec<IdealityResult> {
    window_sizes
        .iter()
        .map(|&window_size| calculate_ideality(bits, window_size, start, end))
        .collect()
}

/// Highest-scoring result; the smallest window wins ties
pub fn best_ideality(results: &[IdealityResult]) -> Option<&IdealityResult> {
    results.iter().fold(None, |best: Option<&IdealityResult>, candidate| match best {
        Some(current) if current.ideality_percentage >= candidate.ideality_percentage => {
            Some(current)
        }
        _ => Some(candidate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn bits(s: &str) -> BitString {
        BitString::parse(s).unwrap()
    }

    #[test]
    fn test_alternating_window_two_is_ideal() {
        let result = calculate_ideality(&bits("10101010"), 2, 0, 7);
        assert_eq!(result.ideality_percentage, 100.0);
        assert_eq!(result.repeating_count, 8);
        assert_eq!(result.total_bits, 8);
        assert_eq!(result.ideal_bit_indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_repeated_block_scores_hundred() {
        for (block, copies) in [("110", 2), ("1011", 5), ("0", 9), ("1110001010", 3)] {
            let input = block.repeat(copies);
            let b = bits(&input);
            let result = calculate_ideality(&b, block.len(), 0, b.len() - 1);
            assert_eq!(result.ideality_percentage, 100.0, "block {}", block);
        }
    }

    #[test]
    fn test_partial_repetition() {
        // chunks of 4: 1100 1100 1010 | tail "11"
        let result = calculate_ideality(&bits("11001100101011"), 4, 0, 13);
        assert_eq!(result.repeating_count, 8);
        assert_eq!(result.total_bits, 14);
        assert_eq!(result.ideal_bit_indices, (0..8).collect::<Vec<_>>());
        assert!((result.ideality_percentage - 8.0 / 14.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_offset_range_reports_absolute_indices() {
        let result = calculate_ideality(&bits("0001010"), 2, 3, 6);
        // range "1010" -> chunks 10, 10
        assert_eq!(result.ideal_bit_indices, vec![3, 4, 5, 6]);
        assert_eq!(result.ideality_percentage, 100.0);
    }

    #[test]
    fn test_zeroed_results() {
        let b = bits("10101010");
        assert_eq!(calculate_ideality(&b, 0, 0, 7), IdealityResult::zeroed(0));
        assert_eq!(calculate_ideality(&b, 2, 5, 5), IdealityResult::zeroed(2));
        assert_eq!(calculate_ideality(&b, 2, 6, 3), IdealityResult::zeroed(2));
        assert_eq!(calculate_ideality(&bits(""), 2, 0, 7), IdealityResult::zeroed(2));
        assert_eq!(calculate_ideality(&b, 2, 9, 20), IdealityResult::zeroed(2));
    }

    #[test]
    fn test_end_is_clamped() {
        let result = calculate_ideality(&bits("1111"), 1, 0, 100);
        assert_eq!(result.total_bits, 4);
        assert_eq!(result.ideality_percentage, 100.0);
    }

    #[test]
    fn test_random_input_scores_low() {
        let mut rng = StdRng::seed_from_u64(5);
        let b = BitString::from_bits((0..100_000).map(|_| rng.gen::<bool>()));
        let result = calculate_ideality(&b, 8, 0, b.len() - 1);
        assert!(result.ideality_percentage < 2.0);
    }

    #[test]
    fn test_all_idealities_follow_catalog() {
        let b = bits(&"01".repeat(48));
        let results = calculate_all_idealities(&b, 0, b.len() - 1);
        assert_eq!(results.len(), DEFAULT_WINDOW_SIZES.len());
        for (result, &size) in results.iter().zip(DEFAULT_WINDOW_SIZES.iter()) {
            assert_eq!(result.window_size, size);
        }
        // every even window divides the period
        assert_eq!(results[0].ideality_percentage, 100.0);
        // window 3 chunks alternate 010 / 101 and never repeat
        assert_eq!(results[1].ideality_percentage, 0.0);
    }

    #[test]
    fn test_best_ideality_prefers_smallest_window_on_tie() {
        let b = bits(&"0110".repeat(8));
        let results = calculate_idealities_for(&b, 0, b.len() - 1, &[3, 4, 8]);
        let best = best_ideality(&results).unwrap();
        assert_eq!(best.window_size, 4);
        assert_eq!(best.ideality_percentage, 100.0);
        assert!(best_ideality(&[]).is_none());
    }
}
