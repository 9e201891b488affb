use crate::bitstring::{symbols_to_string, BitString};
use crate::pattern::window::for_each_window_key;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// A fixed-width pattern with every position it starts at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Window contents as '0'/'1' text; always `window_size` characters long
    pub pattern: String,
    pub count: usize,
    /// Start positions in ascending order (occurrences may overlap)
    pub positions: Vec<usize>,
}

/// Longest substring that occurs at least twice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedSubstring {
    pub pattern: String,
    pub length: usize,
    /// Every start position of `pattern`, ascending
    pub positions: Vec<usize>,
}

/// Frequency table of all windows of `window_size` bits (step 1)
///
/// Keeps windows seen at least `min_count` times, sorted by count descending;
/// ties keep the order of first occurrence.
///
/// # Example
/// ```
/// use bitscope::{pattern::find_all_patterns, BitString};
///
/// let bits = BitString::parse("10101").unwrap();
/// let patterns = find_all_patterns(&bits, 2, 2);
/// assert_eq!(patterns[0].pattern, "10");
/// assert_eq!(patterns[0].positions, vec![0, 2]);
/// ```
pub fn find_all_patterns(bits: &BitString, window_size: usize, min_count: usize) -> Vec<PatternMatch> {
    let symbols = bits.as_slice();
    let min_count = min_count.max(1);

    // Groups are created in first-occurrence order
    let mut index: FnvHashMap<u128, usize> = FnvHashMap::default();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for_each_window_key(symbols, window_size, |position, key| {
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(position);
    });

    let mut matches: Vec<PatternMatch> = groups
        .into_iter()
        .filter(|positions| positions.len() >= min_count)
        .map(|positions| {
            let first = positions[0];
            PatternMatch {
                pattern: symbols_to_string(&symbols[first..first + window_size]),
                count: positions.len(),
                positions,
            }
        })
        .collect();

    // Stable sort preserves first-occurrence order among equal counts
    matches.sort_by(|a, b| b.count.cmp(&a.count));
    matches
}

/// The `k` most frequent windows of `window_size` bits
pub fn top_patterns(bits: &BitString, window_size: usize, k: usize) -> Vec<PatternMatch> {
    let mut matches = find_all_patterns(bits, window_size, 1);
    matches.truncate(k);
    matches
}

/// Longest substring of at most `max_len` bits occurring two or more times
///
/// Occurrences may overlap. Among equally long candidates the one whose first
/// occurrence starts earliest wins. If a length-L substring repeats, so does
/// its length-(L-1) prefix, so the length is found by doubling a probe width
/// until nothing repeats and then binary searching below it. The number of
/// window scans is O(log L) in the answer L, not in `max_len`.
pub fn find_longest_repeated_substring(bits: &BitString, max_len: usize) -> Option<RepeatedSubstring> {
    let symbols = bits.as_slice();
    if symbols.len() < 2 || max_len == 0 {
        return None;
    }

    let limit = max_len.min(symbols.len() - 1);
    let (length, start) =
        search_longest_width(limit, |width| earliest_repeated_window(symbols, width))?;
    let target = &symbols[start..start + length];
    let positions = occurrences_of(symbols, length, start);

    Some(RepeatedSubstring {
        pattern: symbols_to_string(target),
        length,
        positions,
    })
}

/// Largest width in `1..=limit` for which `probe` finds a start position
///
/// `probe` must be monotone: once a width fails, every larger width fails.
fn search_longest_width<F>(limit: usize, mut probe: F) -> Option<(usize, usize)>
where
    F: FnMut(usize) -> Option<usize>,
{
    let mut best: Option<(usize, usize)> = None;
    let mut lo = 1;
    let mut hi = limit;
    let mut width = 1;

    while width <= limit {
        match probe(width) {
            Some(start) => {
                best = Some((width, start));
                lo = width + 1;
                if width == limit {
                    break;
                }
                width = width.saturating_mul(2).min(limit);
            }
            None => {
                hi = width - 1;
                break;
            }
        }
    }

    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        match probe(mid) {
            Some(start) => {
                best = Some((mid, start));
                lo = mid + 1;
            }
            None => hi = mid - 1,
        }
    }

    best
}

/// Earliest first-occurrence among windows of `width` seen at least twice
fn earliest_repeated_window(symbols: &[u8], width: usize) -> Option<usize> {
    let mut seen: FnvHashMap<u128, (usize, bool)> = FnvHashMap::default();
    for_each_window_key(symbols, width, |position, key| {
        seen.entry(key)
            .and_modify(|(_, repeated)| *repeated = true)
            .or_insert((position, false));
    });

    seen.values()
        .filter(|(_, repeated)| *repeated)
        .map(|(first, _)| *first)
        .min()
}

/// All positions whose window of `width` equals the window at `reference`
fn occurrences_of(symbols: &[u8], width: usize, reference: usize) -> Vec<usize> {
    let mut target_key = None;
    let mut keyed = Vec::new();
    for_each_window_key(symbols, width, |position, key| {
        if position == reference {
            target_key = Some(key);
        }
        keyed.push((position, key));
    });

    match target_key {
        Some(target) => keyed
            .into_iter()
            .filter(|(_, key)| *key == target)
            .map(|(position, _)| position)
            .collect(),
        None => Vec::new(),
    }
}
