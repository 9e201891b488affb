//! Compressibility estimators for bit strings
//!
//! None of these run a real compressor. Each turns a statistic of the input
//! into an estimated ratio `original bits / estimated encoded bits`, where a
//! ratio of at least 1 signals compressible content. The only guarantee is
//! ordering: lower-entropy inputs get higher ratios.
//!
//! - **RLE**: `n / (runs · overhead)` from the run-length decomposition.
//! - **Huffman**: `n / ceil(H · n)`, the entropy bound rather than a tree.
//! - **LZ**: an LZ78 factorisation (binary trie, O(n)) costed at
//!   `c · (ceil(log2 c) + 1)` bits, scaled by the saving of coding the
//!   longest repeated substring as a single back-reference.
//!
//! # Example
//!
//! ```
//! use bitscope::{compression, BitString};
//!
//! let bits = BitString::parse(&"0".repeat(64)).unwrap();
//! let estimate = compression::estimate(&bits, 8);
//! assert_eq!(estimate.rle_ratio, 8.0);
//! assert!(estimate.huffman_ratio > 1.0);
//! ```

use crate::bitstring::BitString;
use crate::pattern::find_longest_repeated_substring;
use crate::stats::{entropy, run_lengths};
use serde::{Deserialize, Serialize};

/// Default encoding cost of one run (symbol plus length field)
pub const DEFAULT_RUN_OVERHEAD_BITS: usize = 8;

/// Longest back-reference considered by the LZ estimator
const MAX_BACK_REFERENCE: usize = 1 << 16;

/// All estimator outputs for one input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionEstimate {
    pub rle_ratio: f64,
    pub huffman_ratio: f64,
    pub lz_ratio: f64,
    /// Number of LZ78 phrases
    pub lz_phrases: usize,
    /// Average length of the dictionary match preceding each phrase's literal
    pub mean_match_length: f64,
}

/// LZ78 factorisation summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lz78Parse {
    pub phrases: usize,
    pub mean_match_length: f64,
}

/// Run-length encoding ratio
pub fn rle_ratio(bits: &BitString, per_run_overhead_bits: usize) -> f64 {
    if bits.is_empty() {
        return 0.0;
    }
    let runs = run_lengths(bits).len();
    bits.len() as f64 / (runs * per_run_overhead_bits.max(1)) as f64
}

/// Entropy-bound ratio standing in for a Huffman coder
pub fn huffman_ratio(bits: &BitString) -> f64 {
    let n = bits.len();
    if n == 0 {
        return 0.0;
    }
    let encoded = (entropy(bits) * n as f64).ceil().max(1.0);
    n as f64 / encoded
}

/// Greedy LZ78 parse using a binary trie
///
/// Each phrase is the longest previously seen phrase extended by one literal.
/// A trailing partial phrase counts as a phrase.
pub fn lz78_parse(bits: &BitString) -> Lz78Parse {
    if bits.is_empty() {
        return Lz78Parse::default();
    }

    // children[node][symbol]; 0 means absent since the root is never a child
    let mut children: Vec<[u32; 2]> = vec![[0, 0]];
    let mut node = 0usize;
    let mut match_length = 0usize;
    let mut phrases = 0usize;
    let mut total_match = 0usize;

    for &symbol in bits.as_slice() {
        let next = children[node][symbol as usize];
        if next != 0 {
            node = next as usize;
            match_length += 1;
        } else {
            let created = children.len() as u32;
            children.push([0, 0]);
            children[node][symbol as usize] = created;
            phrases += 1;
            total_match += match_length;
            node = 0;
            match_length = 0;
        }
    }

    if node != 0 {
        phrases += 1;
        total_match += match_length;
    }

    Lz78Parse {
        phrases,
        mean_match_length: total_match as f64 / phrases as f64,
    }
}

/// LZ-style compressibility ratio
pub fn lz_ratio(bits: &BitString) -> f64 {
    let repeat = longest_back_reference(bits);
    lz_ratio_from_parse(bits, &lz78_parse(bits), repeat)
}

/// [`lz_ratio`] with the length of the longest repeated substring already known
///
/// Lengths above the back-reference limit are capped, so passing the
/// unbounded answer of `find_longest_repeated_substring` gives the same value
/// as [`lz_ratio`].
pub fn lz_ratio_with_repeat(bits: &BitString, longest_repeat: usize) -> f64 {
    lz_ratio_from_parse(bits, &lz78_parse(bits), longest_repeat)
}

fn longest_back_reference(bits: &BitString) -> usize {
    find_longest_repeated_substring(bits, MAX_BACK_REFERENCE).map_or(0, |r| r.length)
}

fn lz_ratio_from_parse(bits: &BitString, parse: &Lz78Parse, longest_repeat: usize) -> f64 {
    let n = bits.len();
    if n == 0 {
        return 0.0;
    }

    let phrases = parse.phrases.max(1);
    let dictionary_cost = phrases as f64 * (ceil_log2(phrases) as f64 + 1.0);
    let dictionary_ratio = n as f64 / dictionary_cost;

    // The longest repeat is coded as one back-reference (offset + length),
    // the remainder at the dictionary rate
    let repeat = longest_repeat.min(MAX_BACK_REFERENCE).min(n);
    let reference_cost = 2 * ceil_log2(n).max(1);
    let repeat_factor = if repeat <= reference_cost {
        1.0
    } else {
        n as f64 / (n - repeat + reference_cost) as f64
    };

    dictionary_ratio * repeat_factor
}

/// Normalised LZ78 complexity `c · log2(n) / n`
///
/// At or above 1 for random input, near 0 for highly regular input.
pub fn lz_complexity(bits: &BitString) -> f64 {
    let n = bits.len();
    if n < 2 {
        return 0.0;
    }
    let phrases = lz78_parse(bits).phrases as f64;
    phrases * (n as f64).log2() / n as f64
}

/// Mean number of dictionary bits reused per LZ78 phrase
pub fn mean_match_length(bits: &BitString) -> f64 {
    lz78_parse(bits).mean_match_length
}

/// Run every estimator once
pub fn estimate(bits: &BitString, per_run_overhead_bits: usize) -> CompressionEstimate {
    let parse = lz78_parse(bits);
    CompressionEstimate {
        rle_ratio: rle_ratio(bits, per_run_overhead_bits),
        huffman_ratio: huffman_ratio(bits),
        lz_ratio: lz_ratio_from_parse(bits, &parse, longest_back_reference(bits)),
        lz_phrases: parse.phrases,
        mean_match_length: parse.mean_match_length,
    }
}

fn ceil_log2(value: usize) -> usize {
    if value <= 1 {
        0
    } else {
        (usize::BITS - (value - 1).leading_zeros()) as usize
    }
}
