// Fixed-window pattern mining over bit strings
//
// Sliding-window frequency tables, longest repeated substring, fixed-chunk
// n-gram distributions and first-order transition analysis.
//
// Windows of up to 64 bits are compared as packed integers; longer windows
// use a double rolling hash, so no scan ever compares substrings symbol by
// symbol.

mod ngram;
mod search;
mod transition;
mod window;

pub use ngram::{
    chunk_diversity, ngram_coverage, ngram_distribution, pattern_diversity, top_ngrams, NGramMap,
    CHUNK_SIZES,
};
pub use search::{
    find_all_patterns, find_longest_repeated_substring, top_patterns, PatternMatch,
    RepeatedSubstring,
};
pub use transition::TransitionMatrix;

pub(crate) use window::for_each_window_key;
