//! Immutable bit sequence handed to every engine call
//!
//! A `BitString` stores one byte per symbol (always 0 or 1) behind an `Arc`, so
//! clones are cheap and the engines can share it across threads. Two content
//! hashes (FNV-1a and SipHash) are computed once at construction; together
//! with the length they form the [`ContentKey`] of the metric cache.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;
use std::sync::Arc;

/// How non-binary characters are treated when parsing text input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputPolicy {
    /// Reject any symbol other than '0'/'1' (whitespace is skipped)
    #[default]
    Strict,
    /// Silently drop every character that is not '0' or '1'
    Sanitize,
}

/// Cache identity of a bit string's content
///
/// Inputs with equal keys are treated as equal content. A false match needs
/// the same length and a simultaneous collision of two unrelated 64-bit
/// hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey {
    /// FNV-1a of length and content, as returned by `content_hash`
    pub hash: u64,
    /// SipHash of the content
    pub check: u64,
    pub len: usize,
}

/// Ordered, immutable sequence over {0, 1}
#[derive(Clone)]
pub struct BitString {
    bits: Arc<[u8]>,
    hash: u64,
    check: u64,
}

impl BitString {
    /// Empty bit string
    pub fn empty() -> Self {
        Self::from_symbols(Vec::new())
    }

    /// Parse text with the strict policy
    ///
    /// # Example
    /// ```
    /// use bitscope::BitString;
    ///
    /// let bits = BitString::parse("1011 0010").unwrap();
    /// assert_eq!(bits.len(), 8);
    /// assert!(BitString::parse("10x1").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, InputPolicy::Strict)
    }

    /// Parse text with an explicit input policy
    pub fn parse_with(text: &str, policy: InputPolicy) -> Result<Self> {
        let mut symbols = Vec::with_capacity(text.len());
        let mut dropped = 0usize;

        for (position, ch) in text.chars().enumerate() {
            match ch {
                '0' => symbols.push(0),
                '1' => symbols.push(1),
                c if c.is_ascii_whitespace() => {}
                c => match policy {
                    InputPolicy::Strict => {
                        return Err(AnalysisError::InvalidSymbol {
                            position,
                            symbol: c,
                        })
                    }
                    InputPolicy::Sanitize => dropped += 1,
                },
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, kept = symbols.len(), "sanitized non-binary input");
        }

        Ok(Self::from_symbols(symbols))
    }

    /// Build from booleans (`true` = 1)
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        Self::from_symbols(bits.into_iter().map(u8::from).collect())
    }

    /// Unpack raw bytes, most significant bit first
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut symbols = Vec::with_capacity(bytes.len() * 8);
        for byte in bytes {
            for shift in (0..8).rev() {
                symbols.push((byte >> shift) & 1);
            }
        }
        Self::from_symbols(symbols)
    }

    fn from_symbols(symbols: Vec<u8>) -> Self {
        let mut hasher = fnv::FnvHasher::default();
        hasher.write_usize(symbols.len());
        hasher.write(&symbols);

        let mut check = DefaultHasher::new();
        check.write(&symbols);

        Self {
            bits: symbols.into(),
            hash: hasher.finish(),
            check: check.finish(),
        }
    }

    /// Copy of the inclusive range `[start, end]`, clamped to the sequence
    pub fn slice(&self, start: usize, end: usize) -> Self {
        if self.bits.is_empty() || start >= self.bits.len() || start > end {
            return Self::empty();
        }
        let end = end.min(self.bits.len() - 1);
        Self::from_symbols(self.bits[start..=end].to_vec())
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Symbol at `index` (0 or 1)
    pub fn get(&self, index: usize) -> Option<u8> {
        self.bits.get(index).copied()
    }

    /// Symbols as a slice of 0/1 bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }

    pub fn count_zeros(&self) -> usize {
        self.len() - self.count_ones()
    }

    /// FNV-1a hash of length and content
    pub fn content_hash(&self) -> u64 {
        self.hash
    }

    /// Key identifying this content in the metric cache
    pub fn content_key(&self) -> ContentKey {
        ContentKey {
            hash: self.hash,
            check: self.check,
            len: self.bits.len(),
        }
    }
}

impl Default for BitString {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for BitString {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.bits == other.bits
    }
}

impl Eq for BitString {}

impl FromStr for BitString {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self
            .bits
            .iter()
            .map(|&b| if b == 1 { '1' } else { '0' })
            .collect();
        f.write_str(&text)
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 64;
        let preview: String = self
            .bits
            .iter()
            .take(PREVIEW)
            .map(|&b| if b == 1 { '1' } else { '0' })
            .collect();
        let ellipsis = if self.len() > PREVIEW { "..." } else { "" };
        write!(f, "BitString({} bits: {}{})", self.len(), preview, ellipsis)
    }
}

/// Render a slice of 0/1 symbols as text
pub(crate) fn symbols_to_string(symbols: &[u8]) -> String {
    symbols
        .iter()
        .map(|&b| if b == 1 { '1' } else { '0' })
        .collect()
}
