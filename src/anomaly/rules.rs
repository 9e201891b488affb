use crate::anomaly::definition::{AnomalyDefinition, Detection, Detector, Severity};
use crate::bitstring::BitString;
use crate::error::{AnalysisError, Result};
use crate::pattern::for_each_window_key;
use crate::stats::run_lengths;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Compiled-size ceiling for regex rules
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Constrained rule language for externally supplied detectors
///
/// # Example TOML
/// ```toml
/// [[detector]]
/// id = "long_run"
/// name = "Long run"
/// severity = "medium"
/// kind = "run"
/// min_length = 8
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectorRule {
    /// Maximal runs of at least `min_length` bits, optionally of one symbol
    Run {
        min_length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol: Option<u8>,
    },

    /// Occurrences of a literal bit pattern such as "01111110"
    Pattern {
        pattern: String,
        #[serde(default = "default_true")]
        overlapping: bool,
    },

    /// Matches of a regular expression over the '0'/'1' text
    Regex { expression: String },

    /// Non-overlapping windows whose ones ratio falls outside the bounds
    Density {
        window: usize,
        #[serde(default)]
        min_ratio: f64,
        #[serde(default = "default_one")]
        max_ratio: f64,
    },
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_category() -> String {
    "custom".to_string()
}

/// One `[[detector]]` entry of a rule pack
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DetectorSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub rule: DetectorRule,
}

impl DetectorSpec {
    /// Validate the rule and turn it into a registrable definition
    pub fn compile(&self) -> Result<AnomalyDefinition> {
        let detector = self.rule.compile(&self.id)?;
        Ok(AnomalyDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            severity: self.severity,
            enabled: self.enabled,
            detector,
        })
    }
}

impl DetectorRule {
    /// Check parameters and build the detector
    pub fn compile(&self, id: &str) -> Result<Arc<dyn Detector>> {
        let invalid = |reason: String| AnalysisError::InvalidDefinition {
            id: id.to_string(),
            reason,
        };

        match self {
            DetectorRule::Run { min_length, symbol } => {
                if *min_length == 0 {
                    return Err(invalid("min_length must be at least 1".to_string()));
                }
                if let Some(s) = symbol {
                    if *s > 1 {
                        return Err(invalid(format!("symbol must be 0 or 1, got {}", s)));
                    }
                }
                Ok(Arc::new(RunDetector {
                    min_length: *min_length,
                    symbol: *symbol,
                }))
            }
            DetectorRule::Pattern {
                pattern,
                overlapping,
            } => {
                let parsed = BitString::parse(pattern)
                    .map_err(|e| invalid(format!("pattern: {}", e)))?;
                if parsed.is_empty() {
                    return Err(invalid("pattern must not be empty".to_string()));
                }
                Ok(Arc::new(PatternDetector::new(&parsed, *overlapping)))
            }
            DetectorRule::Regex { expression } => {
                let regex = RegexBuilder::new(expression)
                    .size_limit(REGEX_SIZE_LIMIT)
                    .build()
                    .map_err(|e| invalid(format!("regex: {}", e)))?;
                Ok(Arc::new(RegexDetector { regex }))
            }
            DetectorRule::Density {
                window,
                min_ratio,
                max_ratio,
            } => {
                if *window == 0 {
                    return Err(invalid("window must be at least 1".to_string()));
                }
                if !(0.0..=1.0).contains(min_ratio)
                    || !(0.0..=1.0).contains(max_ratio)
                    || min_ratio > max_ratio
                {
                    return Err(invalid(format!(
                        "ratios must satisfy 0 <= min_ratio <= max_ratio <= 1, got [{}, {}]",
                        min_ratio, max_ratio
                    )));
                }
                Ok(Arc::new(DensityDetector {
                    window: *window,
                    min_ratio: *min_ratio,
                    max_ratio: *max_ratio,
                }))
            }
        }
    }
}

/// Maximal runs of identical bits
#[derive(Debug, Clone)]
pub struct RunDetector {
    pub min_length: usize,
    pub symbol: Option<u8>,
}

impl Detector for RunDetector {
    fn detect(&self, bits: &BitString) -> anyhow::Result<Vec<Detection>> {
        let mut detections = Vec::new();
        let mut position = 0;
        for run in run_lengths(bits) {
            let symbol_matches = self.symbol.map_or(true, |s| s == run.symbol);
            if symbol_matches && run.length >= self.min_length {
                detections.push(Detection::new(position, run.length));
            }
            position += run.length;
        }
        Ok(detections)
    }
}

/// Literal pattern occurrences
#[derive(Debug, Clone)]
pub struct PatternDetector {
    width: usize,
    key: u128,
    overlapping: bool,
}

impl PatternDetector {
    pub fn new(pattern: &BitString, overlapping: bool) -> Self {
        let mut key = 0;
        for_each_window_key(pattern.as_slice(), pattern.len(), |_, k| key = k);
        Self {
            width: pattern.len(),
            key,
            overlapping,
        }
    }
}

impl Detector for PatternDetector {
    fn detect(&self, bits: &BitString) -> anyhow::Result<Vec<Detection>> {
        let mut detections = Vec::new();
        let mut next_free = 0;
        for_each_window_key(bits.as_slice(), self.width, |position, key| {
            if key != self.key || (!self.overlapping && position < next_free) {
                return;
            }
            detections.push(Detection::new(position, self.width));
            next_free = position + self.width;
        });
        Ok(detections)
    }
}

/// Regular-expression matches over the bit text
#[derive(Debug, Clone)]
pub struct RegexDetector {
    regex: Regex,
}

impl Detector for RegexDetector {
    fn detect(&self, bits: &BitString) -> anyhow::Result<Vec<Detection>> {
        // One ASCII byte per bit, so byte offsets are bit positions
        let text = bits.to_string();
        Ok(self
            .regex
            .find_iter(&text)
            .filter(|m| !m.is_empty())
            .map(|m| Detection::new(m.start(), m.len()))
            .collect())
    }
}

/// Windows whose ones density is out of bounds
#[derive(Debug, Clone)]
pub struct DensityDetector {
    window: usize,
    min_ratio: f64,
    max_ratio: f64,
}

impl Detector for DensityDetector {
    fn detect(&self, bits: &BitString) -> anyhow::Result<Vec<Detection>> {
        Ok(bits
            .as_slice()
            .chunks_exact(self.window)
            .enumerate()
            .filter_map(|(i, chunk)| {
                let ones = chunk.iter().filter(|&&b| b == 1).count();
                let ratio = ones as f64 / self.window as f64;
                (ratio < self.min_ratio || ratio > self.max_ratio)
                    .then(|| Detection::new(i * self.window, self.window))
            })
            .collect())
    }
}
