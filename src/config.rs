// Analysis configuration loaded from TOML
//
// Every table and field is optional; a missing value takes its default, so an
// empty file is a valid configuration.

use crate::anomaly::DetectorSpec;
use crate::bitstring::InputPolicy;
use crate::error::{AnalysisError, Result};
use crate::ideality::DEFAULT_WINDOW_SIZES;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Metric ids that must succeed for a report to count as core-complete
pub const DEFAULT_CORE_METRICS: [&str; 6] = [
    "length",
    "ones_count",
    "zeros_count",
    "ones_ratio",
    "entropy",
    "transitions",
];

/// Top-level configuration
///
/// # Example
/// ```
/// use bitscope::config::AnalysisConfig;
///
/// let config = AnalysisConfig::from_toml_str("[metrics]\ncanonical_window = 16\n").unwrap();
/// assert_eq!(config.metrics.canonical_window, 16);
/// assert_eq!(config.metrics.rle_run_overhead_bits, 8);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub input: InputConfig,
    pub metrics: MetricsConfig,
    pub ideality: IdealityConfig,
    pub anomaly: AnomalyConfig,
    /// Extra detectors, registered after the default pack
    pub detector: Vec<DetectorSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub policy: InputPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Mandatory baseline checked by `core_metrics_computed`
    pub core: Vec<String>,
    /// Window size for `pattern_diversity`
    pub canonical_window: usize,
    /// Cost of one run in the RLE estimate
    pub rle_run_overhead_bits: usize,
    /// One `autocorrelation_lag_{k}` metric per lag
    pub autocorrelation_lags: Vec<usize>,
    pub cache: bool,
    pub cache_capacity: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            core: DEFAULT_CORE_METRICS.iter().map(|id| id.to_string()).collect(),
            canonical_window: 8,
            rle_run_overhead_bits: 8,
            autocorrelation_lags: vec![1, 2, 4, 8],
            cache: true,
            cache_capacity: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdealityConfig {
    /// Window sizes scored by the `best_ideality` metric and `ideality --all`
    pub window_sizes: Vec<usize>,
}

impl Default for IdealityConfig {
    fn default() -> Self {
        Self {
            window_sizes: DEFAULT_WINDOW_SIZES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Register the embedded default detector pack
    pub include_defaults: bool,
    /// Detector ids registered but switched off
    pub disabled: Vec<String>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            disabled: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Reject non-binary input before any computation
    pub fn strict() -> Self {
        Self {
            input: InputConfig {
                policy: InputPolicy::Strict,
            },
            ..Self::default()
        }
    }

    /// Drop non-binary characters instead of failing
    pub fn permissive() -> Self {
        Self {
            input: InputConfig {
                policy: InputPolicy::Sanitize,
            },
            ..Self::default()
        }
    }

    /// Load and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(AnalysisError::InvalidConfig(message));
        let metrics = &self.metrics;

        if metrics.canonical_window == 0 {
            return invalid("metrics.canonical_window must be >= 1".to_string());
        }
        if metrics.rle_run_overhead_bits == 0 {
            return invalid("metrics.rle_run_overhead_bits must be >= 1".to_string());
        }
        if metrics.cache && metrics.cache_capacity == 0 {
            return invalid("metrics.cache_capacity must be >= 1 when caching".to_string());
        }

        let mut lags = HashSet::new();
        for &lag in &metrics.autocorrelation_lags {
            if lag == 0 {
                return invalid("metrics.autocorrelation_lags must be >= 1".to_string());
            }
            if !lags.insert(lag) {
                return invalid(format!("metrics.autocorrelation_lags repeats lag {}", lag));
            }
        }

        if self.ideality.window_sizes.is_empty() {
            return invalid("ideality.window_sizes must not be empty".to_string());
        }
        if self.ideality.window_sizes.contains(&0) {
            return invalid("ideality.window_sizes must be >= 1".to_string());
        }

        let mut ids = HashSet::new();
        for spec in &self.detector {
            if !ids.insert(spec.id.as_str()) {
                return invalid(format!("detector '{}' is defined twice", spec.id));
            }
            spec.rule.compile(&spec.id)?;
        }

        Ok(())
    }
}
