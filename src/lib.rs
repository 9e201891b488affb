//! Bitscope - statistics, pattern mining and anomaly detection for bit streams
//!
//! The library computes an extensible catalog of metrics over a [`BitString`]
//! (entropy, chi-square, runs, transitions, compressibility estimates, n-gram
//! diversity, autocorrelation, windowed ideality) and scans the same input
//! with a registry of pluggable anomaly detectors. Failures of individual
//! metrics or detectors are isolated and reported, never fatal to a batch.
//!
//! # Example
//! ```
//! use bitscope::{anomaly::AnomalyEngine, config::AnalysisConfig, metrics::MetricsEngine, BitString};
//!
//! let config = AnalysisConfig::default();
//! let bits = BitString::parse(&"0".repeat(40)).unwrap();
//!
//! let report = MetricsEngine::from_config(&config).unwrap().calculate_all_metrics(&bits);
//! assert_eq!(report.metrics["longest_run"], 40.0);
//!
//! let anomalies = AnomalyEngine::from_config(&config).unwrap().detect_all(&bits);
//! assert_eq!(anomalies[0].definition_id, "long_run");
//! ```

pub mod anomaly;
pub mod bitstring;
pub mod cli;
pub mod compression;
pub mod config;
pub mod error;
pub mod ideality;
pub mod metrics;
pub mod pattern;
pub mod registry;
pub mod report;
pub mod stats;

pub use bitstring::{BitString, ContentKey, InputPolicy};
pub use error::{AnalysisError, Result};
