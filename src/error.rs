//! Error taxonomy for bitstream analysis
//!
//! Input and registry errors are fatal for the single call that raised them.
//! Metric and detector failures are recorded by the batch operations and never
//! abort them; the variants exist so single-unit calls can report them.

use std::any::Any;
use thiserror::Error;

/// Errors raised by the analysis engines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid symbol {symbol:?} at position {position}: expected '0' or '1'")]
    InvalidSymbol { position: usize, symbol: char },

    #[error("Metric '{0}' is not registered")]
    MetricNotFound(String),

    #[error("Detector '{0}' is not registered")]
    DetectorNotFound(String),

    #[error("Metric '{id}' failed: {message}")]
    MetricCompute { id: String, message: String },

    #[error("Detector '{id}' failed: {message}")]
    DetectorExecution { id: String, message: String },

    #[error("Definition '{0}' is already registered")]
    DuplicateDefinition(String),

    #[error("Invalid definition '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
