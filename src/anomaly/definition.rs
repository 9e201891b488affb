use crate::bitstring::BitString;
use crate::registry::Identified;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Severity level attached to every anomaly a definition reports
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(label)
    }
}

/// Raw finding from one detector call
///
/// Valid detections satisfy `position + length <= n` for the scanned input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub position: usize,
    pub length: usize,
}

impl Detection {
    pub fn new(position: usize, length: usize) -> Self {
        Self { position, length }
    }

    /// True when the detection lies inside a sequence of `len` bits
    pub fn fits_within(&self, len: usize) -> bool {
        self.position
            .checked_add(self.length)
            .map_or(false, |end| end <= len)
    }
}

/// Capability boundary for pluggable detection logic
///
/// A detector sees the bit string and nothing else, and can only answer with
/// detections. Rules supplied from outside the process are compiled into
/// implementations of this trait (see [`DetectorRule`](super::DetectorRule)),
/// never executed as code.
pub trait Detector: Send + Sync {
    fn detect(&self, bits: &BitString) -> anyhow::Result<Vec<Detection>>;
}

/// Adapter for trusted in-process closures
struct FnDetector<F>(F);

impl<F> Detector for FnDetector<F>
where
    F: Fn(&BitString) -> anyhow::Result<Vec<Detection>> + Send + Sync,
{
    fn detect(&self, bits: &BitString) -> anyhow::Result<Vec<Detection>> {
        (self.0)(bits)
    }
}

/// Named, pluggable rule scanning a bit string for one motif
#[derive(Clone)]
pub struct AnomalyDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub severity: Severity,
    pub enabled: bool,
    pub detector: Arc<dyn Detector>,
}

impl AnomalyDefinition {
    /// Enabled, medium-severity definition in the "custom" category
    pub fn new<D>(id: impl Into<String>, name: impl Into<String>, detector: D) -> Self
    where
        D: Detector + 'static,
    {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: "custom".to_string(),
            severity: Severity::Medium,
            enabled: true,
            detector: Arc::new(detector),
        }
    }

    /// Definition backed by a trusted closure
    pub fn from_fn<F>(id: impl Into<String>, name: impl Into<String>, detect: F) -> Self
    where
        F: Fn(&BitString) -> anyhow::Result<Vec<Detection>> + Send + Sync + 'static,
    {
        Self::new(id, name, FnDetector(detect))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Identified for AnomalyDefinition {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for AnomalyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnomalyDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Detection enriched with its definition's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    /// `definitionId-position-ordinal`
    pub id: String,
    pub definition_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub severity: Severity,
    pub position: usize,
    pub length: usize,
}

impl Anomaly {
    pub(crate) fn from_detection(
        definition: &AnomalyDefinition,
        detection: Detection,
        ordinal: usize,
    ) -> Self {
        Self {
            id: format!("{}-{}-{}", definition.id, detection.position, ordinal),
            definition_id: definition.id.clone(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            category: definition.category.clone(),
            severity: definition.severity,
            position: detection.position,
            length: detection.length,
        }
    }

    /// Inclusive index of the last flagged bit
    pub fn end(&self) -> usize {
        (self.position + self.length).saturating_sub(1)
    }
}
