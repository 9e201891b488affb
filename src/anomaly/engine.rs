use crate::anomaly::definition::{Anomaly, AnomalyDefinition, Detection, Severity};
use crate::anomaly::rules::DetectorSpec;
use crate::bitstring::BitString;
use crate::config::AnalysisConfig;
use crate::error::{panic_message, AnalysisError, Result};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Detector pack compiled into the binary
const DEFAULT_DETECTORS_TOML: &str = include_str!("../../detectors-default.toml");

/// Registry of anomaly definitions
pub type AnomalyRegistry = Registry<AnomalyDefinition>;

#[derive(Deserialize)]
struct DetectorFile {
    #[serde(default)]
    detector: Vec<DetectorSpec>,
}

/// Parse a `[[detector]]` pack without compiling it
pub fn parse_detector_pack(toml_text: &str) -> Result<Vec<DetectorSpec>> {
    let file: DetectorFile = toml::from_str(toml_text)
        .map_err(|e| AnalysisError::InvalidConfig(format!("detector pack: {}", e)))?;
    Ok(file.detector)
}

/// Specs of the embedded default pack
pub fn default_detector_specs() -> Result<Vec<DetectorSpec>> {
    parse_detector_pack(DEFAULT_DETECTORS_TOML)
}

impl Registry<AnomalyDefinition> {
    /// Compile and register every spec, in order
    pub fn from_specs(specs: &[DetectorSpec]) -> Result<Self> {
        let registry = Self::new();
        for spec in specs {
            registry.register(spec.compile()?)?;
        }
        Ok(registry)
    }

    /// Registry holding the embedded default detectors
    pub fn with_default_detectors() -> Result<Self> {
        Self::from_specs(&default_detector_specs()?)
    }

    /// Enable or disable a definition in place
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.update(id, |current| current.clone().with_enabled(enabled))?
            .map(|_| ())
            .ok_or_else(|| AnalysisError::DetectorNotFound(id.to_string()))
    }
}

/// Counts over one `detect_all` result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_definition: BTreeMap<String, usize>,
}

/// Runs the registered detectors against a bit string
///
/// A detector that returns an error or panics contributes nothing and is
/// logged at warn level; the remaining detectors still run.
#[derive(Debug, Clone)]
pub struct AnomalyEngine {
    registry: Arc<AnomalyRegistry>,
}

impl AnomalyEngine {
    pub fn new(registry: Arc<AnomalyRegistry>) -> Self {
        Self { registry }
    }

    /// Engine over the default pack (if enabled) plus the configured detectors
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let mut specs = if config.anomaly.include_defaults {
            default_detector_specs()?
        } else {
            Vec::new()
        };
        specs.extend(config.detector.iter().cloned());

        let registry = AnomalyRegistry::from_specs(&specs)?;
        for id in &config.anomaly.disabled {
            registry.set_enabled(id, false)?;
        }
        Ok(Self::new(Arc::new(registry)))
    }

    pub fn registry(&self) -> &Arc<AnomalyRegistry> {
        &self.registry
    }

    /// Run one definition
    ///
    /// Unknown ids fail with [`AnalysisError::DetectorNotFound`]. A disabled
    /// or failing definition yields no detections.
    pub fn execute_detection(&self, definition_id: &str, bits: &BitString) -> Result<Vec<Detection>> {
        let definition = self
            .registry
            .get(definition_id)
            .ok_or_else(|| AnalysisError::DetectorNotFound(definition_id.to_string()))?;

        if !definition.enabled {
            debug!(detector = %definition_id, "skipping disabled detector");
            return Ok(Vec::new());
        }
        Ok(detect_isolated(&definition, bits))
    }

    /// Run every enabled definition and merge the findings
    ///
    /// Output is sorted by position; ties keep registration order, then the
    /// order each detector reported them in.
    pub fn detect_all(&self, bits: &BitString) -> Vec<Anomaly> {
        let snapshot = self.registry.snapshot();
        let enabled: Vec<&Arc<AnomalyDefinition>> =
            snapshot.iter().filter(|definition| definition.enabled).collect();

        #[cfg(feature = "parallel")]
        let per_definition: Vec<Vec<Anomaly>> = enabled
            .par_iter()
            .map(|definition| to_anomalies(definition, bits))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let per_definition: Vec<Vec<Anomaly>> = enabled
            .iter()
            .map(|definition| to_anomalies(definition, bits))
            .collect();

        let mut anomalies: Vec<Anomaly> = per_definition.into_iter().flatten().collect();
        anomalies.sort_by_key(|anomaly| anomaly.position);

        debug!(
            bits = bits.len(),
            detectors = enabled.len(),
            anomalies = anomalies.len(),
            "anomaly scan complete"
        );
        anomalies
    }

    /// Tally anomalies by severity and by definition
    pub fn summary(anomalies: &[Anomaly]) -> AnomalySummary {
        let mut summary = AnomalySummary {
            total: anomalies.len(),
            ..AnomalySummary::default()
        };
        for anomaly in anomalies {
            *summary.by_severity.entry(anomaly.severity).or_insert(0) += 1;
            *summary
                .by_definition
                .entry(anomaly.definition_id.clone())
                .or_insert(0) += 1;
        }
        summary
    }
}

fn to_anomalies(definition: &AnomalyDefinition, bits: &BitString) -> Vec<Anomaly> {
    detect_isolated(definition, bits)
        .into_iter()
        .enumerate()
        .map(|(ordinal, detection)| Anomaly::from_detection(definition, detection, ordinal))
        .collect()
}

/// Run a detector, logging and discarding any failure
fn detect_isolated(definition: &AnomalyDefinition, bits: &BitString) -> Vec<Detection> {
    match try_detect(definition, bits) {
        Ok(detections) => detections,
        Err(err) => {
            warn!(detector = %definition.id, error = %err, "detector failed, skipping");
            Vec::new()
        }
    }
}

fn try_detect(definition: &AnomalyDefinition, bits: &BitString) -> Result<Vec<Detection>> {
    let failure = |message: String| AnalysisError::DetectorExecution {
        id: definition.id.clone(),
        message,
    };

    let detections = panic::catch_unwind(AssertUnwindSafe(|| definition.detector.detect(bits)))
        .map_err(|payload| failure(format!("panicked: {}", panic_message(payload.as_ref()))))?
        .map_err(|err| failure(format!("{:#}", err)))?;

    let n = bits.len();
    let total = detections.len();
    let valid: Vec<Detection> = detections
        .into_iter()
        .filter(|detection| detection.fits_within(n))
        .collect();

    if valid.len() < total {
        warn!(
            detector = %definition.id,
            dropped = total - valid.len(),
            bits = n,
            "dropped out-of-range detections"
        );
    }
    Ok(valid)
}
