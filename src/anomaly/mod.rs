// Anomaly detection over bit strings
//
// Definitions live in a copy-on-write registry and each wraps a `Detector`,
// the only capability a detection rule is given: read the bit string, return
// detections. Rules loaded from configuration are compiled from a small
// declarative language (runs, literal patterns, regular expressions, density
// windows) rather than executed as code.
//
// The engine isolates every detector. Errors and panics are logged and the
// detector contributes nothing; detections outside the input are dropped.

mod definition;
mod engine;
mod rules;

pub use definition::{Anomaly, AnomalyDefinition, Detection, Detector, Severity};
pub use engine::{
    default_detector_specs, parse_detector_pack, AnomalyEngine, AnomalyRegistry, AnomalySummary,
};
pub use rules::{
    DensityDetector, DetectorRule, DetectorSpec, PatternDetector, RegexDetector, RunDetector,
};
