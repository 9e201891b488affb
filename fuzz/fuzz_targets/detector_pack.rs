#![no_main]

use bitscope::anomaly::{parse_detector_pack, AnomalyEngine, AnomalyRegistry};
use bitscope::BitString;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(specs) = parse_detector_pack(text) else {
        return;
    };
    // Specs that compile must scan arbitrary input without panicking
    if let Ok(registry) = AnomalyRegistry::from_specs(&specs) {
        let engine = AnomalyEngine::new(Arc::new(registry));
        let bits = BitString::from_bytes(text.as_bytes());
        for anomaly in engine.detect_all(&bits) {
            assert!(anomaly.position + anomaly.length <= bits.len());
        }
    }
});
