#![no_main]

use bitscope::config::AnalysisConfig;
use bitscope::metrics::MetricsEngine;
use bitscope::{BitString, InputPolicy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Strict parsing either succeeds or reports a symbol; never panics
        let _ = BitString::parse_with(input, InputPolicy::Strict);

        let Ok(bits) = BitString::parse_with(input, InputPolicy::Sanitize) else {
            panic!("sanitize must accept any text");
        };
        if let Ok(engine) = MetricsEngine::from_config(&AnalysisConfig::default()) {
            let report = engine.calculate_all_metrics(&bits);
            assert!(report.errors.is_empty(), "{:?}", report.errors);
        }
    }

    let _ = BitString::from_bytes(data);
});
