//! Property-based tests for the core invariants of bitscope
//!
//! Covers:
//! 1. Entropy range and zero-entropy characterisation
//! 2. Run-length round trip
//! 3. Pattern table shape (width, min count, ordering, coverage)
//! 4. Ideality of exact repetitions
//! 5. Anomaly ordering and bounds
//! 6. Metric batches never failing on valid input

use bitscope::anomaly::{AnomalyEngine, AnomalyRegistry};
use bitscope::config::AnalysisConfig;
use bitscope::ideality::calculate_ideality;
use bitscope::metrics::MetricsEngine;
use bitscope::pattern::{find_all_patterns, find_longest_repeated_substring};
use bitscope::{stats, BitString};
use proptest::prelude::*;
use std::sync::Arc;

fn bit_strings(max_len: usize) -> impl Strategy<Value = BitString> {
    prop::collection::vec(any::<bool>(), 0..max_len).prop_map(BitString::from_bits)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_entropy_in_unit_range(bits in bit_strings(512)) {
        let h = stats::entropy(&bits);
        prop_assert!((0.0..=1.0).contains(&h));

        let constant = !bits.is_empty()
            && (bits.count_ones() == 0 || bits.count_zeros() == 0);
        prop_assert_eq!(h == 0.0, bits.is_empty() || constant);
    }

    #[test]
    fn prop_run_lengths_round_trip(bits in bit_strings(512)) {
        let runs = stats::run_lengths(&bits);
        let total: usize = runs.iter().map(|r| r.length).sum();
        prop_assert_eq!(total, bits.len());

        let rebuilt: Vec<u8> = runs
            .iter()
            .flat_map(|r| std::iter::repeat(r.symbol).take(r.length))
            .collect();
        prop_assert_eq!(rebuilt.as_slice(), bits.as_slice());

        // adjacent runs always differ
        for pair in runs.windows(2) {
            prop_assert_ne!(pair[0].symbol, pair[1].symbol);
        }
    }

    #[test]
    fn prop_transitions_match_runs(bits in bit_strings(512)) {
        let t = stats::transitions(&bits);
        prop_assert_eq!(t.total, stats::run_lengths(&bits).len().saturating_sub(1));
        prop_assert!((0.0..=1.0).contains(&t.rate));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(150))]

    #[test]
    fn prop_patterns_respect_width_and_min_count(
        bits in bit_strings(400),
        window in 1usize..12,
        min_count in 1usize..5,
    ) {
        let patterns = find_all_patterns(&bits, window, min_count);
        for p in &patterns {
            prop_assert_eq!(p.pattern.len(), window);
            prop_assert!(p.count >= min_count);
            prop_assert_eq!(p.count, p.positions.len());
        }
        for pair in patterns.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
            if pair[0].count == pair[1].count {
                prop_assert!(pair[0].positions[0] < pair[1].positions[0]);
            }
        }

        if min_count == 1 {
            let covered: usize = patterns.iter().map(|p| p.count).sum();
            prop_assert_eq!(covered, (bits.len() + 1).saturating_sub(window));
        }
    }

    #[test]
    fn prop_longest_repeat_really_repeats(bits in bit_strings(300)) {
        if let Some(repeat) = find_longest_repeated_substring(&bits, usize::MAX) {
            prop_assert!(repeat.positions.len() >= 2);
            let text = bits.to_string();
            for &p in &repeat.positions {
                prop_assert_eq!(&text[p..p + repeat.length], repeat.pattern.as_str());
            }
        }
    }

    #[test]
    fn prop_repeated_block_is_fully_ideal(
        block in prop::collection::vec(any::<bool>(), 1..16),
        copies in 2usize..8,
    ) {
        let width = block.len();
        let bits = BitString::from_bits(
            std::iter::repeat(block).take(copies).flatten(),
        );
        let result = calculate_ideality(&bits, width, 0, bits.len() - 1);
        prop_assert_eq!(result.ideality_percentage, 100.0);
        prop_assert_eq!(result.repeating_count, bits.len());
    }

    #[test]
    fn prop_ideality_percentage_bounded(
        bits in bit_strings(300),
        window in 1usize..20,
    ) {
        let end = bits.len().saturating_sub(1);
        let result = calculate_ideality(&bits, window, 0, end);
        prop_assert!((0.0..=100.0).contains(&result.ideality_percentage));
        prop_assert_eq!(result.repeating_count, result.ideal_bit_indices.len());
        prop_assert!(result.ideal_bit_indices.iter().all(|&i| i < bits.len()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(60))]

    #[test]
    fn prop_detect_all_sorted_and_in_bounds(bits in bit_strings(600)) {
        let engine = AnomalyEngine::new(Arc::new(
            AnomalyRegistry::with_default_detectors().unwrap(),
        ));
        let anomalies = engine.detect_all(&bits);

        for pair in anomalies.windows(2) {
            prop_assert!(pair[0].position <= pair[1].position);
        }
        for a in &anomalies {
            prop_assert!(a.position + a.length <= bits.len());
        }
    }

    #[test]
    fn prop_metric_batch_never_fails(bits in bit_strings(600)) {
        let engine = MetricsEngine::from_config(&AnalysisConfig::default()).unwrap();
        let report = engine.calculate_all_metrics(&bits);

        prop_assert!(report.success);
        prop_assert!(report.errors.is_empty());
        prop_assert!(report.core_metrics_computed);
        prop_assert!(report.metrics.values().all(|v| v.is_finite()));
    }
}
