use crate::bitstring::BitString;
use crate::compression;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::ideality::{best_ideality, calculate_idealities_for};
use crate::metrics::definition::{MetricCategory, MetricDefinition};
use crate::pattern::{chunk_diversity, find_longest_repeated_substring, pattern_diversity, TransitionMatrix};
use crate::registry::Registry;
use crate::stats;
use parking_lot::Mutex;
use std::sync::Arc;

/// Registry of metric definitions
pub type MetricRegistry = Registry<MetricDefinition>;

/// Longest-repeat length of the last input seen, shared by the metrics that
/// need it so one batch runs the search once
///
/// The lock is held while searching, so a concurrent caller on the same input
/// waits and reuses the result.
#[derive(Default)]
struct LongestRepeatMemo {
    last: Mutex<Option<(BitString, usize)>>,
}

impl LongestRepeatMemo {
    fn length(&self, bits: &BitString) -> usize {
        let mut last = self.last.lock();
        if let Some((seen, length)) = last.as_ref() {
            if seen == bits {
                return *length;
            }
        }
        let length = find_longest_repeated_substring(bits, usize::MAX).map_or(0, |r| r.length);
        *last = Some((bits.clone(), length));
        length
    }
}

/// Built-in metric catalog, parameterised by `config`
///
/// Ids are stable and unique; one `autocorrelation_lag_{k}` metric is added
/// per configured lag.
pub fn builtin_metrics(config: &AnalysisConfig) -> Vec<MetricDefinition> {
    use MetricCategory::{
        Basic, Compression, Correlation, Ideality, Patterns, Runs, Statistical, Transitions,
    };

    let run_overhead = config.metrics.rle_run_overhead_bits;
    let canonical_window = config.metrics.canonical_window;
    let window_sizes = config.ideality.window_sizes.clone();
    let repeats = Arc::new(LongestRepeatMemo::default());
    let lz_repeats = Arc::clone(&repeats);

    let mut metrics = vec![
        // Basic counts
        MetricDefinition::infallible("length", "Length", Basic, |b| b.len() as f64),
        MetricDefinition::infallible("ones_count", "Ones", Basic, |b| b.count_ones() as f64),
        MetricDefinition::infallible("zeros_count", "Zeros", Basic, |b| b.count_zeros() as f64),
        MetricDefinition::infallible("ones_ratio", "Ones ratio", Basic, stats::balance),
        // Distribution
        MetricDefinition::infallible("entropy", "Shannon entropy", Statistical, stats::entropy),
        MetricDefinition::infallible("chi_square", "Chi-square", Statistical, |b| {
            stats::chi_square(b).value
        }),
        MetricDefinition::infallible("chi_square_p_value", "Chi-square p-value", Statistical, |b| {
            stats::chi_square(b).p_value
        }),
        MetricDefinition::infallible("is_random", "Passes chi-square", Statistical, |b| {
            if stats::chi_square(b).is_random {
                1.0
            } else {
                0.0
            }
        }),
        MetricDefinition::infallible("mean", "Mean", Statistical, stats::mean),
        MetricDefinition::infallible("variance", "Variance", Statistical, stats::variance),
        MetricDefinition::infallible("std_dev", "Standard deviation", Statistical, stats::std_dev),
        // Runs
        MetricDefinition::infallible("run_count", "Run count", Runs, |b| {
            stats::run_lengths(b).len() as f64
        }),
        MetricDefinition::infallible("longest_run", "Longest run", Runs, |b| {
            stats::longest_run(b, None) as f64
        }),
        MetricDefinition::infallible("longest_zero_run", "Longest run of zeros", Runs, |b| {
            stats::longest_run(b, Some(0)) as f64
        }),
        MetricDefinition::infallible("longest_one_run", "Longest run of ones", Runs, |b| {
            stats::longest_run(b, Some(1)) as f64
        }),
        MetricDefinition::infallible("mean_run_length", "Mean run length", Runs, |b| {
            let runs = stats::run_lengths(b).len();
            if runs == 0 {
                0.0
            } else {
                b.len() as f64 / runs as f64
            }
        }),
        // Transitions
        MetricDefinition::infallible("transitions", "Transitions", Transitions, |b| {
            stats::transitions(b).total as f64
        }),
        MetricDefinition::infallible("zero_to_one_transitions", "0→1 transitions", Transitions, |b| {
            stats::transitions(b).zero_to_one as f64
        }),
        MetricDefinition::infallible("one_to_zero_transitions", "1→0 transitions", Transitions, |b| {
            stats::transitions(b).one_to_zero as f64
        }),
        MetricDefinition::infallible("transition_rate", "Transition rate", Transitions, |b| {
            stats::transitions(b).rate
        }),
        MetricDefinition::infallible("p_one_given_zero", "P(1 | 0)", Transitions, |b| {
            TransitionMatrix::from_bits(b).probability(0, 1)
        }),
        MetricDefinition::infallible("p_one_given_one", "P(1 | 1)", Transitions, |b| {
            TransitionMatrix::from_bits(b).probability(1, 1)
        }),
        // Compressibility
        MetricDefinition::infallible("rle_ratio", "RLE ratio", Compression, move |b| {
            compression::rle_ratio(b, run_overhead)
        }),
        MetricDefinition::infallible("huffman_ratio", "Huffman ratio", Compression, compression::huffman_ratio),
        MetricDefinition::infallible("lz_ratio", "LZ ratio", Compression, move |b| {
            compression::lz_ratio_with_repeat(b, lz_repeats.length(b))
        }),
        MetricDefinition::infallible("lz_complexity", "LZ complexity", Compression, compression::lz_complexity),
        // Patterns
        MetricDefinition::infallible("pattern_diversity", "Pattern diversity", Patterns, move |b| {
            pattern_diversity(b, canonical_window)
        }),
        MetricDefinition::infallible("bigram_diversity", "2-bit chunk diversity", Patterns, |b| {
            chunk_diversity(b, 2)
        }),
        MetricDefinition::infallible("trigram_diversity", "3-bit chunk diversity", Patterns, |b| {
            chunk_diversity(b, 3)
        }),
        MetricDefinition::infallible("nibble_diversity", "4-bit chunk diversity", Patterns, |b| {
            chunk_diversity(b, 4)
        }),
        MetricDefinition::infallible("byte_diversity", "8-bit chunk diversity", Patterns, |b| {
            chunk_diversity(b, 8)
        }),
        MetricDefinition::infallible("longest_repeat_length", "Longest repeated substring", Patterns, move |b| {
            repeats.length(b) as f64
        }),
    ];

    for &lag in &config.metrics.autocorrelation_lags {
        metrics.push(MetricDefinition::infallible(
            format!("autocorrelation_lag_{}", lag),
            format!("Autocorrelation (lag {})", lag),
            Correlation,
            move |b| stats::autocorrelation(b, lag),
        ));
    }

    metrics.push(MetricDefinition::infallible(
        "best_ideality",
        "Best ideality",
        Ideality,
        move |b| {
            if b.is_empty() {
                return 0.0;
            }
            let results = calculate_idealities_for(b, 0, b.len() - 1, &window_sizes);
            best_ideality(&results).map_or(0.0, |r| r.ideality_percentage)
        },
    ));

    metrics
}

impl Registry<MetricDefinition> {
    /// Registry holding the built-in catalog
    pub fn with_builtin_metrics(config: &AnalysisConfig) -> Result<Self> {
        let registry = Self::new();
        for metric in builtin_metrics(config) {
            registry.register(metric)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn value(id: &str, input: &str) -> f64 {
        let bits = BitString::parse(input).unwrap();
        let metrics = builtin_metrics(&AnalysisConfig::default());
        let metric = metrics.iter().find(|m| m.id == id).unwrap();
        (metric.compute)(&bits).unwrap()
    }

    #[test]
    fn test_ids_unique_and_complete() {
        let metrics = builtin_metrics(&AnalysisConfig::default());
        let ids: HashSet<&str> = metrics.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), metrics.len());
        assert_eq!(metrics.len(), 37);

        for id in crate::config::DEFAULT_CORE_METRICS {
            assert!(ids.contains(id), "core metric {} missing", id);
        }
        for lag in [1, 2, 4, 8] {
            assert!(ids.contains(format!("autocorrelation_lag_{}", lag).as_str()));
        }
    }

    #[test]
    fn test_scenario_values() {
        assert_eq!(value("entropy", "11110000"), 1.0);
        assert_eq!(value("one_to_zero_transitions", "11110000"), 1.0);
        assert_eq!(value("zero_to_one_transitions", "11110000"), 0.0);
        assert_eq!(value("run_count", "11110000"), 2.0);
        assert_eq!(value("mean_run_length", "11110000"), 4.0);

        assert_eq!(value("transitions", "10101010"), 7.0);
        assert_eq!(value("transition_rate", "10101010"), 1.0);
        assert_eq!(value("best_ideality", "10101010"), 100.0);
        assert_eq!(value("p_one_given_zero", "10101010"), 1.0);
    }

    #[test]
    fn test_counts_and_flags() {
        assert_eq!(value("length", "1011"), 4.0);
        assert_eq!(value("ones_count", "1011"), 3.0);
        assert_eq!(value("zeros_count", "1011"), 1.0);
        assert_eq!(value("ones_ratio", "1011"), 0.75);
        assert_eq!(value("is_random", "10101010"), 1.0);
        assert_eq!(value("is_random", "1111111111"), 0.0);
        assert_eq!(value("longest_one_run", "0111011"), 3.0);
        assert_eq!(value("longest_zero_run", "0111011"), 1.0);
        assert_eq!(value("longest_repeat_length", "0110110"), 4.0);
    }

    #[test]
    fn test_every_metric_neutral_on_empty() {
        let empty = BitString::empty();
        for metric in builtin_metrics(&AnalysisConfig::default()) {
            let v = (metric.compute)(&empty).unwrap();
            assert!(v.is_finite(), "{} not finite", metric.id);
            if metric.id != "chi_square_p_value" {
                assert_eq!(v, 0.0, "{} not neutral", metric.id);
            }
        }
    }

    #[test]
    fn test_repeat_metrics_share_one_search() {
        let metrics = builtin_metrics(&AnalysisConfig::default());
        let find = |id: &str| metrics.iter().find(|m| m.id == id).unwrap();
        let lz = find("lz_ratio");
        let longest = find("longest_repeat_length");

        for input in ["0110100110010110".repeat(32), "1101101".to_string(), String::new()] {
            let b = BitString::parse(&input).unwrap();
            assert_eq!((lz.compute)(&b).unwrap(), compression::lz_ratio(&b));
            let expected = find_longest_repeated_substring(&b, usize::MAX).map_or(0.0, |r| r.length as f64);
            assert_eq!((longest.compute)(&b).unwrap(), expected);
            // served from the memo on the second call
            assert_eq!((longest.compute)(&b).unwrap(), expected);
        }
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_config_shapes_catalog() {
        let mut config = AnalysisConfig::default();
        config.metrics.autocorrelation_lags = vec![3];
        config.metrics.rle_run_overhead_bits = 2;

        let registry = MetricRegistry::with_builtin_metrics(&config).unwrap();
        assert!(registry.contains("autocorrelation_lag_3"));
        assert!(!registry.contains("autocorrelation_lag_1"));

        let bits = BitString::parse("11110000").unwrap();
        let rle = registry.get("rle_ratio").unwrap();
        assert_eq!((rle.compute)(&bits).unwrap(), 2.0);
    }
}
