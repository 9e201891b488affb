//! Statistical primitives over binary sequences
//!
//! Every function here is total: empty and single-bit inputs return neutral
//! values (zero, or an empty list) instead of failing, so the metric catalog
//! can evaluate them on any input.

use crate::bitstring::BitString;
use serde::{Deserialize, Serialize};

/// Critical value of the chi-square distribution with one degree of freedom
/// at the 95% confidence level.
pub const CHI_SQUARE_CRITICAL_95: f64 = 3.841;

/// Result of the chi-square goodness-of-fit test against a 50/50 split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareResult {
    /// Test statistic
    pub value: f64,
    /// Upper-tail probability for df=1
    pub p_value: f64,
    /// True when the statistic is below the 95% critical value
    pub is_random: bool,
}

/// Maximal run of identical symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub symbol: u8,
    pub length: usize,
}

/// Adjacent symbol changes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub zero_to_one: usize,
    pub one_to_zero: usize,
    pub total: usize,
    /// `total / (n - 1)`, 0 when n < 2
    pub rate: f64,
}

/// Shannon entropy in bits per symbol, within [0, 1]
///
/// # Example
/// ```
/// use bitscope::{stats, BitString};
///
/// let bits = BitString::parse("11110000").unwrap();
/// assert_eq!(stats::entropy(&bits), 1.0);
/// ```
pub fn entropy(bits: &BitString) -> f64 {
    let n = bits.len();
    if n == 0 {
        return 0.0;
    }
    let ones = bits.count_ones() as f64 / n as f64;
    let zeros = 1.0 - ones;

    [ones, zeros]
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// Chi-square test of the 0/1 counts against the uniform expectation
pub fn chi_square(bits: &BitString) -> ChiSquareResult {
    let n = bits.len();
    if n == 0 {
        return ChiSquareResult {
            value: 0.0,
            p_value: 1.0,
            is_random: false,
        };
    }

    let expected = n as f64 / 2.0;
    let ones = bits.count_ones() as f64;
    let zeros = n as f64 - ones;
    let value =
        (ones - expected).powi(2) / expected + (zeros - expected).powi(2) / expected;

    ChiSquareResult {
        value,
        p_value: chi_square_p_value_df1(value),
        is_random: value < CHI_SQUARE_CRITICAL_95,
    }
}

/// Upper-tail probability of the chi-square distribution with df=1
pub fn chi_square_p_value_df1(statistic: f64) -> f64 {
    if statistic <= 0.0 {
        return 1.0;
    }
    erfc((statistic / 2.0).sqrt()).clamp(0.0, 1.0)
}

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7)
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Fraction of ones, 0 for empty input
pub fn balance(bits: &BitString) -> f64 {
    if bits.is_empty() {
        return 0.0;
    }
    bits.count_ones() as f64 / bits.len() as f64
}

/// Sample mean of the bits as 0/1 values
pub fn mean(bits: &BitString) -> f64 {
    balance(bits)
}

/// Population variance of the bits as 0/1 samples
pub fn variance(bits: &BitString) -> f64 {
    let p = mean(bits);
    p * (1.0 - p)
}

pub fn std_dev(bits: &BitString) -> f64 {
    variance(bits).sqrt()
}

/// Normalised autocorrelation at `lag`, within [-1, 1]
///
/// Returns 0 when the sequence is constant, when `lag` is 0, or when the
/// sequence is not longer than `lag`.
pub fn autocorrelation(bits: &BitString, lag: usize) -> f64 {
    let n = bits.len();
    if lag == 0 || n <= lag {
        return 0.0;
    }

    let mu = mean(bits);
    let symbols = bits.as_slice();
    let denominator: f64 = symbols.iter().map(|&b| (b as f64 - mu).powi(2)).sum();
    if denominator == 0.0 {
        return 0.0;
    }

    let numerator: f64 = symbols
        .iter()
        .zip(&symbols[lag..])
        .map(|(&a, &b)| (a as f64 - mu) * (b as f64 - mu))
        .sum();

    (numerator / denominator).clamp(-1.0, 1.0)
}

/// Autocorrelation for each lag in `lags`
pub fn autocorrelations(bits: &BitString, lags: &[usize]) -> Vec<(usize, f64)> {
    lags.iter()
        .map(|&lag| (lag, autocorrelation(bits, lag)))
        .collect()
}

/// Run-length decomposition in one left-to-right pass
///
/// Concatenating `length` copies of each run's symbol reproduces the input.
pub fn run_lengths(bits: &BitString) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &symbol in bits.as_slice() {
        match runs.last_mut() {
            Some(run) if run.symbol == symbol => run.length += 1,
            _ => runs.push(Run { symbol, length: 1 }),
        }
    }
    runs
}

/// Length of the longest run, optionally restricted to one symbol
pub fn longest_run(bits: &BitString, symbol: Option<u8>) -> usize {
    run_lengths(bits)
        .into_iter()
        .filter(|run| symbol.map_or(true, |s| run.symbol == s))
        .map(|run| run.length)
        .max()
        .unwrap_or(0)
}

/// Count 0→1 and 1→0 changes between adjacent bits
pub fn transitions(bits: &BitString) -> TransitionCounts {
    let mut zero_to_one = 0;
    let mut one_to_zero = 0;

    for pair in bits.as_slice().windows(2) {
        match (pair[0], pair[1]) {
            (0, 1) => zero_to_one += 1,
            (1, 0) => one_to_zero += 1,
            _ => {}
        }
    }

    let total = zero_to_one + one_to_zero;
    let rate = if bits.len() < 2 {
        0.0
    } else {
        total as f64 / (bits.len() - 1) as f64
    };

    TransitionCounts {
        zero_to_one,
        one_to_zero,
        total,
        rate,
    }
}
