//! Text and JSON rendering of analysis results
//!
//! Every report type derives `Serialize`, so JSON output is a direct
//! `serde_json` dump; the text renderers produce aligned tables.

use crate::anomaly::{Anomaly, AnomalySummary};
use crate::ideality::IdealityResult;
use crate::metrics::{MetricCategory, MetricOutcome, MetricsReport};
use crate::pattern::PatternMatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Output of the `detect` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub bits: usize,
    pub summary: AnomalySummary,
    pub anomalies: Vec<Anomaly>,
}

/// Output of the `patterns` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternReport {
    pub window_size: usize,
    pub min_count: usize,
    pub patterns: Vec<PatternMatch>,
}

/// Pretty-printed JSON followed by a newline
pub fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

/// Metric values grouped by category, then failures
pub fn write_metrics_text<W: Write>(
    out: &mut W,
    report: &MetricsReport,
    categories: &BTreeMap<MetricCategory, Vec<String>>,
) -> io::Result<()> {
    let width = report.metrics.keys().map(String::len).max().unwrap_or(0);

    for (category, ids) in categories {
        let present: Vec<(&String, f64)> = ids
            .iter()
            .filter_map(|id| report.metrics.get(id).map(|v| (id, *v)))
            .collect();
        if present.is_empty() {
            continue;
        }
        writeln!(out, "[{}]", category)?;
        for (id, value) in present {
            writeln!(out, "  {:<width$}  {}", id, format_value(value), width = width)?;
        }
    }

    if !report.errors.is_empty() {
        writeln!(out, "[errors]")?;
        for failure in &report.errors {
            writeln!(out, "  {}: {}", failure.id, failure.message)?;
        }
    }

    writeln!(
        out,
        "core metrics: {}",
        if report.core_metrics_computed {
            "complete"
        } else {
            "INCOMPLETE"
        }
    )
}

pub fn write_outcome_text<W: Write>(out: &mut W, outcome: &MetricOutcome) -> io::Result<()> {
    match (&outcome.value, &outcome.error) {
        (Some(value), _) => writeln!(out, "{} = {}", outcome.id, format_value(*value)),
        (None, Some(error)) => writeln!(out, "{} failed: {}", outcome.id, error),
        (None, None) => writeln!(out, "{} failed", outcome.id),
    }
}

pub fn write_categories_text<W: Write>(
    out: &mut W,
    categories: &BTreeMap<MetricCategory, Vec<String>>,
) -> io::Result<()> {
    for (category, ids) in categories {
        writeln!(out, "{} ({}):", category, ids.len())?;
        for id in ids {
            writeln!(out, "  {}", id)?;
        }
    }
    Ok(())
}

/// One line per anomaly, then the severity tally
pub fn write_detections_text<W: Write>(out: &mut W, report: &DetectionReport) -> io::Result<()> {
    if report.anomalies.is_empty() {
        writeln!(out, "No anomalies in {} bits", report.bits)?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>10}  {:>8}  {:<8}  {:<24}  name",
        "position", "length", "severity", "detector"
    )?;
    for anomaly in &report.anomalies {
        writeln!(
            out,
            "{:>10}  {:>8}  {:<8}  {:<24}  {}",
            anomaly.position,
            anomaly.length,
            anomaly.severity.to_string(),
            anomaly.definition_id,
            anomaly.name
        )?;
    }
    writeln!(out)?;
    write_summary_text(out, &report.summary)
}

pub fn write_summary_text<W: Write>(out: &mut W, summary: &AnomalySummary) -> io::Result<()> {
    writeln!(out, "{} anomalies", summary.total)?;
    for (severity, count) in summary.by_severity.iter().rev() {
        writeln!(out, "  {:<8} {}", severity.to_string(), count)?;
    }
    for (definition, count) in &summary.by_definition {
        writeln!(out, "  {:<24} {}", definition, count)?;
    }
    Ok(())
}

pub fn write_patterns_text<W: Write>(out: &mut W, report: &PatternReport) -> io::Result<()> {
    writeln!(
        out,
        "{} patterns of {} bits (min count {})",
        report.patterns.len(),
        report.window_size,
        report.min_count
    )?;
    for pattern in &report.patterns {
        writeln!(
            out,
            "  {}  {:>8}  first at {}",
            pattern.pattern,
            pattern.count,
            pattern.positions.first().copied().unwrap_or(0)
        )?;
    }
    Ok(())
}

pub fn write_ideality_text<W: Write>(out: &mut W, results: &[IdealityResult]) -> io::Result<()> {
    writeln!(out, "{:>6}  {:>9}  {:>10}  {:>10}", "window", "ideality", "repeating", "total")?;
    for result in results {
        writeln!(
            out,
            "{:>6}  {:>8.2}%  {:>10}  {:>10}",
            result.window_size,
            result.ideality_percentage,
            result.repeating_count,
            result.total_bits
        )?;
    }
    Ok(())
}

/// Integers without a fraction, everything else to six places
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.6}", value)
    }
}
