use anyhow::{Context, Result};
use bitscope::anomaly::AnomalyEngine;
use bitscope::cli::{Cli, Command, OutputFormat};
use bitscope::config::AnalysisConfig;
use bitscope::ideality::{calculate_ideality, calculate_idealities_for};
use bitscope::metrics::MetricsEngine;
use bitscope::pattern::find_all_patterns;
use bitscope::report::{self, DetectionReport, PatternReport};
use bitscope::{BitString, InputPolicy};
use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` enables everything, otherwise
/// RUST_LOG applies with warnings shown by default
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    match &cli.config {
        Some(path) => AnalysisConfig::from_file(path),
        None => Ok(AnalysisConfig::default()),
    }
}

fn read_input(cli: &Cli, config: &AnalysisConfig) -> Result<BitString> {
    let bytes = if cli.input == "-" {
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read bits from stdin")?;
        buffer
    } else {
        fs::read(&cli.input).with_context(|| format!("Failed to read input file: {}", cli.input))?
    };

    if cli.raw {
        return Ok(BitString::from_bytes(&bytes));
    }

    let text = String::from_utf8(bytes)
        .context("Input is not UTF-8 text (use --raw for binary files)")?;
    let policy = if cli.sanitize {
        InputPolicy::Sanitize
    } else {
        config.input.policy
    };
    Ok(BitString::parse_with(&text, policy)?)
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let config = load_config(cli)?;
    let bits = if cli.command.needs_input() {
        read_input(cli, &config)?
    } else {
        BitString::empty()
    };
    tracing::debug!(bits = bits.len(), command = ?cli.command, "input loaded");

    let json = cli.format == OutputFormat::Json;

    match &cli.command {
        Command::Metrics => {
            let engine = MetricsEngine::from_config(&config)?;
            let metrics = engine.calculate_all_metrics(&bits);
            if json {
                report::write_json(out, &metrics)?;
            } else {
                report::write_metrics_text(out, &metrics, &engine.metrics_by_category())?;
            }
        }
        Command::Metric { id } => {
            let engine = MetricsEngine::from_config(&config)?;
            let outcome = engine.calculate_metric(id, &bits)?;
            if json {
                report::write_json(out, &outcome)?;
            } else {
                report::write_outcome_text(out, &outcome)?;
            }
            if !outcome.success {
                anyhow::bail!("Metric '{}' could not be computed", id);
            }
        }
        Command::Categories => {
            let engine = MetricsEngine::from_config(&config)?;
            let categories = engine.metrics_by_category();
            if json {
                report::write_json(out, &categories)?;
            } else {
                report::write_categories_text(out, &categories)?;
            }
        }
        Command::Detect { summary } => {
            let engine = AnomalyEngine::from_config(&config)?;
            let anomalies = engine.detect_all(&bits);
            let detection = DetectionReport {
                bits: bits.len(),
                summary: AnomalyEngine::summary(&anomalies),
                anomalies,
            };
            match (json, *summary) {
                (true, true) => report::write_json(out, &detection.summary)?,
                (true, false) => report::write_json(out, &detection)?,
                (false, true) => report::write_summary_text(out, &detection.summary)?,
                (false, false) => report::write_detections_text(out, &detection)?,
            }
        }
        Command::Patterns {
            window,
            min_count,
            top,
        } => {
            anyhow::ensure!(*window >= 1, "--window must be at least 1");
            let mut patterns = find_all_patterns(&bits, *window, *min_count);
            if let Some(k) = top {
                patterns.truncate(*k);
            }
            let patterns = PatternReport {
                window_size: *window,
                min_count: *min_count,
                patterns,
            };
            if json {
                report::write_json(out, &patterns)?;
            } else {
                report::write_patterns_text(out, &patterns)?;
            }
        }
        Command::Ideality {
            window,
            start,
            end,
            all,
        } => {
            let end = end.unwrap_or_else(|| bits.len().saturating_sub(1));
            let results = if *all {
                calculate_idealities_for(&bits, *start, end, &config.ideality.window_sizes)
            } else {
                anyhow::ensure!(*window >= 1, "--window must be at least 1");
                vec![calculate_ideality(&bits, *window, *start, end)]
            };
            if json {
                report::write_json(out, &results)?;
            } else {
                report::write_ideality_text(out, &results)?;
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (--debug or RUST_LOG)
    init_tracing(cli.debug);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)?;
    out.flush()?;
    Ok(())
}
