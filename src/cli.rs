//! CLI argument parsing for bitscope

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "bitscope")]
#[command(version)]
#[command(about = "Statistics, pattern mining and anomaly detection for bit streams", long_about = None)]
pub struct Cli {
    /// Read the bit string from FILE ('-' reads stdin)
    #[arg(short, long, value_name = "FILE", default_value = "-")]
    pub input: String,

    /// Treat the input as raw bytes, unpacked most significant bit first
    #[arg(long)]
    pub raw: bool,

    /// Drop non-binary characters instead of rejecting the input
    #[arg(long)]
    pub sanitize: bool,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Compute every registered metric
    Metrics,

    /// Compute a single metric by id
    Metric {
        /// Metric id (see `categories`)
        id: String,
    },

    /// List metric ids grouped by category
    Categories,

    /// Run the enabled anomaly detectors
    Detect {
        /// Print only counts by severity and detector
        #[arg(long)]
        summary: bool,
    },

    /// Frequency table of fixed-width windows
    Patterns {
        /// Window size in bits
        #[arg(short, long, value_name = "BITS")]
        window: usize,

        /// Minimum occurrence count
        #[arg(long, value_name = "N", default_value = "2")]
        min_count: usize,

        /// Keep only the K most frequent windows
        #[arg(long, value_name = "K")]
        top: Option<usize>,
    },

    /// Windowed repetition score over a bit range
    Ideality {
        /// Window size in bits
        #[arg(short, long, value_name = "BITS", default_value = "8")]
        window: usize,

        /// First bit of the range
        #[arg(long, default_value = "0")]
        start: usize,

        /// Last bit of the range (inclusive, defaults to the end of input)
        #[arg(long)]
        end: Option<usize>,

        /// Score every configured window size instead of --window
        #[arg(long)]
        all: bool,
    },
}

impl Command {
    /// Whether the command reads a bit string
    pub fn needs_input(&self) -> bool {
        !matches!(self, Command::Categories)
    }
}
