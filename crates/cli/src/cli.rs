//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// DASH Streamer - Live feed to adaptive-bitrate segmented output
#[derive(Parser, Debug)]
#[command(
    name = "dash-streamer",
    author,
    version,
    about = "Adaptive live streaming orchestrator with fallback failover",
    long_about = "Restreams a live network feed as segmented adaptive-bitrate output.\n\n\
                  Builds a processing graph with a synthetic fallback source, switches \n\
                  to the live feed once it is healthy, and keeps reconnecting whenever \n\
                  the feed drops - the published output never stops."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DASH_STREAMER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DASH_STREAMER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a streaming session
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Live source address (e.g. rtsp://host:8554/stream); required unless
    /// --config provides one
    #[arg(env = "DASH_STREAMER_SOURCE", required_unless_present = "config")]
    pub source: Option<String>,

    /// Output directory for the manifest and segments; required unless
    /// --config provides one
    #[arg(env = "DASH_STREAMER_OUTPUT", required_unless_present = "config")]
    pub output: Option<PathBuf>,

    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "DASH_STREAMER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Session timeout in seconds (0 = run until stopped)
    #[arg(long, default_value = "0", env = "DASH_STREAMER_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "DASH_STREAMER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running the session
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "stream.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
