//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::StreamPlan;

use crate::cli::RunArgs;
use crate::pipeline::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    let mut plan = load_plan(args)?;

    // Positional arguments override whatever the config file says
    if let Some(ref source) = args.source {
        plan.source.uri = source.clone();
    }
    if let Some(ref output) = args.output {
        plan.output.directory = output.clone();
    }

    config_loader::ConfigLoader::validate(&plan).context("Invalid stream plan")?;

    info!(
        source = %plan.source.uri,
        output = %plan.output.directory.display(),
        profiles = plan.profiles.len(),
        reconnect_secs = plan.timing.reconnect_interval_secs,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&plan);
        return Ok(());
    }

    let session_config = SessionConfig {
        plan,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let session = Session::new(session_config);

    info!("Starting session...");
    let report = session
        .run(setup_shutdown_signal())
        .await
        .context("Session execution failed")?;

    info!(
        reason = %report.reason_label(),
        duration_secs = report.duration.as_secs_f64(),
        failovers = report.stats.failovers,
        reconnect_attempts = report.stats.reconnect_attempts,
        "Session completed"
    );
    report.print_summary();

    if let failover::StopReason::PipelineFatal { node, ref message } = report.reason {
        anyhow::bail!("Pipeline failed at node {node}: {message}");
    }

    info!("DASH Streamer finished");
    Ok(())
}

/// Resolve the stream plan from --config or the positional arguments
fn load_plan(args: &RunArgs) -> Result<StreamPlan> {
    if let Some(ref config) = args.config {
        info!(config = %config.display(), "Loading configuration");
        if !config.exists() {
            anyhow::bail!("Configuration file not found: {}", config.display());
        }
        return config_loader::ConfigLoader::load_from_path(config)
            .with_context(|| format!("Failed to load config from {}", config.display()));
    }

    let source = args
        .source
        .clone()
        .ok_or_else(|| anyhow::anyhow!("SOURCE is required when no --config is given"))?;
    let output = args
        .output
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OUTPUT is required when no --config is given"))?;
    info!("No config file given, using default profile ladder");
    Ok(StreamPlan::with_defaults(source, output))
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping session...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(plan: &StreamPlan) {
    println!("\n=== Configuration Summary ===\n");
    println!("Source:");
    println!("  URI: {}", plan.source.uri);
    println!("  Latency: {} ms", plan.source.latency_ms);
    println!("  Timeout: {} s", plan.source.timeout_secs);
    println!("\nOutput:");
    println!("  Directory: {}", plan.output.directory.display());
    println!("  Manifest: {}", plan.output.manifest_path().display());
    println!("\nProfiles ({}):", plan.profiles.len());
    for profile in &plan.profiles {
        println!(
            "  - {} {}x{} @ {} kbps, {}s segments",
            profile.id,
            profile.width,
            profile.height,
            profile.bitrate_kbps,
            profile.segment_duration_secs
        );
    }
    println!("\nFailover:");
    println!(
        "  Reconnect interval: {} s",
        plan.timing.reconnect_interval_secs
    );
    println!("  Switch grace period: {} ms", plan.timing.grace_period_ms);
    println!();
}
