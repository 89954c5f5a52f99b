//! Mock Session Demo
//!
//! Runs a complete streaming session against the in-process mock engine:
//! connect, switch to live, scripted mid-session drop, failover, reconnect
//! and recovery. No media backend required.
//!
//! Run with: cargo run --bin mock_session

use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{EngineEvent, StreamPlan};
use failover::EventLoop;
use media_graph::{teardown_graph, GraphBuilder, MediaEngine, MockEngine, MockEngineConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    tracing::info!("Starting Mock Session Demo");

    // ==== Stage 1: Use default plan or load from file ====
    let plan = if let Some(path) = std::env::args().nth(1) {
        tracing::info!(path = %path, "Loading stream plan");
        ConfigLoader::load_from_path(std::path::Path::new(&path))?
    } else {
        StreamPlan::with_defaults("rtsp://demo.local:8554/stream", "/tmp/dash-demo")
    };

    // ==== Stage 2: Build the session graph (mock engine) ====
    tracing::info!("Creating mock engine...");
    let engine = MockEngine::with_config(MockEngineConfig {
        source_available: true,
        ..Default::default()
    });

    tracing::info!("Building session graph...");
    let graph = GraphBuilder::new(&engine, &plan).build().await?;
    let live_source = graph.live_source;
    tracing::info!(
        nodes = graph.all_nodes().len(),
        profiles = graph.profile_branches.len(),
        "Graph built, fallback route active"
    );

    // ==== Stage 3: Start the event loop ====
    let (event_loop, handle) = EventLoop::new(engine.clone(), graph, plan.canonical, plan.timing);
    engine.start().await?;
    let runner = tokio::spawn(event_loop.run());

    // ==== Stage 4: Script a mid-session drop and recovery ====
    let script_engine = engine.clone();
    tokio::spawn(async move {
        // Let the session go live first (grace period is 1s by default)
        tokio::time::sleep(Duration::from_secs(3)).await;
        tracing::info!(">>> scripting a live feed drop");
        script_engine.set_source_available(false);
        script_engine.emit(EngineEvent::Error {
            node: live_source,
            message: "connection reset by peer".to_string(),
        });

        // Feed comes back before the second reconnect attempt
        tokio::time::sleep(Duration::from_secs(4)).await;
        tracing::info!(">>> scripting feed recovery");
        script_engine.set_source_available(true);
    });

    // ==== Stage 5: Run for a fixed window, then stop ====
    tokio::time::sleep(Duration::from_secs(15)).await;
    tracing::info!("Demo window over, shutting down");
    handle.shutdown();

    let outcome = runner.await?;
    engine.stop().await?;
    teardown_graph(&engine, &outcome.graph).await?;

    tracing::info!(
        reason = ?outcome.reason,
        switches_to_live = outcome.stats.switches_to_live,
        failovers = outcome.stats.failovers,
        reconnect_attempts = outcome.stats.reconnect_attempts,
        "Demo finished"
    );

    Ok(())
}
