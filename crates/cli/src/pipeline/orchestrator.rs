//! Session orchestrator - coordinates all components.
//!
//! Wires the engine, the graph builder and the event loop together and owns
//! the session lifecycle from first node to final teardown. Runs against the
//! in-process mock engine; a real media backend plugs in through the same
//! `MediaEngine` trait.

use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::StreamPlan;
use failover::EventLoop;
use media_graph::{teardown_graph, GraphBuilder, MediaEngine, MockEngine, MockEngineConfig};
use tracing::{info, warn};

use super::SessionReport;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The stream plan to execute
    pub plan: StreamPlan,

    /// Session timeout (None = run until stopped)
    pub timeout: Option<std::time::Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main session orchestrator
pub struct Session {
    config: SessionConfig,
}

impl Session {
    /// Create a new session with the given configuration
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run the session to completion.
    ///
    /// `shutdown` resolves when the operator requests a stop; it is turned
    /// into an event-loop shutdown so the graph is torn down cleanly instead
    /// of being dropped mid-flight.
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<SessionReport> {
        let start_time = Instant::now();

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        info!("Running with in-process mock engine (no media backend required)");
        let engine = MockEngine::with_config(MockEngineConfig {
            source_available: true,
            ..Default::default()
        });

        self.run_with_engine(engine, shutdown, start_time).await
    }

    /// Session logic over any engine implementation
    async fn run_with_engine<E: MediaEngine + Clone + 'static>(
        self,
        engine: E,
        shutdown: impl Future<Output = ()> + Send + 'static,
        start_time: Instant,
    ) -> Result<SessionReport> {
        let plan = &self.config.plan;

        // Build the static topology
        info!("Building session graph...");
        let graph = GraphBuilder::new(&engine, plan)
            .build()
            .await
            .context("Failed to build session graph")?;

        info!(
            profiles = graph.profile_branches.len(),
            "Session graph ready, fallback route active"
        );

        let (event_loop, handle) =
            EventLoop::new(engine.clone(), graph, plan.canonical, plan.timing);

        // Operator shutdown -> event loop shutdown
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown.await;
            shutdown_handle.shutdown();
        });

        // Session timeout, if any
        if let Some(timeout) = self.config.timeout {
            let timeout_handle = handle.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!(timeout_secs = timeout.as_secs(), "Session timeout reached");
                timeout_handle.shutdown();
            });
        }

        // Everything is wired; let data flow
        engine.start().await.context("Failed to start engine")?;
        info!("Session running");

        let outcome = event_loop.run().await;

        // Shutdown: stop data flow, then remove the topology
        info!("Shutting down session...");
        if let Err(e) = engine.stop().await {
            warn!(error = %e, "Error stopping engine");
        }
        if let Err(e) = teardown_graph(&engine, &outcome.graph).await {
            warn!(error = %e, "Error during graph teardown");
        }

        let report = SessionReport::new(outcome, start_time.elapsed());
        info!(
            duration_secs = report.duration.as_secs_f64(),
            "Session shutdown complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use failover::StopReason;

    fn config() -> SessionConfig {
        SessionConfig {
            plan: StreamPlan::with_defaults("rtsp://cam/stream", "/tmp/dash-out"),
            timeout: None,
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_session_runs_until_shutdown() {
        let engine = MockEngine::with_config(MockEngineConfig {
            source_available: true,
            ..Default::default()
        });
        let session = Session::new(config());
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let runner = tokio::spawn(session.run_with_engine(
            engine.clone(),
            async move {
                let _ = stop_rx.await;
            },
            Instant::now(),
        ));

        // Give the session a moment to reach steady state, then stop it.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        stop_tx.send(()).unwrap();

        let report = runner.await.unwrap().unwrap();
        assert_eq!(report.reason, StopReason::Requested);
        // Everything must be removed from the engine after teardown.
        assert_eq!(engine.node_count(), 0);
    }

    #[tokio::test]
    async fn test_session_timeout_stops_run() {
        let engine = MockEngine::with_config(MockEngineConfig {
            source_available: true,
            ..Default::default()
        });
        let mut cfg = config();
        cfg.timeout = Some(std::time::Duration::from_millis(50));
        let session = Session::new(cfg);

        let report = session
            .run_with_engine(engine, std::future::pending(), Instant::now())
            .await
            .unwrap();
        assert_eq!(report.reason, StopReason::Requested);
    }
}
