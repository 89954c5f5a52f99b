//! Event loop
//!
//! Single task owning the session: engine events, timer expirations and
//! shutdown requests all arrive on one channel and are handled in order.

use contracts::{CanonicalFormat, EngineEvent, NodeId, SessionGraph, TimingSettings};
use media_graph::MediaEngine;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::monitor::ConnectionMonitor;
use crate::stats::SessionStats;

/// Everything the event loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// Engine status event
    Engine(EngineEvent),
    /// A scheduled reconnect attempt is due
    ReconnectDue,
    /// The pre-switch grace period expired
    GraceElapsed,
    /// External shutdown request
    Shutdown,
}

/// Why the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested from outside
    Requested,
    /// The pipeline reached end of stream
    EndOfStream,
    /// A node outside the live lineage failed
    PipelineFatal { node: NodeId, message: String },
}

/// Final report of a finished session.
#[derive(Debug)]
pub struct SessionOutcome {
    pub reason: StopReason,
    pub stats: SessionStats,
    /// Topology handed back for teardown
    pub graph: SessionGraph,
}

/// Cheap cloneable handle for posting into a running loop.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: mpsc::UnboundedSender<LoopEvent>,
}

impl LoopHandle {
    /// Request the loop to stop. Safe to call more than once or after the
    /// loop already exited.
    pub fn shutdown(&self) {
        let _ = self.tx.send(LoopEvent::Shutdown);
    }
}

/// The session event loop.
///
/// Owns the connection monitor; run() consumes the loop and returns once a
/// stop reason is reached. Engine events are pumped onto the loop channel by
/// a forwarding task so timers and the engine share one ordered queue.
pub struct EventLoop<E: MediaEngine> {
    engine: E,
    monitor: ConnectionMonitor<E>,
    tx: mpsc::UnboundedSender<LoopEvent>,
    rx: mpsc::UnboundedReceiver<LoopEvent>,
}

impl<E: MediaEngine + Clone + 'static> EventLoop<E> {
    pub fn new(
        engine: E,
        graph: SessionGraph,
        canonical: CanonicalFormat,
        timing: TimingSettings,
    ) -> (Self, LoopHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = ConnectionMonitor::new(engine.clone(), graph, canonical, timing, tx.clone());
        let handle = LoopHandle { tx: tx.clone() };
        (
            Self {
                engine,
                monitor,
                tx,
                rx,
            },
            handle,
        )
    }

    /// Drive the session until it stops.
    #[instrument(name = "event_loop_run", skip(self))]
    pub async fn run(mut self) -> SessionOutcome {
        let forwarder = match self.engine.take_events() {
            Some(mut engine_rx) => {
                let tx = self.tx.clone();
                Some(tokio::spawn(async move {
                    while let Some(event) = engine_rx.recv().await {
                        if tx.send(LoopEvent::Engine(event)).is_err() {
                            break;
                        }
                    }
                }))
            }
            None => {
                // Subscription already taken; the loop still serves timers
                // and shutdown, which keeps tests with hand-fed events valid.
                warn!("engine event subscription unavailable");
                None
            }
        };

        info!("event loop started");
        let reason = loop {
            let Some(event) = self.rx.recv().await else {
                // All senders gone; treat as a shutdown.
                break StopReason::Requested;
            };
            match event {
                LoopEvent::Engine(engine_event) => {
                    if let Some(reason) = self.monitor.on_engine_event(engine_event).await {
                        break reason;
                    }
                }
                LoopEvent::ReconnectDue => self.monitor.on_reconnect_due().await,
                LoopEvent::GraceElapsed => self.monitor.on_grace_elapsed().await,
                LoopEvent::Shutdown => {
                    info!("shutdown requested");
                    break StopReason::Requested;
                }
            }
        };

        if let Some(handle) = forwarder {
            handle.abort();
        }
        self.monitor.terminate().await;
        if let StopReason::PipelineFatal { node, ref message } = reason {
            error!(node, %message, "session ended on pipeline failure");
        }

        let (graph, stats) = self.monitor.into_parts();
        SessionOutcome {
            reason,
            stats,
            graph,
        }
    }
}
