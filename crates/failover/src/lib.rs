//! # Failover
//!
//! The live-source supervision side of the orchestrator:
//!
//! - `ConnectionMonitor` owning the connection state machine
//! - `ReconnectScheduler` for debounced constant-interval retries
//! - `EventLoop` serializing every event onto one task
//!
//! All graph mutation during a session happens here, on the event-loop task.

mod event_loop;
mod monitor;
mod reconnect;
mod stats;
mod timer;

pub use event_loop::{EventLoop, LoopEvent, LoopHandle, SessionOutcome, StopReason};
pub use monitor::ConnectionMonitor;
pub use reconnect::ReconnectScheduler;
pub use stats::SessionStats;
pub use timer::OneShotTimer;
