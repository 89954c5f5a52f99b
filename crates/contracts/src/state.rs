//! Connection state machine vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Live-source connection state.
///
/// Exactly one instance exists per session, associated with the live branch;
/// mutated only by the connection monitor on the event-loop task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No live feed; reconnects pending or in flight
    Disconnected,
    /// Decode chain built and warming up behind the grace delay
    Connecting,
    /// Live branch routed downstream
    Live,
    /// Live branch stalled (left running without an error); serving fallback
    Degraded,
    /// Terminal; the session is over
    Terminated,
}

impl ConnectionState {
    /// States from which a discovered video port may start a connect cycle
    pub fn accepts_live_port(self) -> bool {
        matches!(self, Self::Disconnected | Self::Degraded)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Live => "live",
            Self::Degraded => "degraded",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Which upstream branch the selector currently routes downstream.
///
/// Never "none" once the graph reaches steady state; fallback is the initial
/// value and the branch it names is always fully linked and running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveInput {
    Fallback,
    Live,
}

impl fmt::Display for ActiveInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fallback => f.write_str("fallback"),
            Self::Live => f.write_str("live"),
        }
    }
}
