//! Per-session counters.

/// Counters accumulated over one streaming session.
///
/// Reported once at shutdown; live gauges go through the metrics recorder
/// instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Times the output fell back from live to the fallback source
    pub failovers: u64,
    /// Reconnect attempts issued against the live source
    pub reconnect_attempts: u64,
    /// Successful switches to the live branch
    pub switches_to_live: u64,
    /// Engine error events observed (source and pipeline alike)
    pub engine_errors: u64,
}
