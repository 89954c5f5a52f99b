//! Reconnect scheduling.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::event_loop::LoopEvent;
use crate::timer::OneShotTimer;

/// Debounced constant-interval reconnect scheduler.
///
/// At most one attempt is ever pending: scheduling while a shot is armed
/// resets the delay instead of stacking a second attempt, so a burst of
/// source errors produces exactly one `ReconnectDue`.
#[derive(Debug)]
pub struct ReconnectScheduler {
    timer: OneShotTimer,
    interval: Duration,
    tx: mpsc::UnboundedSender<LoopEvent>,
}

impl ReconnectScheduler {
    pub fn new(interval: Duration, tx: mpsc::UnboundedSender<LoopEvent>) -> Self {
        Self {
            timer: OneShotTimer::new(),
            interval,
            tx,
        }
    }

    /// Post `ReconnectDue` after the configured interval, replacing any
    /// pending attempt.
    pub fn schedule(&mut self) {
        debug!(
            interval_secs = self.interval.as_secs(),
            rearmed = self.timer.is_armed(),
            "reconnect scheduled"
        );
        self.timer.arm(&self.tx, self.interval, LoopEvent::ReconnectDue);
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_schedules_yields_one_due() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = ReconnectScheduler::new(Duration::from_secs(5), tx);

        scheduler.schedule();
        advance(Duration::from_secs(2)).await;
        scheduler.schedule();
        scheduler.schedule();

        advance(Duration::from_secs(6)).await;
        assert_eq!(rx.recv().await, Some(LoopEvent::ReconnectDue));
        assert!(rx.try_recv().is_err());
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_clears_pending_attempt() {
        let (tx, mut rx) = mpsc::unbounded_channel::<LoopEvent>();
        let mut scheduler = ReconnectScheduler::new(Duration::from_secs(5), tx);

        scheduler.schedule();
        assert!(scheduler.is_pending());
        scheduler.cancel();

        advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
