//! One-shot timer posting back to the event loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A cancellable one-shot delay.
///
/// Arming replaces any pending shot, so the latest request always wins;
/// cancellation aborts the sleeping task, dropping it is a cancel too.
#[derive(Debug, Default)]
pub struct OneShotTimer {
    handle: Option<JoinHandle<()>>,
}

impl OneShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `event` on `tx` after `delay`, replacing any pending shot.
    pub fn arm<T: Send + 'static>(
        &mut self,
        tx: &mpsc::UnboundedSender<T>,
        delay: Duration,
        event: T,
    ) {
        self.cancel();
        let tx = tx.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
