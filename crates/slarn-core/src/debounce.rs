use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

struct PendingTask {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

/// Coalesces rapid triggers into one delayed call.
///
/// At most one timer is armed at a time. Scheduling again, or calling
/// [`Debouncer::cancel_pending`], disarms a timer that has not fired yet.
/// Once a timer fires its task runs to completion; callers that need to
/// ignore superseded work must tag it themselves.
///
/// Must be used from within a tokio runtime.
#[derive(Default)]
pub struct Debouncer {
    pending: Option<PendingTask>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any armed timer, then arm a new one running `task` after `delay`.
    pub fn schedule<F>(&mut self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel_pending();

        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            task.await;
        });

        self.pending = Some(PendingTask { handle, fired });
    }

    /// Disarm the timer if it has not fired. Returns whether one was disarmed.
    pub fn cancel_pending(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };

        if pending.fired.load(Ordering::SeqCst) {
            // already running; let it finish detached
            return false;
        }

        pending.handle.abort();
        tracing::debug!("debounced task cancelled before firing");
        true
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.fired.load(Ordering::SeqCst) && !p.handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
