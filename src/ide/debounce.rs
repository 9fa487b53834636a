//! Cancellable trailing-edge timer.

use std::future::Future;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};
use std::time::Duration;

use tokio::task::AbortHandle;

#[derive(Debug)]
struct Pending {
    id: u64,
    handle: AbortHandle,
}

/// Holds at most one pending timer.
///
/// [`Debouncer::arm`] aborts the pending timer and starts a new one. A timer
/// that fires clears the slot before running its task, so a later `arm`
/// never aborts a task that already started.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    slot: Arc<Mutex<Option<Pending>>>,
    next_id: Arc<AtomicU64>,
}

impl Debouncer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay` unless re-armed or cancelled first.
    ///
    /// Must be called within a tokio runtime.
    pub fn arm<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::clone(&self.slot);

        let mut pending = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if !current.as_ref().is_some_and(|p| p.id == id) {
                    return;
                }
                *current = None;
            }
            task.await;
        });

        *pending = Some(Pending { id, handle: handle.abort_handle() });
    }

    /// Aborts the pending timer. Returns true if one was pending.
    pub fn cancel(&self) -> bool {
        let mut pending = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        pending.take().is_some_and(|previous| {
            previous.handle.abort();
            true
        })
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}
