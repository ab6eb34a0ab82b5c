//! Debounced write-through persistence
//!
//! Coalesces bursts of mutations into one storage write: each `schedule`
//! replaces any pending work and restarts the delay timer. Shutdown either
//! drains the pending write or discards it explicitly; neither path leaves
//! a timer running.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::Result;

type PersistFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Debounce timer around a storage write closure
pub struct DebouncedPersister {
    delay: Duration,
    pending: Arc<Mutex<Option<PersistFn>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl DebouncedPersister {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(None)),
            timer: Mutex::new(None),
        }
    }

    /// Schedule `work` to run after the debounce delay, replacing and
    /// cancelling any previously scheduled work.
    pub fn schedule<F>(&self, work: F)
    where
        F: FnOnce() -> BoxFuture<'static, Result<()>> + Send + 'static,
    {
        *self.pending.lock() = Some(Box::new(work));

        let mut timer = self.timer.lock();
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let work = pending.lock().take();
            if let Some(work) = work {
                if let Err(e) = work().await {
                    warn!("debounced persistence failed: {}", e);
                }
            }
        }));
    }

    /// Whether a write is currently pending
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Stop the timer and resolve pending work.
    ///
    /// With `drain` the pending write executes immediately; without it the
    /// work is discarded and the discard is logged.
    pub async fn shutdown(&self, drain: bool) {
        let handle = self.timer.lock().take();
        if let Some(handle) = handle {
            handle.abort();
        }

        let work = self.pending.lock().take();
        match (drain, work) {
            (true, Some(work)) => {
                if let Err(e) = work().await {
                    warn!("drained persistence write failed: {}", e);
                }
            }
            (false, Some(_)) => {
                warn!("discarding pending persistence write on shutdown");
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_work(counter: Arc<AtomicU32>) -> impl FnOnce() -> BoxFuture<'static, Result<()>> {
        move || {
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_runs_after_delay() {
        let persister = DebouncedPersister::new(Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        persister.schedule(counting_work(Arc::clone(&counter)));

        assert!(persister.has_pending());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!persister.has_pending());
    }

    #[tokio::test]
    async fn test_new_schedule_coalesces_pending_work() {
        let persister = DebouncedPersister::new(Duration::from_millis(30));
        let counter = Arc::new(AtomicU32::new(0));

        for _ in 0..5 {
            persister.schedule(counting_work(Arc::clone(&counter)));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_work() {
        let persister = DebouncedPersister::new(Duration::from_secs(60));
        let counter = Arc::new(AtomicU32::new(0));
        persister.schedule(counting_work(Arc::clone(&counter)));

        persister.shutdown(true).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_can_discard_pending_work() {
        let persister = DebouncedPersister::new(Duration::from_secs(60));
        let counter = Arc::new(AtomicU32::new(0));
        persister.schedule(counting_work(Arc::clone(&counter)));

        persister.shutdown(false).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!persister.has_pending());
    }
}
