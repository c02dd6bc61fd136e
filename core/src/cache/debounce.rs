use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::AbortHandle;
use tracing::trace;

/// Per-key trailing-edge debounce: of a burst of calls for one key only the
/// last runs, `delay` after it was scheduled.
pub struct Debouncer {
    pending: Arc<DashMap<String, (u64, AbortHandle)>>,
    seq: AtomicU64,
    delay_ms: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            seq: AtomicU64::new(0),
            delay_ms: AtomicU64::new(delay.as_millis() as u64),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::Relaxed))
    }

    /// Applies to calls scheduled from now on.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Run `task` after the delay unless another call for `key` arrives
    /// first. Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, key: &str, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let delay = self.delay();
        let pending = Arc::clone(&self.pending);
        let owned_key = key.to_string();

        // hold the slot while spawning so the task cannot look before it is registered
        let slot = self.pending.entry(key.to_string());
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // superseded while sleeping
            if pending.remove_if(&owned_key, |_, (s, _)| *s == seq).is_none() {
                return;
            }
            task().await;
        })
        .abort_handle();

        match slot {
            Entry::Occupied(mut occupied) => {
                let (_, previous) = occupied.insert((seq, handle));
                previous.abort();
                trace!(key, "superseded pending debounced task");
            }
            Entry::Vacant(vacant) => {
                vacant.insert((seq, handle));
            }
        }
    }

    /// Drop the pending call for `key`, if any.
    pub fn cancel(&self, key: &str) -> bool {
        match self.pending.remove(key) {
            Some((_, (_, handle))) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}
