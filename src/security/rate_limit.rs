//! Per-client sliding-window rate limiter.

use std::sync::{Arc, Mutex, PoisonError};

use crate::observability::metrics;
use crate::security::identity::ClientKey;
use crate::security::store::{MemoryStore, StoreStats, WindowStore};
use crate::security::window::{ClientWindow, RateDecision, RateLimitPolicy};

/// Rate limiter state shared by every request.
///
/// Each check is a get → decide → set sequence against the store. The
/// sequencer lock makes those sequences run one at a time, so transitions for
/// a client are applied strictly in arrival order even on a multi-threaded
/// runtime. Nothing inside the lock awaits or does I/O.
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    sequencer: Mutex<()>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn WindowStore>) -> Self {
        Self {
            store,
            sequencer: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Record a request from `key` at `now_ms` and decide whether it may proceed.
    pub fn check(&self, key: &ClientKey, now_ms: u64, policy: &RateLimitPolicy) -> RateDecision {
        let _guard = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);

        let existing = self.store.get(key);
        let first_seen = existing.is_none();
        let mut window = existing.unwrap_or_default();
        let was_blocked = window.is_blocked();
        let decision = window.admit(now_ms, policy);

        match decision {
            RateDecision::Blocked => {
                tracing::debug!(client = %key, "Request rejected during cooldown");
                // Nothing changed; skip the write.
                return decision;
            }
            RateDecision::LimitExceeded => {
                tracing::warn!(
                    client = %key,
                    max_requests = policy.max_requests,
                    window_ms = policy.window_ms,
                    "Rate limit exceeded, blocking client"
                );
            }
            RateDecision::Admitted { .. } if was_blocked => {
                tracing::info!(client = %key, "Cooldown elapsed, client unblocked");
            }
            RateDecision::Admitted { .. } => {}
        }

        self.store.set(key, window);
        if first_seen {
            metrics::record_tracked_clients(self.store.tracked());
        }
        decision
    }

    /// Remove windows idle for longer than `idle_ms`.
    pub fn sweep(&self, now_ms: u64, idle_ms: u64) -> usize {
        let _guard = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.prune(now_ms, idle_ms)
    }

    /// Current window for a key, if tracked.
    pub fn snapshot(&self, key: &ClientKey) -> Option<ClientWindow> {
        self.store.get(key)
    }

    /// Forget a key entirely; its next request is treated as first contact.
    pub fn reset(&self, key: &ClientKey) -> bool {
        let _guard = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = self.store.remove(key).is_some();
        if removed {
            metrics::record_tracked_clients(self.store.tracked());
        }
        removed
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::in_memory()
    }
}
