//! Storage for client windows.
//!
//! The limiter only needs `get`/`set`/`remove` plus an idle `prune`, so the
//! in-memory map can be swapped for a shared store (e.g. a TTL key-value cache)
//! when several gatekeeper instances must enforce one limit together. With the
//! in-memory store each instance limits independently and state starts empty
//! on every restart.

use dashmap::DashMap;
use serde::Serialize;

use crate::security::identity::ClientKey;
use crate::security::window::ClientWindow;

/// Counts over all stored windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub tracked: usize,
    pub blocked: usize,
}

/// Backing store for client windows.
pub trait WindowStore: Send + Sync {
    fn get(&self, key: &ClientKey) -> Option<ClientWindow>;

    fn set(&self, key: &ClientKey, window: ClientWindow);

    fn remove(&self, key: &ClientKey) -> Option<ClientWindow>;

    /// Drop every window idle for longer than `idle_ms`. Returns how many were removed.
    fn prune(&self, now_ms: u64, idle_ms: u64) -> usize;

    fn stats(&self) -> StoreStats;

    /// Number of stored windows.
    fn tracked(&self) -> usize {
        self.stats().tracked
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: DashMap<ClientKey, ClientWindow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for MemoryStore {
    fn get(&self, key: &ClientKey) -> Option<ClientWindow> {
        self.windows.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &ClientKey, window: ClientWindow) {
        self.windows.insert(key.clone(), window);
    }

    fn remove(&self, key: &ClientKey) -> Option<ClientWindow> {
        self.windows.remove(key).map(|(_, w)| w)
    }

    fn prune(&self, now_ms: u64, idle_ms: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.is_idle(now_ms, idle_ms));
        before.saturating_sub(self.windows.len())
    }

    fn stats(&self) -> StoreStats {
        let mut stats = StoreStats::default();
        for r in self.windows.iter() {
            stats.tracked += 1;
            if r.value().is_blocked() {
                stats.blocked += 1;
            }
        }
        stats
    }

    fn tracked(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::window::RateLimitPolicy;

    fn window_at(t: u64) -> ClientWindow {
        let mut w = ClientWindow::new();
        w.admit(t, &RateLimitPolicy::default());
        w
    }

    #[test]
    fn test_store_operations() {
        let store = MemoryStore::new();
        let key = ClientKey::new("203.0.113.7");

        assert!(store.get(&key).is_none());
        store.set(&key, window_at(5));
        assert_eq!(store.get(&key).unwrap().latest(), Some(5));
        assert_eq!(store.stats(), StoreStats { tracked: 1, blocked: 0 });

        assert!(store.remove(&key).is_some());
        assert!(store.get(&key).is_none());
    }

    #[test]
    fn test_prune_idle_and_empty() {
        let store = MemoryStore::new();
        store.set(&ClientKey::new("old"), window_at(0));
        store.set(&ClientKey::new("fresh"), window_at(500_000));
        store.set(&ClientKey::new("empty"), ClientWindow::new());

        let removed = store.prune(600_001, 600_000);
        assert_eq!(removed, 2);
        assert!(store.get(&ClientKey::new("fresh")).is_some());
        assert!(store.get(&ClientKey::new("old")).is_none());
        assert!(store.get(&ClientKey::new("empty")).is_none());
    }
}
