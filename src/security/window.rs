//! Per-client sliding window with cooldown.
//!
//! The transition is a pure function of the window, "now" and the policy, so
//! it behaves the same whichever [`WindowStore`](super::store::WindowStore)
//! holds the state.

use std::collections::VecDeque;
use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;

/// Limits applied to every client window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Accepted requests per trailing window; one more trips the block.
    pub max_requests: u32,
    pub window_ms: u64,
    pub block_duration_ms: u64,
}

impl RateLimitPolicy {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests_per_window,
            window_ms: config.window_ms,
            block_duration_ms: config.block_duration_ms,
        }
    }

    /// Block duration rounded up to whole seconds, for `Retry-After`.
    pub fn retry_after_secs(&self) -> u64 {
        self.block_duration_ms.div_ceil(1000)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

/// Result of running one request through a client window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request accepted; `in_window` counts it.
    Admitted { in_window: usize },
    /// This request exceeded the window and started the cooldown.
    LimitExceeded,
    /// Client is still cooling down; nothing was recorded.
    Blocked,
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateDecision::Admitted { .. })
    }
}

/// Rate-tracking record for one client key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientWindow {
    timestamps: VecDeque<u64>,
    blocked: bool,
}

impl ClientWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Recorded request instants, oldest first.
    pub fn timestamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.timestamps.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Most recent recorded instant.
    pub fn latest(&self) -> Option<u64> {
        self.timestamps.iter().copied().max()
    }

    /// True when nothing was recorded within `idle_ms` of `now_ms`.
    pub fn is_idle(&self, now_ms: u64, idle_ms: u64) -> bool {
        match self.latest() {
            Some(latest) => now_ms.saturating_sub(latest) > idle_ms,
            None => true,
        }
    }

    /// Run one request at `now_ms` through the window.
    pub fn admit(&mut self, now_ms: u64, policy: &RateLimitPolicy) -> RateDecision {
        if self.blocked {
            let latest = self.latest().unwrap_or(0);
            if now_ms.saturating_sub(latest) < policy.block_duration_ms {
                return RateDecision::Blocked;
            }
            self.blocked = false;
            self.timestamps.clear();
            self.timestamps.push_back(now_ms);
            return RateDecision::Admitted { in_window: 1 };
        }

        self.timestamps
            .retain(|&t| now_ms.saturating_sub(t) < policy.window_ms);
        self.timestamps.push_back(now_ms);

        if self.timestamps.len() > policy.max_requests as usize {
            self.blocked = true;
            RateDecision::LimitExceeded
        } else {
            RateDecision::Admitted {
                in_window: self.timestamps.len(),
            }
        }
    }
}
