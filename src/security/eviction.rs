//! Background eviction of idle client windows.
//!
//! Owned by the server: started from `HttpServer::run` and stopped through the
//! shutdown broadcast, never on its own at module load.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::EvictionConfig;
use crate::observability::metrics;
use crate::security::clock::Clock;
use crate::security::rate_limit::RateLimiter;

pub struct EvictionSweeper {
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    idle_ms: u64,
}

impl EvictionSweeper {
    pub fn new(limiter: Arc<RateLimiter>, clock: Arc<dyn Clock>, config: &EvictionConfig) -> Self {
        Self {
            limiter,
            clock,
            interval: Duration::from_secs(config.interval_secs),
            idle_ms: config.idle_ms,
        }
    }

    /// Run one sweep now. Returns the number of evicted clients.
    pub fn sweep_once(&self) -> usize {
        let evicted = self.limiter.sweep(self.clock.now_ms(), self.idle_ms);
        let remaining = self.limiter.stats();

        metrics::record_evicted_clients(evicted);
        metrics::record_tracked_clients(remaining.tracked);

        if evicted > 0 {
            tracing::debug!(evicted, tracked = remaining.tracked, "Evicted idle clients");
        }
        evicted
    }

    /// Sweep every interval until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            idle_ms = self.idle_ms,
            "Eviction sweeper starting"
        );

        let Some(first_tick) = Instant::now().checked_add(self.interval) else {
            tracing::warn!(
                interval_secs = self.interval.as_secs(),
                "Eviction interval out of range, sweeper disabled"
            );
            let _ = shutdown.recv().await;
            return;
        };
        let mut ticker = time::interval_at(first_tick, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Eviction sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
