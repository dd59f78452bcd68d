//! Gate state shared by the request middleware, the sweeper and the admin API.

use std::sync::Arc;
use arc_swap::ArcSwap;

use crate::config::GateConfig;
use crate::security::clock::{Clock, SystemClock};
use crate::security::cors::CorsPolicy;
use crate::security::rate_limit::RateLimiter;
use crate::security::scope::ApiScope;
use crate::security::window::RateLimitPolicy;

/// The hot-reloadable part of the gate.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub scope: ApiScope,
    pub cors: CorsPolicy,
    pub limits: RateLimitPolicy,
}

impl GatePolicy {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            scope: ApiScope::new(config.api_prefix.clone()),
            cors: CorsPolicy::from_config(config),
            limits: RateLimitPolicy::from_config(&config.rate_limit),
        }
    }
}

/// Handle to the gate. Cheap to clone; clones share policy and limiter state.
#[derive(Clone)]
pub struct Gatekeeper {
    policy: Arc<ArcSwap<GatePolicy>>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl Gatekeeper {
    pub fn new(config: &GateConfig) -> Self {
        Self::with_parts(config, Arc::new(RateLimiter::in_memory()), Arc::new(SystemClock))
    }

    pub fn with_parts(config: &GateConfig, limiter: Arc<RateLimiter>, clock: Arc<dyn Clock>) -> Self {
        let policy = GatePolicy::from_config(config);
        tracing::info!(
            api_prefix = %policy.scope.prefix(),
            environment = ?config.environment,
            allowed_origins = policy.cors.allowed_origins().len(),
            max_requests = policy.limits.max_requests,
            window_ms = policy.limits.window_ms,
            "Gate policy loaded"
        );

        Self {
            policy: Arc::new(ArcSwap::from_pointee(policy)),
            limiter,
            clock,
        }
    }

    /// Current policy snapshot.
    pub fn policy(&self) -> Arc<GatePolicy> {
        self.policy.load_full()
    }

    /// Swap in a new policy. Client windows are kept.
    pub fn reload(&self, config: &GateConfig) {
        let policy = GatePolicy::from_config(config);
        tracing::info!(
            api_prefix = %policy.scope.prefix(),
            allowed_origins = policy.cors.allowed_origins().len(),
            max_requests = policy.limits.max_requests,
            "Gate policy reloaded"
        );
        self.policy.store(Arc::new(policy));
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
