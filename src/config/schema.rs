//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gatekeeper.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gatekeeper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The content application every admitted request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Scope, CORS and rate-limit policy for API routes.
    pub gate: GateConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream (content application) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream, e.g. "http://127.0.0.1:3000".
    pub base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// Deployment environment. Outside production the development origins
/// are appended to the CORS allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Interpret a `NODE_ENV`-style value. Anything but "production" is development.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

/// Request gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateConfig {
    /// Path prefix that puts a request in scope of the gate.
    pub api_prefix: String,

    /// Deployment environment.
    pub environment: Environment,

    /// Origins allowed to make cross-origin API calls.
    pub allowed_origins: Vec<String>,

    /// Local origins allowed only outside production.
    pub development_origins: Vec<String>,

    /// Value of `Access-Control-Allow-Methods`.
    pub allow_methods: Vec<String>,

    /// Value of `Access-Control-Allow-Headers`.
    pub allow_headers: Vec<String>,

    pub rate_limit: RateLimitConfig,

    pub eviction: EvictionConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            environment: Environment::default(),
            allowed_origins: vec![
                "https://bageledu.com".to_string(),
                "https://www.bageledu.com".to_string(),
                "https://admin.bageledu.com".to_string(),
            ],
            development_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            allow_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_headers: ["Content-Type", "Authorization", "X-CSRF-Token"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rate_limit: RateLimitConfig::default(),
            eviction: EvictionConfig::default(),
        }
    }
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests accepted per client within one window.
    pub max_requests_per_window: u32,

    /// Length of the trailing window in milliseconds.
    pub window_ms: u64,

    /// Cooldown imposed once a client exceeds the window, in milliseconds.
    pub block_duration_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_window: 60,
            window_ms: 60_000,
            block_duration_ms: 60_000,
        }
    }
}

/// Idle client eviction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// How often the sweep runs, in seconds.
    pub interval_secs: u64,

    /// Clients idle for longer than this are forgotten, in milliseconds.
    pub idle_ms: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 600,
            idle_ms: 600_000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
