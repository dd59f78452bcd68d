//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, apply GATEKEEPER_ENV / NODE_ENV overrides)
//!     → validation.rs (semantic checks)
//!     → GatekeeperConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → gate policy swapped atomically; rate-limit state is kept
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so an empty file is a valid config
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the gate policy is hot-reloadable; listeners and upstream need a restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_default, ConfigError};
pub use schema::{
    AdminConfig, Environment, EvictionConfig, GateConfig, GatekeeperConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, RateLimitConfig, TimeoutConfig, UpstreamConfig,
};
