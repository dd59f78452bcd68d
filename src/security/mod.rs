//! Request gate for API routes.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → scope.rs (outside the API prefix? pass through untouched)
//!     → cors.rs (disallowed Origin → 403, OPTIONS → 204)
//!     → identity.rs + rate_limit.rs (sliding window, cooldown → 429)
//!     → downstream handler
//!     → cors.rs + headers.rs (CORS and security headers on the response)
//!
//! Background:
//!     eviction.rs drops idle client windows every interval
//! ```
//!
//! # Design Decisions
//! - The window transition (window.rs) is pure; state lives behind store.rs
//! - Rejections are answered immediately and never reach the upstream
//! - Client identity trusts forwarding headers; deploy behind a trusted proxy

pub mod clock;
pub mod cors;
pub mod eviction;
pub mod gate;
pub mod headers;
pub mod identity;
pub mod rate_limit;
pub mod scope;
pub mod store;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cors::{CorsOutcome, CorsPolicy};
pub use eviction::EvictionSweeper;
pub use gate::{GatePolicy, Gatekeeper};
pub use headers::apply_security_headers;
pub use identity::ClientKey;
pub use rate_limit::RateLimiter;
pub use scope::ApiScope;
pub use store::{MemoryStore, StoreStats, WindowStore};
pub use window::{ClientWindow, RateDecision, RateLimitPolicy};
