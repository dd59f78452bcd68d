//! API gatekeeper for the blog CMS.
//!
//! Sits in front of the content application, gates every API route with a
//! CORS allow-list, a per-client sliding-window rate limiter and a fixed set
//! of security headers, and forwards everything else untouched.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatekeeperConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::Gatekeeper;
