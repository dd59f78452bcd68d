//! Middleware applied in front of every route.

pub mod gatekeeper;
pub mod metrics;

pub use gatekeeper::gatekeeper_middleware;
