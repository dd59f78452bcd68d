//! Client identity used to partition rate-limit state.
//!
//! The key comes from proxy-supplied headers and is not verified: without a
//! trusted reverse proxy in front, a client can pick its own key. Clients
//! without forwarding headers all share the [`UNKNOWN_CLIENT`] bucket.

use std::fmt;
use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// Shared bucket for requests that carry no forwarding headers.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rate-limit partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `x-forwarded-for` (first hop), then `x-real-ip`, then the shared unknown bucket.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = || {
            headers
                .get(X_REAL_IP)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        match forwarded.or_else(real_ip) {
            Some(ip) => Self(ip.to_string()),
            None => Self::unknown(),
        }
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_CLIENT
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
