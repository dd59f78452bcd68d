//! CORS enforcement for gated routes.
//!
//! Unlike a permissive CORS layer, a disallowed `Origin` is rejected outright
//! rather than answered without CORS headers. Requests without `Origin`
//! (same-origin or non-browser clients) are not subject to the check.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::GateConfig;

/// Outcome of checking a request's `Origin` against the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOutcome {
    /// No `Origin` header.
    NoOrigin,
    /// Origin is allow-listed; carries the exact value to echo back.
    Allowed(HeaderValue),
    /// Origin present but not allow-listed.
    Rejected,
}

/// Allow-list and response headers for cross-origin API calls.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Vec<HeaderValue>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsPolicy {
    /// Build the effective policy. Development origins are only added outside production.
    pub fn from_config(config: &GateConfig) -> Self {
        let mut origins: Vec<&String> = config.allowed_origins.iter().collect();
        if !config.environment.is_production() {
            origins.extend(config.development_origins.iter());
        }

        let allowed = origins
            .into_iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Skipping origin that is not a valid header value");
                    None
                }
            })
            .collect();

        Self {
            allowed,
            allow_methods: join_header(&config.allow_methods),
            allow_headers: join_header(&config.allow_headers),
        }
    }

    /// The effective allow-list.
    pub fn allowed_origins(&self) -> &[HeaderValue] {
        &self.allowed
    }

    pub fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.allowed.iter().any(|o| o == origin)
    }

    /// Check the `Origin` of an incoming request.
    pub fn evaluate(&self, origin: Option<&HeaderValue>) -> CorsOutcome {
        match origin {
            None => CorsOutcome::NoOrigin,
            Some(origin) if self.is_allowed(origin) => CorsOutcome::Allowed(origin.clone()),
            Some(_) => CorsOutcome::Rejected,
        }
    }

    /// Attach the CORS response headers for an allowed origin.
    pub fn apply(&self, headers: &mut HeaderMap, origin: &HeaderValue) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }
}

fn join_header(values: &[String]) -> HeaderValue {
    HeaderValue::from_str(&values.join(", ")).unwrap_or_else(|_| HeaderValue::from_static(""))
}
