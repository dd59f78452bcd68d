//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All errors are collected rather than stopping at the first one.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{GateConfig, GatekeeperConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("gate.api_prefix must start with '/' (got '{0}')")]
    InvalidApiPrefix(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field}: '{value}' is not a bare origin (scheme://host[:port])")]
    InvalidOrigin { field: &'static str, value: String },

    #[error("upstream.base_url: {0}")]
    InvalidUpstream(String),

    #[error("{field}: '{value}' is not a valid header token")]
    InvalidToken { field: &'static str, value: String },
}

/// Validate a parsed configuration, returning every problem found.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }
    if config.admin.enabled {
        check_address("admin.bind_address", &config.admin.bind_address, &mut errors);
    }

    check_upstream(&config.upstream.base_url, &mut errors);
    check_gate(&config.gate, &mut errors);

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_upstream(value: &str, errors: &mut Vec<ValidationError>) {
    match Url::parse(value) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::InvalidUpstream(
            format!("unsupported scheme '{}', only http is forwarded", url.scheme()),
        )),
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::InvalidUpstream("missing host".to_string()))
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidUpstream(e.to_string())),
    }
}

fn check_gate(gate: &GateConfig, errors: &mut Vec<ValidationError>) {
    if !gate.api_prefix.starts_with('/') {
        errors.push(ValidationError::InvalidApiPrefix(gate.api_prefix.clone()));
    }

    for origin in &gate.allowed_origins {
        check_origin("gate.allowed_origins", origin, errors);
    }
    for origin in &gate.development_origins {
        check_origin("gate.development_origins", origin, errors);
    }

    for method in &gate.allow_methods {
        if method.parse::<axum::http::Method>().is_err() {
            errors.push(ValidationError::InvalidToken {
                field: "gate.allow_methods",
                value: method.clone(),
            });
        }
    }
    for header in &gate.allow_headers {
        if header.parse::<axum::http::HeaderName>().is_err() {
            errors.push(ValidationError::InvalidToken {
                field: "gate.allow_headers",
                value: header.clone(),
            });
        }
    }

    if gate.rate_limit.max_requests_per_window == 0 {
        errors.push(ValidationError::Zero("gate.rate_limit.max_requests_per_window"));
    }
    if gate.rate_limit.window_ms == 0 {
        errors.push(ValidationError::Zero("gate.rate_limit.window_ms"));
    }
    if gate.rate_limit.block_duration_ms == 0 {
        errors.push(ValidationError::Zero("gate.rate_limit.block_duration_ms"));
    }
    if gate.eviction.interval_secs == 0 {
        errors.push(ValidationError::Zero("gate.eviction.interval_secs"));
    }
    if gate.eviction.idle_ms == 0 {
        errors.push(ValidationError::Zero("gate.eviction.idle_ms"));
    }
}

/// Browsers send `Origin` as `scheme://host[:port]` with no path or trailing slash,
/// and the allow-list is compared byte-for-byte against it.
fn check_origin(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let bare = match Url::parse(value) {
        Ok(url) => {
            url.host_str().is_some()
                && url.path() == "/"
                && !value.ends_with('/')
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    };
    if !bare {
        errors.push(ValidationError::InvalidOrigin {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatekeeperConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatekeeperConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.gate.api_prefix = "api".into();
        config.gate.rate_limit.window_ms = 0;
        config.gate.allowed_origins.push("https://bageledu.com/".into());
        config.gate.allowed_origins.push("https://bageledu.com/blog".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::InvalidApiPrefix("api".into())));
        assert!(errors.contains(&ValidationError::Zero("gate.rate_limit.window_ms")));
    }

    #[test]
    fn test_upstream_must_be_http() {
        let mut config = GatekeeperConfig::default();
        config.upstream.base_url = "https://cms.internal:3000".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidUpstream(_)));

        config.upstream.base_url = "not a url".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_origin_with_port_is_bare() {
        let mut errors = Vec::new();
        check_origin("gate.allowed_origins", "http://localhost:3000", &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_disabled_admin_address_not_checked() {
        let mut config = GatekeeperConfig::default();
        config.admin.bind_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.admin.enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
