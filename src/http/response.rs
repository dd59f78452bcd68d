//! Responses produced by the gatekeeper itself.
//!
//! Every rejection is a JSON body `{"error": "<message>"}` with
//! `Content-Type: application/json`. Rate-limit rejections carry `Retry-After`.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A request stopped by the gate or failed while forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("CORS error: Origin not allowed")]
    OriginNotAllowed,

    /// The request that pushed the client over the window.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// Any request received while the client is cooling down.
    #[error("Too many requests. Please try again later.")]
    TooManyRequests { retry_after_secs: u64 },

    #[error("Upstream request failed")]
    UpstreamFailed,
}

impl GateRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            GateRejection::OriginNotAllowed => StatusCode::FORBIDDEN,
            GateRejection::RateLimitExceeded { .. } | GateRejection::TooManyRequests { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GateRejection::UpstreamFailed => StatusCode::BAD_GATEWAY,
        }
    }

    /// Label used for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            GateRejection::OriginNotAllowed => "cors",
            GateRejection::RateLimitExceeded { .. } => "rate_limit",
            GateRejection::TooManyRequests { .. } => "cooldown",
            GateRejection::UpstreamFailed => "upstream_error",
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        if let GateRejection::RateLimitExceeded { retry_after_secs }
        | GateRejection::TooManyRequests { retry_after_secs } = &self
        {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), headers, Json(body)).into_response()
    }
}

/// Answer to a CORS preflight: 204, empty body, plus whatever CORS headers apply.
pub fn preflight(cors_headers: HeaderMap) -> Response {
    (StatusCode::NO_CONTENT, cors_headers).into_response()
}
