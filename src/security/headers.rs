//! Security response headers.
//!
//! Attached to every gated response that reached the downstream handler.
//! Rejections and preflight answers do not carry them.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Content-Security-Policy for the CMS front end. Inline/eval scripts are needed
/// by the editor, Google sign-in loads from accounts.google.com, images come from
/// object storage and Google avatars, and framing is denied entirely.
pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
script-src 'self' 'unsafe-inline' 'unsafe-eval' accounts.google.com; \
style-src 'self' 'unsafe-inline'; \
img-src 'self' data: https://*.digitaloceanspaces.com *.googleusercontent.com; \
font-src 'self'; \
connect-src 'self'; \
frame-ancestors 'none'; \
base-uri 'self'; \
form-action 'self' accounts.google.com; \
object-src 'none'";

/// Insert the fixed security header set, overwriting any values already present.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY),
    );
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
}
