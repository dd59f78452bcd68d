//! Gatekeeper middleware.
//!
//! scope → CORS → rate limit → downstream → CORS + security headers.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::RequestIdExt;
use crate::http::response::{preflight, GateRejection};
use crate::observability::metrics;
use crate::security::{apply_security_headers, ClientKey, CorsOutcome, Gatekeeper, RateDecision};

pub async fn gatekeeper_middleware(
    State(gate): State<Gatekeeper>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let policy = gate.policy();

    // 1. Only API routes are gated.
    if !policy.scope.in_scope(request.uri().path()) {
        return next.run(request).await;
    }

    // 2. CORS
    let allowed_origin = match policy.cors.evaluate(request.headers().get(header::ORIGIN)) {
        CorsOutcome::Rejected => {
            tracing::warn!(
                request_id = %request.request_id(),
                origin = ?request.headers().get(header::ORIGIN),
                path = %request.uri().path(),
                "Cross-origin request from disallowed origin"
            );
            return reject(GateRejection::OriginNotAllowed);
        }
        CorsOutcome::Allowed(origin) => Some(origin),
        CorsOutcome::NoOrigin => None,
    };

    if request.method() == Method::OPTIONS {
        let mut cors_headers = HeaderMap::new();
        if let Some(origin) = &allowed_origin {
            policy.cors.apply(&mut cors_headers, origin);
        }
        return preflight(cors_headers);
    }

    // 3. Rate limit
    let client = ClientKey::from_headers(request.headers());
    let retry_after_secs = policy.limits.retry_after_secs();
    match gate.limiter().check(&client, gate.now_ms(), &policy.limits) {
        RateDecision::Admitted { in_window } => {
            tracing::trace!(
                request_id = %request.request_id(),
                client = %client,
                in_window,
                "Request admitted"
            );
        }
        RateDecision::LimitExceeded => {
            return reject(GateRejection::RateLimitExceeded { retry_after_secs });
        }
        RateDecision::Blocked => {
            return reject(GateRejection::TooManyRequests { retry_after_secs });
        }
    }

    // 4. Downstream, then decorate the response.
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    if let Some(origin) = &allowed_origin {
        policy.cors.apply(headers, origin);
    }
    apply_security_headers(headers);
    response
}

fn reject(rejection: GateRejection) -> Response {
    metrics::record_rejection(rejection.reason());
    rejection.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use axum::{
        body::to_bytes,
        http::{HeaderValue, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use crate::config::{Environment, GateConfig};
    use crate::security::{ManualClock, RateLimiter};

    const ALLOWED: &str = "https://bageledu.com";

    fn gate_with(config: GateConfig) -> (Gatekeeper, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let gate = Gatekeeper::with_parts(&config, Arc::new(RateLimiter::in_memory()), clock.clone());
        (gate, clock)
    }

    fn app(gate: Gatekeeper) -> Router {
        Router::new()
            .route("/api/posts", get(|| async { "posts" }).post(|| async { "created" }))
            .route("/logo.png", get(|| async { "png" }))
            .layer(from_fn_with_state(gate, gatekeeper_middleware))
    }

    fn get_request(path: &str, headers: &[(&'static str, &'static str)]) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn has_gate_headers(response: &Response) -> bool {
        let h = response.headers();
        h.contains_key(header::CONTENT_SECURITY_POLICY)
            || h.contains_key(header::X_FRAME_OPTIONS)
            || h.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    }

    #[tokio::test]
    async fn test_admitted_request_gets_security_headers() {
        let (gate, _) = gate_with(GateConfig::default());
        let app = app(gate);

        let response = send(&app, get_request("/api/posts", &[])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
        // Same-origin: no CORS headers
        assert!(!response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(body_string(response).await, "posts");
    }

    #[tokio::test]
    async fn test_disallowed_origin_rejected_without_cors_headers() {
        let (gate, _) = gate_with(GateConfig::default());
        let limiter = gate.limiter().clone();
        let app = app(gate);

        let response = send(
            &app,
            get_request("/api/posts", &[("origin", "https://evil.example")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!has_gate_headers(&response));
        assert_eq!(
            body_string(response).await,
            r#"{"error":"CORS error: Origin not allowed"}"#
        );
        // Rejected before any rate accounting
        assert_eq!(limiter.stats().tracked, 0);
    }

    #[tokio::test]
    async fn test_allowed_origin_is_echoed() {
        let (gate, _) = gate_with(GateConfig::default());
        let app = app(gate);

        let response = send(&app, get_request("/api/posts", &[("origin", ALLOWED)])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[tokio::test]
    async fn test_preflight_short_circuits_without_counting() {
        let (gate, _) = gate_with(GateConfig::default());
        let limiter = gate.limiter().clone();
        let app = app(gate);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/posts")
            .header("origin", ALLOWED)
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let h = response.headers();
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED);
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert!(h.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert!(h.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
        assert!(!h.contains_key(header::CONTENT_SECURITY_POLICY));
        assert!(body_string(response).await.is_empty());
        assert!(limiter.snapshot(&ClientKey::new("203.0.113.7")).is_none());
    }

    #[tokio::test]
    async fn test_out_of_scope_bypasses_gate() {
        let (gate, _) = gate_with(GateConfig::default());
        let limiter = gate.limiter().clone();
        let app = app(gate);

        for _ in 0..100 {
            let response = send(
                &app,
                get_request("/logo.png", &[("origin", "https://evil.example")]),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(!has_gate_headers(&response));
        }
        assert_eq!(limiter.stats().tracked, 0);
    }

    #[tokio::test]
    async fn test_rate_limit_and_cooldown() {
        let (gate, clock) = gate_with(GateConfig::default());
        let app = app(gate);
        let client = [("x-forwarded-for", "203.0.113.7")];

        for _ in 0..60 {
            let response = send(&app, get_request("/api/posts", &client)).await;
            assert_eq!(response.status(), StatusCode::OK);
            clock.advance(100);
        }

        let response = send(&app, get_request("/api/posts", &client)).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(!response.headers().contains_key(header::CONTENT_SECURITY_POLICY));
        assert_eq!(
            body_string(response).await,
            r#"{"error":"Rate limit exceeded. Please try again later."}"#
        );

        // Hammering during cooldown does not extend it
        for _ in 0..59 {
            clock.advance(1_000);
            let response = send(&app, get_request("/api/posts", &client)).await;
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(
                body_string(response).await,
                r#"{"error":"Too many requests. Please try again later."}"#
            );
        }

        clock.advance(1_000);
        let response = send(&app, get_request("/api/posts", &client)).await;
        assert_eq!(response.status(), StatusCode::OK);

        // Other clients were never affected
        let other = send(
            &app,
            get_request("/api/posts", &[("x-forwarded-for", "198.51.100.9")]),
        )
        .await;
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_clients_without_forwarding_headers_share_a_bucket() {
        let mut config = GateConfig::default();
        config.rate_limit.max_requests_per_window = 2;
        let (gate, _) = gate_with(config);
        let app = app(gate);

        // Two different browsers, neither behind a forwarding proxy
        let first = || get_request("/api/posts", &[("user-agent", "first")]);
        let second = || get_request("/api/posts", &[("user-agent", "second")]);

        assert_eq!(send(&app, first()).await.status(), StatusCode::OK);
        assert_eq!(send(&app, second()).await.status(), StatusCode::OK);
        assert_eq!(send(&app, first()).await.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(send(&app, second()).await.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_localhost_origin_in_development_only() {
        let localhost = [("origin", "http://localhost:3000")];

        let (gate, _) = gate_with(GateConfig::default());
        let response = send(&app(gate), get_request("/api/posts", &localhost)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let config = GateConfig {
            environment: Environment::Development,
            ..GateConfig::default()
        };
        let (gate, _) = gate_with(config);
        let response = send(&app(gate), get_request("/api/posts", &localhost)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("http://localhost:3000")
        );
    }

    #[tokio::test]
    async fn test_reloaded_policy_applies_to_next_request() {
        let (gate, _) = gate_with(GateConfig::default());
        let app = app(gate.clone());

        let mut config = GateConfig::default();
        config.allowed_origins.push("https://blog.example".into());
        gate.reload(&config);

        let response = send(
            &app,
            get_request("/api/posts", &[("origin", "https://blog.example")]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
