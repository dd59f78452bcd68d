//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: gate middleware in front of the upstream forwarder
//! - Wire up request IDs, tracing, timeouts and request metrics
//! - Start the eviction sweeper, the admin API and the config reload task
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderName},
        uri::{Authority, Scheme},
        HeaderMap, Request, StatusCode, Uri,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use url::Url;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GatekeeperConfig;
use crate::http::middleware::{gatekeeper_middleware, metrics::track_requests};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::GateRejection;
use crate::security::{EvictionSweeper, Gatekeeper};

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream '{url}': {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Where admitted requests are sent.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    authority: Authority,
    base_path: String,
}

impl UpstreamTarget {
    pub fn parse(base_url: &str) -> Result<Self, ServerError> {
        let invalid = |reason: &str| ServerError::InvalidUpstream {
            url: base_url.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid("only http upstreams are supported"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let authority = Authority::from_str(&format!("{}:{}", host, port))
            .map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
        })
    }

    /// Rewrite an incoming URI to point at the upstream.
    pub fn uri_for(&self, original: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = original
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(format!("{}{}", self.base_path, path_and_query))
            .build()
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamTarget>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the gatekeeper.
pub struct HttpServer {
    router: Router,
    config: GatekeeperConfig,
    gate: Gatekeeper,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatekeeperConfig) -> Result<Self, ServerError> {
        let gate = Gatekeeper::new(&config.gate);
        Self::with_gatekeeper(config, gate)
    }

    /// Create a server around an existing gate (e.g. one with a custom store or clock).
    pub fn with_gatekeeper(config: GatekeeperConfig, gate: Gatekeeper) -> Result<Self, ServerError> {
        let upstream = Arc::new(UpstreamTarget::parse(&config.upstream.base_url)?);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState { upstream, client };
        let router = Self::build_router(&config, state, gate.clone());

        Ok(Self {
            router,
            config,
            gate,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatekeeperConfig, state: AppState, gate: Gatekeeper) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            // Timeout sits inside the gate: a 504 on an API route still carries gate headers.
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(middleware::from_fn_with_state(gate, gatekeeper_middleware))
            .layer(middleware::from_fn(track_requests))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The router, for embedding or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gate
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatekeeperConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        let sweeper = EvictionSweeper::new(
            self.gate.limiter().clone(),
            self.gate.clock().clone(),
            &self.config.gate.eviction,
        );
        tokio::spawn(sweeper.run(shutdown.resubscribe()));

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_router = setup_admin_router(AdminState {
                gate: self.gate.clone(),
                api_key: Arc::from(self.config.admin.api_key.as_str()),
            });
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %self.config.admin.bind_address, "Admin API listening");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API stopped");
                }
            });
        }

        let gate = self.gate.clone();
        let current_upstream = self.config.upstream.base_url.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(new_config) => {
                            gate.reload(&new_config.gate);
                            if new_config.upstream.base_url != current_upstream {
                                tracing::warn!(
                                    upstream = %new_config.upstream.base_url,
                                    "Upstream changes take effect after a restart"
                                );
                            }
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward the request to the upstream and relay its response.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request.request_id().to_string();
    let (mut parts, body) = request.into_parts();

    let uri = match state.upstream.uri_for(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return GateRejection::UpstreamFailed.into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %uri,
        "Forwarding request"
    );

    parts.uri = uri;
    strip_hop_by_hop(&mut parts.headers);
    let upstream_request = Request::from_parts(parts, body);

    match state.client.request(upstream_request).await {
        Ok(response) => {
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            GateRejection::UpstreamFailed.into_response()
        }
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}
