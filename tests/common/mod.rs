//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use api_gatekeeper::config::GatekeeperConfig;
use api_gatekeeper::{HttpServer, Shutdown};
use axum::{
    http::{HeaderMap, Uri},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Start a mock content application on an ephemeral port.
///
/// Every route answers 200 with a JSON echo of the path and the request id it
/// received.
pub async fn start_mock_upstream() -> SocketAddr {
    let app = Router::new().fallback(|uri: Uri, headers: HeaderMap| async move {
        let request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Json(json!({ "path": uri.path(), "request_id": request_id }))
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a mock content application that waits `delay` before answering.
#[allow(dead_code)]
pub async fn start_slow_upstream(delay: Duration) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Config pointing at `upstream`, with metrics and file watching off.
pub fn test_config(upstream: SocketAddr) -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.upstream.base_url = format!("http://{}", upstream);
    config.observability.metrics_enabled = false;
    config
}

/// Start the gatekeeper on an ephemeral port and return its address.
pub async fn start_gatekeeper(config: GatekeeperConfig, shutdown: &Shutdown) -> SocketAddr {
    let (addr, _) = start_reloadable_gatekeeper(config, shutdown).await;
    addr
}

/// Like [`start_gatekeeper`], but also returns the channel that feeds config reloads.
pub async fn start_reloadable_gatekeeper(
    config: GatekeeperConfig,
    shutdown: &Shutdown,
) -> (SocketAddr, mpsc::UnboundedSender<GatekeeperConfig>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (updates_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (addr, updates_tx)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
