//! Admin API and live policy reload against a running gatekeeper.

use std::time::Duration;

use api_gatekeeper::Shutdown;
use serde_json::Value;

mod common;

const ADMIN_ADDR: &str = "127.0.0.1:28281";
const ADMIN_KEY: &str = "integration-secret";

#[tokio::test]
async fn test_admin_reset_lifts_block() {
    let upstream = common::start_mock_upstream().await;
    let mut config = common::test_config(upstream);
    config.gate.rate_limit.max_requests_per_window = 2;
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.into();
    config.admin.bind_address = ADMIN_ADDR.into();

    let shutdown = Shutdown::new();
    let gate = common::start_gatekeeper(config, &shutdown).await;
    let client = common::client();
    let url = format!("http://{}/api/posts", gate);

    for _ in 0..3 {
        client
            .get(&url)
            .header("x-forwarded-for", "203.0.113.30")
            .send()
            .await
            .unwrap();
    }
    let res = client
        .get(&url)
        .header("x-forwarded-for", "203.0.113.30")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);

    // Missing token
    let res = client
        .get(format!("http://{}/admin/clients", ADMIN_ADDR))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .get(format!("http://{}/admin/clients", ADMIN_ADDR))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let stats: Value = res.json().await.unwrap();
    assert_eq!(stats["tracked"], 1);
    assert_eq!(stats["blocked"], 1);

    let res = client
        .delete(format!("http://{}/admin/clients/203.0.113.30", ADMIN_ADDR))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let res = client
        .get(&url)
        .header("x-forwarded-for", "203.0.113.30")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
}

#[tokio::test]
async fn test_reload_adds_allowed_origin() {
    let upstream = common::start_mock_upstream().await;
    let config = common::test_config(upstream);
    let shutdown = Shutdown::new();
    let (gate, updates) = common::start_reloadable_gatekeeper(config.clone(), &shutdown).await;
    let client = common::client();
    let url = format!("http://{}/api/posts", gate);

    let res = client
        .get(&url)
        .header("origin", "https://blog.example")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let mut reloaded = config;
    reloaded.gate.allowed_origins.push("https://blog.example".into());
    updates.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = client
        .get(&url)
        .header("origin", "https://blog.example")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "https://blog.example");

    shutdown.trigger();
}
