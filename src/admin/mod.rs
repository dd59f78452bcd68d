//! Operator API: gate status and per-client rate-limit state.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use axum::{
    middleware,
    routing::get,
    Router,
};

use crate::security::Gatekeeper;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub gate: Gatekeeper,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/clients", get(get_clients))
        .route("/admin/clients/{key}", get(get_client).delete(reset_client))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
