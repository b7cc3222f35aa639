//! Web server module for handling Miniflux webhooks.
//!
//! This module provides:
//! - `POST /webhook`: verify, parse and forward a Miniflux event
//! - `GET /health`: liveness probe
//! - `GET /`: service information

pub mod handlers;
pub mod signature;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    health, index, miniflux_webhook, AppState, HealthResponse, ServiceInfo, WebhookResponse,
};
pub use signature::{compute_signature, verify_miniflux_signature};

/// Build the application router.
///
/// The body limit replaces axum's 2 MiB default with `Config::max_body_bytes`.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/webhook", post(miniflux_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
