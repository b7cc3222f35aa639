//! Webhook endpoint handlers.
//!
//! The webhook handler runs the whole pipeline inline:
//! 1. Verify the HMAC signature over the raw body
//! 2. Parse the Miniflux event
//! 3. Forward each article to Instapaper
//! 4. Summarize the outcome in the response

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::instapaper::{forward_event, ArticleFailure, InstapaperClient};
use crate::miniflux::{parse_webhook, ParsedWebhook};
use crate::web::signature::verify_miniflux_signature;
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub instapaper: InstapaperClient,
}

impl AppState {
    pub fn new(config: Config, instapaper: InstapaperClient) -> Self {
        Self {
            config: Arc::new(config),
            instapaper,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe. Never touches Instapaper.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Service Info
// =============================================================================

/// Endpoints advertised by the index route.
#[derive(Serialize)]
pub struct Endpoints {
    pub webhook: &'static str,
    pub health: &'static str,
}

/// Index response.
#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
    pub status: &'static str,
}

/// Basic service information.
pub async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "Miniflux to Instapaper Webhook",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            webhook: "/webhook",
            health: "/health",
        },
        status: "running",
    })
}

// =============================================================================
// Miniflux Webhook
// =============================================================================

/// Webhook response.
#[derive(Debug, Default, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarded: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ArticleFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    fn error(status: &'static str, error: impl Into<String>) -> Self {
        Self {
            status,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Miniflux webhook endpoint.
///
/// Responds with:
/// - `401` when the signature is missing or wrong
/// - `400` when the payload cannot be interpreted at all
/// - `200` for unsupported events, which are acknowledged and dropped
/// - `200` with `{forwarded, failed}` when forwarding was at least partly successful
/// - `502` when every article failed at Instapaper
pub async fn miniflux_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let config = &state.config;
    let signature = header_str(&headers, &config.signature_header);
    let event_type_header = header_str(&headers, &config.event_type_header);

    info!(
        event_type = event_type_header.unwrap_or(""),
        body_length = body.len(),
        has_signature = signature.is_some(),
        "miniflux_webhook_received"
    );

    // Verify against the exact bytes received
    if !verify_miniflux_signature(config.webhook_secret.as_deref(), &body, signature) {
        warn!(
            event_type = event_type_header.unwrap_or(""),
            error_kind = "invalid_signature",
            "miniflux_signature_invalid"
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(WebhookResponse::error("unauthorized", "Invalid signature")),
        );
    }

    let event = match parse_webhook(&body, event_type_header) {
        Ok(ParsedWebhook::Supported(event)) => event,
        Ok(ParsedWebhook::Unsupported { event_type }) => {
            warn!(event_type = %event_type, "miniflux_event_ignored");
            return (
                StatusCode::OK,
                Json(WebhookResponse {
                    status: "ignored",
                    event_type: Some(event_type),
                    error: Some("Event type not supported".to_string()),
                    ..Default::default()
                }),
            );
        }
        Err(e) => {
            warn!(
                event_type = event_type_header.unwrap_or(""),
                error_kind = "malformed_event",
                error = %e,
                "miniflux_event_malformed"
            );
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::error("invalid_payload", e.to_string())),
            );
        }
    };

    let summary = forward_event(&state.instapaper, &event).await;

    let (status_code, status) = if summary.all_failed_downstream() {
        error!(
            event_type = event.event_type(),
            failed = summary.failed,
            auth_failures = summary.auth_failures(),
            "miniflux_webhook_forward_failed"
        );
        (StatusCode::BAD_GATEWAY, "error")
    } else if summary.failed > 0 {
        (StatusCode::OK, "partial")
    } else {
        (StatusCode::OK, "success")
    };

    info!(
        event_type = event.event_type(),
        forwarded = summary.forwarded,
        failed = summary.failed,
        status_code = status_code.as_u16(),
        "miniflux_webhook_complete"
    );

    (
        status_code,
        Json(WebhookResponse {
            status,
            event_type: Some(event.event_type().to_string()),
            feed: event.feed_title().map(str::to_string),
            forwarded: Some(summary.forwarded),
            failed: Some(summary.failed),
            failures: summary.failures,
            error: None,
        }),
    )
}
