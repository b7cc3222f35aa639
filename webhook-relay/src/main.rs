//! Fluxpaper web server - forwards Miniflux webhooks to Instapaper.
//!
//! Configuration is read from the environment once at startup; see
//! `Config::from_env` for the full list of variables.

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fluxpaper::{web, AppState, Config, InstapaperClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "config_invalid");
        return Err(e).context("Invalid configuration");
    }
    info!(
        host = %config.host,
        port = config.port,
        max_body_bytes = config.max_body_bytes,
        instapaper_username = %config.credentials.username,
        instapaper_password_set = config.credentials.password.is_some(),
        instapaper_api_url = %config.instapaper_api_url,
        request_timeout_ms = config.request_timeout_ms,
        signature_header = %config.signature_header,
        event_type_header = %config.event_type_header,
        "config_loaded"
    );

    let instapaper =
        InstapaperClient::from_config(&config).context("Failed to create HTTP client")?;

    if config.verify_credentials_on_start {
        match instapaper.authenticate().await {
            Ok(()) => info!("instapaper_credentials_verified"),
            Err(e) => warn!(error = %e, error_kind = e.kind().as_str(), "instapaper_credentials_check_failed"),
        }
    }

    let addr = config.bind_addr();
    let state = AppState::new(config, instapaper);
    let app = web::router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
