use std::sync::Arc;

use freight_dispatch::api;
use freight_dispatch::config::{Config, LogFormat};
use freight_dispatch::error::AppError;
use freight_dispatch::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    let shared_state = Arc::new(AppState::from_config(&config)?);
    let app = api::rest::router(shared_state);

    tracing::info!(
        routing_provider = config.routing_provider_url.as_deref().unwrap_or("local"),
        legal_service = config.legal_service_url.as_deref().unwrap_or("local"),
        finance_configured = config.finance_service_url.is_some(),
        "dispatch service configured"
    );

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
