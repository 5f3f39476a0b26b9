//! # ramlson-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the book service. Configuration comes
//! from `CONFIG_PATH` and the environment (see [`ramlson_api::config`]).

use ramlson_api::config::AppConfig;
use ramlson_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration failed: {e}");
        e
    })?;
    tracing::info!(?config, "loaded configuration");
    let port = config.port;

    let state = AppState::with_config(config).map_err(|e| {
        tracing::error!("Schema loading failed: {e}");
        e
    })?;
    tracing::info!(schemas = ?state.schemas.names(), "schemas ready");

    let app = ramlson_api::app(state)?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("ramlson API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
