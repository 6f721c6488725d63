//! Liveness endpoint for hosting platforms that expect an open HTTP port.

use {
    axum::{Json, Router, response::IntoResponse, routing::get},
    relaybot_config::ServerConfig,
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
    tracing::info,
};

pub fn router() -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}

pub async fn bind(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind liveness endpoint on {addr}: {e}"))?;
    info!(addr = %listener.local_addr()?, "liveness endpoint listening");
    Ok(listener)
}

/// Serve until `cancel` fires.
pub async fn serve(listener: TcpListener, cancel: CancellationToken) -> anyhow::Result<()> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

async fn root_handler() -> &'static str {
    "relaybot is running"
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
