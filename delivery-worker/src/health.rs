use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Process health check
///
/// Reports the worker process as alive. Queue and storage connectivity show
/// up in the poller's logs and metrics instead.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "delivery-worker",
        })),
    )
}

/// Router serving the health endpoint
#[must_use]
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Start the health check HTTP server
///
/// # Errors
///
/// Returns an error if the server fails to bind to the specified port
pub async fn start_health_server(
    port: u16,
    shutdown_token: CancellationToken,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Health check server listening on {}", addr);

    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
        })
        .await?;

    Ok(())
}
