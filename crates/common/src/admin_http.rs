//! Lightweight admin HTTP server
//!
//! Exposes `/healthz` and `/metrics` endpoints, with metrics provided by caller.
//! This is an operational side door only; store operations are not served here.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

async fn healthz() -> &'static str { "OK" }

async fn metrics_handler(f: fn() -> (StatusCode, String)) -> (StatusCode, String) {
    f()
}

fn router(metrics_fn: fn() -> (StatusCode, String)) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(move || metrics_handler(metrics_fn)))
}

/// Bind `addr` and serve the admin endpoints on the current runtime.
/// Returns the bound address (useful with port 0) and the serving task.
pub async fn spawn_admin_server(
    addr: &str,
    metrics_fn: fn() -> (StatusCode, String),
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("cannot bind admin listener {addr}: {e}"))?;
    let local = listener.local_addr()?;
    info!(addr = %local, "admin server listening");
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(metrics_fn)).await {
            error!(error = %e, "admin server stopped");
        }
    });
    Ok((local, task))
}
