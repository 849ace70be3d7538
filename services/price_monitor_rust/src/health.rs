//! Liveness endpoint for the hosting platform.
//!
//! Shares no state with the monitor; answering at all is the signal.

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

pub const LIVENESS_MESSAGE: &str = "Polymarket Monitor is running.";

pub fn build_router() -> Router {
    Router::new().route("/", get(liveness))
}

async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

/// Bind and serve until the process exits.
pub async fn serve(bind: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind liveness endpoint on {bind}"))?;
    serve_on(listener).await
}

pub async fn serve_on(listener: TcpListener) -> Result<()> {
    info!("Liveness endpoint listening on http://{}", listener.local_addr()?);
    axum::serve(listener, build_router())
        .await
        .context("liveness endpoint failed")
}
