use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use brainers_state::Engine;

use crate::api::router;

/// Serve the query API until the shutdown signal fires.
pub async fn serve(
    engine: Arc<Engine>,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = router(engine).layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding query API on {addr}"))?;
    info!(%addr, "query API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .context("query API server")?;
    Ok(())
}
