//! HTTP API over a loaded search engine.

pub mod routes;

use crate::engine::EngineHandle;

/// Shared application state for the HTTP server.
///
/// The engine is immutable once loaded, so handlers share it without locks.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
}

impl AppState {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }
}

/// Serve `engine` on `addr` until ctrl-c.
pub async fn serve(addr: &str, engine: EngineHandle) -> anyhow::Result<()> {
    let app = routes::create_router(AppState::new(engine));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c; shutting down");
    }
}
