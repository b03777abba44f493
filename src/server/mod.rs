//! HTTP surface of the service
//!
//! Routes, multipart handling and the mapping from [`BgRemovalError`] onto
//! JSON error responses. All per-process state lives in [`AppState`].
//!
//! [`BgRemovalError`]: crate::error::BgRemovalError

mod app;
mod error;
mod handlers;
mod models;

pub use app::create_app;
pub use error::ApiError;
pub use handlers::{sanitize_filename, ROUTE_EXTENSIONS};
pub use models::{ApiInfo, HealthResponse, Limits};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::inference::SegmentationBackend;
use crate::processor::{BackgroundRemovalProcessor, ProcessorConfig};
use crate::tracing_config::events;
use std::sync::Arc;

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub processor: Arc<BackgroundRemovalProcessor>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the processor for `config` around `backend`
    pub fn new(config: ServerConfig, backend: Arc<dyn SegmentationBackend>) -> Result<Self> {
        config.validate()?;
        let processor =
            BackgroundRemovalProcessor::new(backend, ProcessorConfig::from_server_config(&config))?;
        Ok(Self {
            processor: Arc::new(processor),
            config: Arc::new(config),
        })
    }
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    events::server_started(
        &local_addr,
        state.processor.backend().name(),
        &state.config.environment.to_string(),
    );

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
