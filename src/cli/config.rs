//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{ModelConfig, ServerConfig};
use crate::inference::{SegmentationBackend, UnavailableBackend};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Merge CLI arguments into the environment configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Command-line values win over environment values
    pub(crate) fn from_cli(cli: &Cli, mut config: ServerConfig) -> Result<ServerConfig> {
        if let Some(host) = &cli.host {
            config.host.clone_from(host);
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(model) = &cli.model {
            config.model.path = Some(model.clone());
        }

        config.validate().context("Configuration validation failed")?;
        config
            .socket_addr()
            .context("Invalid listen address")?;
        Ok(config)
    }

    /// Segmentation backend for the configured model
    ///
    /// Without a model path the server still starts; removal requests then
    /// fail with a segmentation error.
    pub(crate) fn create_backend(model: &ModelConfig) -> Arc<dyn SegmentationBackend> {
        #[cfg(feature = "tract")]
        {
            if model.path.is_some() {
                return Arc::new(crate::backends::TractBackend::new(model));
            }
        }

        let reason = if cfg!(feature = "tract") {
            "No segmentation model configured (set MODEL_PATH or pass --model)"
        } else {
            "Built without a segmentation backend (enable the `tract` feature)"
        };
        tracing::warn!(
            model_path = ?model.path,
            "{reason}; /remove-background will fail until this is fixed"
        );
        Arc::new(UnavailableBackend::new(reason))
    }
}
