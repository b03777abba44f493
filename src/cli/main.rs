//! Background Removal API server
//!
//! Reads configuration from the environment, applies command-line overrides,
//! builds the segmentation backend and serves HTTP until Ctrl-C.

use super::config::CliConfigBuilder;
use crate::server::{self, AppState};
use crate::tracing_config::{TracingConfig, TracingFormat};
use crate::ServerConfig;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, info};

/// Background removal HTTP API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-api")]
pub struct Cli {
    /// Address to bind [default: 0.0.0.0]
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on [default: 8000]
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to the ONNX segmentation model
    #[arg(short, long, env = "MODEL_PATH", value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,

    /// Load the model before accepting requests
    #[arg(long)]
    pub preload_model: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => Self::Console,
            CliLogFormat::Compact => Self::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Self::Json,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli).context("Failed to initialize tracing")?;

    let env_config = ServerConfig::from_env().context("Invalid environment configuration")?;
    let config = CliConfigBuilder::from_cli(&cli, env_config).context("Invalid CLI arguments")?;

    info!(
        environment = %config.environment,
        debug = config.debug,
        max_file_size = config.upload.max_file_size,
        max_content_length = config.max_content_length,
        max_concurrent_segmentations = config.max_concurrent_segmentations,
        "Starting background removal API"
    );

    let backend = CliConfigBuilder::create_backend(&config.model);
    let state = AppState::new(config, backend).context("Failed to create processor")?;

    if cli.preload_model {
        preload_model(&state).await?;
    }

    server::serve(state).await.context("Server terminated with an error")?;
    Ok(())
}

/// Load the model up front so the first request does not pay for it
async fn preload_model(state: &AppState) -> Result<()> {
    let processor = std::sync::Arc::clone(&state.processor);
    let backend = processor.backend().name().to_string();

    let loaded = tokio::task::spawn_blocking(move || processor.warm_up())
        .await
        .context("Model loading task panicked")?
        .context("Failed to load segmentation model")?;

    if let Some(elapsed) = loaded {
        info!(
            backend = %backend,
            load_ms = elapsed.as_millis() as u64,
            "Segmentation model preloaded"
        );
    }
    Ok(())
}

fn init_tracing(cli: &Cli) -> Result<()> {
    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format.into())
        .init()
        .context("Failed to initialize tracing subscriber")?;

    debug!(verbosity = cli.verbose, format = ?cli.log_format, "Tracing initialized");
    Ok(())
}
