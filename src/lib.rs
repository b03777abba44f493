#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Background Removal API
//!
//! An HTTP service that accepts an uploaded image, removes its background
//! with a salient-object segmentation model and returns a PNG, optionally
//! composited over a solid color.
//!
//! The crate is layered so the pipeline can be used without the server:
//!
//! - [`UploadValidator`] checks extension, size, decodability and dimensions
//! - [`SegmentationBackend`] is the model seam; [`TractBackend`] runs ONNX
//!   models in pure Rust
//! - [`Compositor`] and [`OutputFormatHandler`] blend and encode
//! - [`BackgroundRemovalProcessor`] sequences the stages with a concurrency
//!   limit and timeout
//! - [`server`] exposes `/health`, `/api-info` and `/remove-background`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_api::server::{self, AppState};
//! use bgremove_api::{ServerConfig, TractBackend};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env()?;
//! let backend = Arc::new(TractBackend::new(&config.model));
//! let state = AppState::new(config, backend)?;
//! server::serve(state).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the pipeline directly
//!
//! ```rust,no_run
//! use bgremove_api::{
//!     BackgroundRemovalProcessor, ProcessorConfig, RemovalRequest, TractBackend,
//! };
//! use bgremove_api::config::ModelConfig;
//! use std::sync::Arc;
//!
//! # fn example(upload: Vec<u8>) -> anyhow::Result<()> {
//! let backend = Arc::new(TractBackend::new(&ModelConfig {
//!     path: Some("u2net.onnx".into()),
//!     input_size: 320,
//! }));
//! let processor = BackgroundRemovalProcessor::new(backend, ProcessorConfig::default())?;
//! let request = RemovalRequest::new(upload, "photo.jpg").with_background_color("#FFFFFF");
//! let processed = processor.process(request)?;
//! std::fs::write("photo.png", &processed.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): pure-Rust ONNX segmentation backend
//! - `cli` (default): server binary with argument parsing and log output
//! - `tracing-json`: JSON log output for the binary

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod processor;
pub mod server;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::*;
pub use config::{OutputFormat, ServerConfig, UploadConstraints};
pub use error::{BgRemovalError, ErrorKind, Result, ValidationError};
pub use inference::{SegmentationBackend, UnavailableBackend};
pub use processor::{
    BackgroundRemovalProcessor, PipelineStage, ProcessorConfig, ProcessorConfigBuilder,
    RemovalRequest,
};
pub use services::{Compositor, OutputFormatHandler};
pub use tracing_config::{events, spans, TracingConfig, TracingFormat};
pub use types::{BackgroundOutcome, PixelFormat, ProcessedImage, ProcessingTimings, ValidatedImage};
pub use utils::{BackgroundColor, ColorParser, Resizer, UploadValidator};
