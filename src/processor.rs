//! Background removal pipeline
//!
//! `BackgroundRemovalProcessor` sequences the stages of one request:
//!
//! ```text
//! Received -> Validated -> Segmented -> (Composited) -> Encoded
//! ```
//!
//! Any stage can fail, which ends the request with no partial output. The
//! processor holds only read-only configuration and the shared segmentation
//! backend, so one instance serves every request concurrently.

use crate::config::{OutputFormat, ServerConfig, UploadConstraints};
use crate::error::{BgRemovalError, Result};
use crate::inference::SegmentationBackend;
use crate::tracing_config::spans;
use crate::services::{Compositor, OutputFormatHandler, DEFAULT_JPEG_QUALITY};
use crate::types::{BackgroundOutcome, ProcessedImage, ProcessingTimings, ValidatedImage};
use crate::utils::{ColorParser, Resizer, UploadValidator};
use image::{DynamicImage, GenericImageView, RgbaImage};
use instant::{Duration, Instant};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, span, warn, Level};

/// Steps of the removal pipeline, used to tag logs and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Validated,
    Segmented,
    Composited,
    Encoded,
}

impl PipelineStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Segmented => "segmented",
            Self::Composited => "composited",
            Self::Encoded => "encoded",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified configuration for the background removal processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Upload acceptance rules
    pub constraints: Arc<UploadConstraints>,
    /// Output format configuration
    pub output_format: OutputFormat,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Downscale validated images whose longer side exceeds this
    pub max_output_dimension: Option<u32>,
    /// `None` disables the timeout
    pub segmentation_timeout: Option<Duration>,
    /// Segmentations allowed to run at once
    pub max_concurrent_segmentations: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            constraints: Arc::new(server.upload),
            output_format: OutputFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_output_dimension: server.max_output_dimension,
            segmentation_timeout: server.segmentation_timeout,
            max_concurrent_segmentations: server.max_concurrent_segmentations,
        }
    }
}

impl ProcessorConfig {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }

    /// Processor settings derived from the service configuration
    #[must_use]
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            constraints: Arc::new(config.upload.clone()),
            output_format: OutputFormat::Png,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_output_dimension: config.max_output_dimension,
            segmentation_timeout: config.segmentation_timeout,
            max_concurrent_segmentations: config.max_concurrent_segmentations,
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.constraints.validate()?;
        OutputFormatHandler::validate_quality(self.jpeg_quality)?;
        if self.max_concurrent_segmentations == 0 {
            return Err(BgRemovalError::config_value_error(
                "max concurrent segmentations",
                self.max_concurrent_segmentations,
                ">= 1",
                Some(1),
            ));
        }
        if self.max_output_dimension == Some(0) {
            return Err(BgRemovalError::invalid_config(
                "Maximum output dimension must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Builder for `ProcessorConfig`
#[derive(Debug, Default)]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn constraints(mut self, constraints: UploadConstraints) -> Self {
        self.config.constraints = Arc::new(constraints);
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    #[must_use]
    pub fn max_output_dimension(mut self, max: Option<u32>) -> Self {
        self.config.max_output_dimension = max;
        self
    }

    #[must_use]
    pub fn segmentation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.segmentation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_concurrent_segmentations(mut self, permits: usize) -> Self {
        self.config.max_concurrent_segmentations = permits;
        self
    }

    pub fn build(self) -> Result<ProcessorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// One removal request as received from the client
#[derive(Debug, Clone)]
pub struct RemovalRequest {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Raw `background_color` form value
    pub background_color: Option<String>,
}

impl RemovalRequest {
    pub fn new<S: Into<String>>(bytes: Vec<u8>, filename: S) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            background_color: None,
        }
    }

    #[must_use]
    pub fn with_background_color<S: Into<String>>(mut self, color: S) -> Self {
        self.background_color = Some(color.into());
        self
    }
}

/// Background removal processor shared by all requests
pub struct BackgroundRemovalProcessor {
    backend: Arc<dyn SegmentationBackend>,
    config: ProcessorConfig,
    segmentation_permits: Arc<Semaphore>,
}

impl std::fmt::Debug for BackgroundRemovalProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRemovalProcessor")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

impl BackgroundRemovalProcessor {
    /// Create a processor around an injected backend
    pub fn new(backend: Arc<dyn SegmentationBackend>, config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        let permits = config.max_concurrent_segmentations;
        Ok(Self {
            backend,
            config,
            segmentation_permits: Arc::new(Semaphore::new(permits)),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn SegmentationBackend> {
        &self.backend
    }

    /// Load the model ahead of the first request
    pub fn warm_up(&self) -> Result<Option<Duration>> {
        let _span = spans::model_loading(self.backend.name()).entered();
        self.backend.initialize()
    }

    /// Run the full pipeline on the calling thread
    ///
    /// No concurrency limit or timeout applies; see [`Self::process_async`]
    /// for the server path.
    #[instrument(
        skip(self, request),
        fields(filename = %request.filename, size_bytes = request.bytes.len())
    )]
    pub fn process(&self, request: RemovalRequest) -> Result<ProcessedImage> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::new();

        let image = self.prepare(&request.bytes, &request.filename, &mut timings)?;
        drop(request.bytes);
        let foreground = self.segment(image, &mut timings)?;
        self.finish(
            foreground,
            request.background_color.as_deref(),
            timings,
            total_start,
        )
    }

    /// Run the pipeline off the async runtime
    ///
    /// CPU-bound stages run on the blocking pool. Segmentation additionally
    /// waits for a permit and is bounded by the configured timeout; a request
    /// that times out fails without output while its backend call finishes in
    /// the background, still holding the permit.
    pub async fn process_async(self: &Arc<Self>, request: RemovalRequest) -> Result<ProcessedImage> {
        let total_start = Instant::now();
        let RemovalRequest {
            bytes,
            filename,
            background_color,
        } = request;

        let this = Arc::clone(self);
        let (image, timings) = run_blocking(move || {
            let mut timings = ProcessingTimings::new();
            let image = this.prepare(&bytes, &filename, &mut timings)?;
            Ok((image, timings))
        })
        .await?;

        let permit = Arc::clone(&self.segmentation_permits)
            .acquire_owned()
            .await
            .map_err(|e| BgRemovalError::internal(format!("Segmentation queue closed: {e}")))?;

        let this = Arc::clone(self);
        let segmentation = run_blocking(move || {
            let _permit = permit;
            let mut timings = timings;
            let foreground = this.segment(image, &mut timings)?;
            Ok((foreground, timings))
        });
        let (foreground, timings) = match self.config.segmentation_timeout {
            Some(limit) => tokio::time::timeout(limit, segmentation).await.map_err(|_| {
                warn!(timeout_secs = limit.as_secs(), "Segmentation timed out");
                BgRemovalError::segmentation(format!(
                    "Segmentation timed out after {}s",
                    limit.as_secs()
                ))
            })??,
            None => segmentation.await?,
        };

        let this = Arc::clone(self);
        run_blocking(move || {
            this.finish(foreground, background_color.as_deref(), timings, total_start)
        })
        .await
    }

    /// Validate the upload and apply the optional downscale
    fn prepare(
        &self,
        bytes: &[u8],
        filename: &str,
        timings: &mut ProcessingTimings,
    ) -> Result<DynamicImage> {
        let validated: ValidatedImage = {
            let _span = span!(Level::DEBUG, "validation", size_bytes = bytes.len()).entered();
            let start = Instant::now();
            let result = UploadValidator::validate(bytes, filename, &self.config.constraints);
            timings.validation_ms = elapsed_ms(start);
            result.map_err(|e| {
                debug!(stage = %PipelineStage::Received, error_kind = %e.kind(), error = %e, "Upload rejected");
                BgRemovalError::from(e)
            })?
        };

        let (width, height) = validated.dimensions();
        info!(
            width,
            height,
            format = %crate::utils::validation::format_name(validated.format),
            pixel_format = ?validated.pixel_format(),
            "Image validated"
        );

        let image = validated.into_image();
        match self.config.max_output_dimension {
            Some(max) => {
                let start = Instant::now();
                let resized = Resizer::resize_to_fit(image, max);
                timings.resize_ms = elapsed_ms(start);
                Ok(resized)
            },
            None => Ok(image),
        }
    }

    /// Call the backend and check it kept the image geometry
    fn segment(&self, image: DynamicImage, timings: &mut ProcessingTimings) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        let _span = span!(
            Level::INFO,
            "segmentation",
            backend = %self.backend.name(),
            width,
            height
        )
        .entered();

        let start = Instant::now();
        let foreground = self.backend.segment(image).map_err(|e| {
            warn!(stage = %PipelineStage::Validated, error_kind = %e.kind(), error = %e, "Segmentation failed");
            e
        })?;
        timings.segmentation_ms = elapsed_ms(start);

        if foreground.dimensions() != (width, height) {
            return Err(BgRemovalError::segmentation_stage_error(
                "output",
                &format!(
                    "backend returned {}x{} image",
                    foreground.width(),
                    foreground.height()
                ),
                Some(&format!("{width}x{height}")),
            ));
        }

        debug!(segmentation_ms = timings.segmentation_ms, "Segmentation completed");
        Ok(foreground)
    }

    /// Apply the optional background and encode
    fn finish(
        &self,
        foreground: RgbaImage,
        background_color: Option<&str>,
        mut timings: ProcessingTimings,
        total_start: Instant,
    ) -> Result<ProcessedImage> {
        let (width, height) = foreground.dimensions();
        let foreground = DynamicImage::ImageRgba8(foreground);

        let background = match ColorParser::parse(background_color) {
            Ok(Some(color)) => BackgroundOutcome::Applied { color },
            Ok(None) => BackgroundOutcome::NotRequested,
            Err(e) => {
                warn!(
                    stage = %PipelineStage::Segmented,
                    error_kind = %e.kind(),
                    error = %e,
                    "Ignoring background color; returning transparent output"
                );
                BackgroundOutcome::Skipped {
                    kind: e.kind(),
                    reason: e.to_string(),
                }
            },
        };

        let composed = match &background {
            BackgroundOutcome::Applied { color } => {
                let _span = span!(Level::DEBUG, "compositing", color = %color).entered();
                let start = Instant::now();
                let composed = Compositor::apply_background(foreground, Some(*color));
                timings.compositing_ms = elapsed_ms(start);
                composed
            },
            _ => foreground,
        };

        let format = self.config.output_format;
        let bytes = {
            let _span = span!(Level::DEBUG, "encoding", format = %format).entered();
            let start = Instant::now();
            let bytes = OutputFormatHandler::encode(&composed, format, self.config.jpeg_quality)
                .map_err(|e| {
                    warn!(stage = %PipelineStage::Composited, error_kind = %e.kind(), error = %e, "Encoding failed");
                    e
                })?;
            timings.encoding_ms = elapsed_ms(start);
            bytes
        };

        timings.total_ms = elapsed_ms(total_start);
        let has_alpha =
            OutputFormatHandler::supports_transparency(format) && composed.color().has_alpha();

        info!(
            stage = %PipelineStage::Encoded,
            output_bytes = bytes.len(),
            background = ?background,
            timings = %timings.summary(),
            "Image processing completed"
        );

        Ok(ProcessedImage {
            bytes,
            format,
            width,
            height,
            has_alpha,
            background,
            timings,
        })
    }
}

/// Run `job` on the blocking pool inside the caller's span
async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(job))
        .await
        .map_err(|e| BgRemovalError::internal(format!("Processing task failed: {e}")))?
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
