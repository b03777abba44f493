//! Core types flowing through the removal pipeline

use crate::error::ErrorKind;
use crate::config::OutputFormat;
use crate::utils::BackgroundColor;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat};
use serde::Serialize;

/// Channel layout of a raster image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelFormat {
    Rgb,
    Rgba,
    Grayscale,
    GrayscaleAlpha,
    /// Indexed color. Reserved: the bundled decoders expand palettes while
    /// decoding, so `from_color_type` never returns this variant.
    Palette,
}

impl PixelFormat {
    #[must_use]
    pub fn from_color_type(color: ColorType) -> Self {
        match color {
            ColorType::L8 | ColorType::L16 => Self::Grayscale,
            ColorType::La8 | ColorType::La16 => Self::GrayscaleAlpha,
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => Self::Rgb,
            _ => Self::Rgba,
        }
    }

    #[must_use]
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba | Self::GrayscaleAlpha)
    }
}

/// An upload that passed every validation check
///
/// Carries the decoded raster so nothing downstream decodes twice.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub image: DynamicImage,
    /// Container format detected from the bytes, not the filename
    pub format: ImageFormat,
    /// Lowercased filename extension
    pub extension: String,
    pub size_bytes: usize,
}

impl ValidatedImage {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::from_color_type(self.image.color())
    }

    #[must_use]
    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// What happened to the requested background color
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackgroundOutcome {
    /// No color was supplied; output keeps its alpha channel
    NotRequested,
    Applied { color: BackgroundColor },
    /// Color was supplied but could not be used; output stays transparent
    Skipped { kind: ErrorKind, reason: String },
}

impl BackgroundOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Detailed timing breakdown for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingTimings {
    /// Validation including the single decode
    pub validation_ms: u64,

    /// Optional downscale before segmentation
    pub resize_ms: u64,

    /// Segmentation backend call (includes lazy model load on first use)
    pub segmentation_ms: u64,

    /// Background compositing, zero when no color is applied
    pub compositing_ms: u64,

    pub encoding_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of total time spent in segmentation
    #[must_use]
    pub fn segmentation_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.segmentation_ms as f64 / self.total_ms as f64
        }
    }

    /// One-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Validate: {}ms | Resize: {}ms | Segment: {}ms | Composite: {}ms | Encode: {}ms",
            self.total_ms,
            self.validation_ms,
            self.resize_ms,
            self.segmentation_ms,
            self.compositing_ms,
            self.encoding_ms
        )
    }
}

/// Final output of a successful request
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Whether the encoded image carries an alpha channel
    pub has_alpha: bool,
    pub background: BackgroundOutcome,
    pub timings: ProcessingTimings,
}

impl ProcessedImage {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
