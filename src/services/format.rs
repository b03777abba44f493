//! Output format handling service
//!
//! Encodes processed rasters into response bytes. Encoding never mutates the
//! input, and identical inputs with identical settings give identical bytes.

use crate::config::OutputFormat;
use crate::error::{BgRemovalError, Result};
use crate::services::Compositor;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;

/// Default JPEG quality
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode `image` in `format`
    ///
    /// PNG is lossless and keeps any alpha channel. JPEG cannot carry alpha,
    /// so transparent input is flattened onto white first; `quality` is only
    /// used for JPEG.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_api::services::OutputFormatHandler;
    /// use bgremove_api::OutputFormat;
    /// use image::{DynamicImage, RgbaImage};
    ///
    /// let image = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
    /// let bytes = OutputFormatHandler::encode(&image, OutputFormat::Png, 95).unwrap();
    /// assert_eq!(&bytes[1..4], b"PNG");
    /// ```
    pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        match format {
            OutputFormat::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut buffer,
                    CompressionType::Default,
                    FilterType::Adaptive,
                );
                // PNG has no float sample type
                let result = match image {
                    DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb8(image.to_rgb8())
                        .write_with_encoder(encoder),
                    DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba8(image.to_rgba8())
                        .write_with_encoder(encoder),
                    _ => image.write_with_encoder(encoder),
                };
                result.map_err(|e| BgRemovalError::encoding(format!("PNG encoding failed: {e}")))?;
            },
            OutputFormat::Jpeg => {
                let quality = Self::validate_quality(quality)?;
                let rgb = Compositor::flatten(image.clone());
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
                DynamicImage::ImageRgb8(rgb)
                    .write_with_encoder(encoder)
                    .map_err(|e| {
                        BgRemovalError::encoding(format!("JPEG encoding failed: {e}"))
                    })?;
            },
        }
        Ok(buffer)
    }

    /// Get the appropriate file extension for a given output format
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_api::services::OutputFormatHandler;
    /// use bgremove_api::OutputFormat;
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// JPEG quality must be 1-100
    pub fn validate_quality(quality: u8) -> Result<u8> {
        if quality == 0 || quality > 100 {
            return Err(BgRemovalError::config_value_error(
                "JPEG quality",
                quality,
                "1-100",
                Some(DEFAULT_JPEG_QUALITY),
            ));
        }
        Ok(quality)
    }
}
