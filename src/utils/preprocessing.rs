//! Model input preparation and mask postprocessing
//!
//! Salient-object models of the U²-Net family take a fixed square RGB input
//! normalized with ImageNet statistics and return a single-channel saliency
//! map at the same square size.

use crate::error::{BgRemovalError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgba, RgbaImage};
use ndarray::{Array2, Array4};

/// Normalization parameters for the segmentation model input
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Square input edge in pixels
    pub input_size: u32,
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            input_size: 320,
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

impl PreprocessingConfig {
    #[must_use]
    pub fn with_input_size(input_size: u32) -> Self {
        Self {
            input_size,
            ..Self::default()
        }
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Convert an image into a normalized NCHW tensor
    ///
    /// The image is stretched to `input_size²` with Lanczos3, scaled by its
    /// brightest sample, then normalized per channel.
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        let size = config.input_size;
        if size == 0 {
            return Err(BgRemovalError::invalid_config("Model input size must be > 0"));
        }

        let rgb = image.to_rgb8();
        let resized = image::imageops::resize(&rgb, size, size, FilterType::Lanczos3);

        let max_sample = resized.as_raw().iter().copied().max().unwrap_or(0);
        let scale = f32::from(max_sample).max(1e-6);

        let side = usize::try_from(size)
            .map_err(|_| BgRemovalError::internal("Model input size exceeds usize"))?;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor allocated at exactly the resized canvas size
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for channel in 0..3 {
                tensor[[0, channel, y, x]] = (f32::from(pixel[channel]) / scale
                    - config.normalization_mean[channel])
                    / config.normalization_std[channel];
            }
        }

        Ok(tensor)
    }

    /// Turn a raw saliency map into an 8-bit alpha mask of the given size
    ///
    /// Values are min-max normalized first. A flat map carries no saliency
    /// information and becomes an empty (fully transparent) mask.
    pub fn saliency_to_mask(saliency: &Array2<f32>, width: u32, height: u32) -> Result<GrayImage> {
        let (rows, cols) = saliency.dim();
        if rows == 0 || cols == 0 {
            return Err(BgRemovalError::segmentation("Model returned an empty saliency map"));
        }

        let (min, max) = saliency
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if !min.is_finite() || !max.is_finite() {
            return Err(BgRemovalError::segmentation(
                "Model returned non-finite saliency values",
            ));
        }
        let range = max - min;

        let mask_width = u32::try_from(cols)
            .map_err(|_| BgRemovalError::segmentation("Saliency map too wide"))?;
        let mask_height = u32::try_from(rows)
            .map_err(|_| BgRemovalError::segmentation("Saliency map too tall"))?;

        #[allow(clippy::indexing_slicing)]
        // Safe: coordinates stay within the saliency dimensions checked above
        let mask = GrayImage::from_fn(mask_width, mask_height, |x, y| {
            let value = if range > f32::EPSILON {
                (saliency[[y as usize, x as usize]] - min) / range
            } else {
                0.0
            };
            Luma([(value * 255.0).round().clamp(0.0, 255.0) as u8])
        });

        if (mask_width, mask_height) == (width, height) {
            return Ok(mask);
        }
        Ok(image::imageops::resize(&mask, width, height, FilterType::Lanczos3))
    }

    /// Attach `mask` as the alpha channel of `image`
    ///
    /// RGB is preserved; pixels with zero alpha are written as transparent
    /// black so no hidden color leaks through.
    pub fn apply_mask(image: &DynamicImage, mask: &GrayImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        if mask.dimensions() != (width, height) {
            return Err(BgRemovalError::segmentation_stage_error(
                "postprocessing",
                &format!(
                    "mask is {}x{} but image is {width}x{height}",
                    mask.width(),
                    mask.height()
                ),
                None,
            ));
        }

        let rgb = image.to_rgb8();
        let mut out = RgbaImage::new(width, height);
        for ((target, source), alpha) in out
            .pixels_mut()
            .zip(rgb.pixels())
            .zip(mask.pixels())
        {
            let a = alpha[0];
            *target = if a == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([source[0], source[1], source[2], a])
            };
        }
        Ok(out)
    }
}
