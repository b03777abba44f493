//! Aspect-preserving downscaling

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Downscales images whose longer side exceeds a bound
pub struct Resizer;

impl Resizer {
    /// Target dimensions for fitting `(width, height)` into `max_dimension`
    ///
    /// Returns the input unchanged when it already fits. Otherwise the longer
    /// side becomes `max_dimension` and the shorter side is scaled and rounded,
    /// never below one pixel.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_api::utils::Resizer;
    ///
    /// assert_eq!(Resizer::fit_dimensions(4000, 2000, 2048), (2048, 1024));
    /// assert_eq!(Resizer::fit_dimensions(800, 600, 2048), (800, 600));
    /// assert_eq!(Resizer::fit_dimensions(10_000, 1, 100), (100, 1));
    /// ```
    #[must_use]
    pub fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
        let longer = width.max(height);
        if longer <= max_dimension || longer == 0 {
            return (width, height);
        }

        let scale_shorter = |shorter: u32| -> u32 {
            let scaled = (f64::from(shorter) * f64::from(max_dimension) / f64::from(longer)).round();
            (scaled as u32).max(1)
        };

        if width >= height {
            (max_dimension, scale_shorter(height))
        } else {
            (scale_shorter(width), max_dimension)
        }
    }

    /// Resize `image` so neither side exceeds `max_dimension`
    ///
    /// Images that already fit are returned as-is without resampling.
    #[must_use]
    pub fn resize_to_fit(image: DynamicImage, max_dimension: u32) -> DynamicImage {
        let (width, height) = image.dimensions();
        let (target_width, target_height) = Self::fit_dimensions(width, height, max_dimension);
        if (target_width, target_height) == (width, height) {
            return image;
        }

        tracing::debug!(
            from_width = width,
            from_height = height,
            to_width = target_width,
            to_height = target_height,
            "Resizing image"
        );
        image.resize_exact(target_width, target_height, FilterType::Lanczos3)
    }
}
