//! Background compositing service
//!
//! Blends a segmented foreground over a solid color. Arithmetic is integer
//! only so identical inputs always produce identical bytes.

use crate::utils::BackgroundColor;
use image::{DynamicImage, Rgb, RgbImage};

/// Service for alpha-blending foregrounds onto solid backgrounds
pub struct Compositor;

impl Compositor {
    /// Blend `foreground` over an opaque `color` canvas
    ///
    /// Per channel: `out = (fg * a + bg * (255 - a) + 127) / 255`, which is
    /// `fg * α + bg * (1 - α)` rounded half up. Images without alpha are
    /// treated as fully opaque. The result has no alpha channel; the color's
    /// own alpha is ignored.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_api::services::Compositor;
    /// use bgremove_api::utils::BackgroundColor;
    /// use image::{DynamicImage, Rgba, RgbaImage};
    ///
    /// let fg = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 128])));
    /// let out = Compositor::composite_onto_color(fg, BackgroundColor::new(0, 0, 255));
    /// assert_eq!(out.get_pixel(0, 0).0, [128, 0, 127]);
    /// ```
    #[must_use]
    pub fn composite_onto_color(foreground: DynamicImage, color: BackgroundColor) -> RgbImage {
        if !foreground.color().has_alpha() {
            return foreground.into_rgb8();
        }

        let rgba = foreground.into_rgba8();
        let (width, height) = rgba.dimensions();
        let background = color.rgb();

        let mut out = RgbImage::new(width, height);
        for (target, source) in out.pixels_mut().zip(rgba.pixels()) {
            let alpha = u32::from(source.0[3]);
            let inverse = 255 - alpha;
            let mut blended = [0u8; 3];
            for ((channel, &fg), &bg) in blended.iter_mut().zip(&source.0).zip(&background) {
                let value = (u32::from(fg) * alpha + u32::from(bg) * inverse + 127) / 255;
                *channel = value as u8;
            }
            *target = Rgb(blended);
        }
        out
    }

    /// Apply an optional background
    ///
    /// `None` passes the foreground through untouched, alpha included.
    #[must_use]
    pub fn apply_background(foreground: DynamicImage, color: Option<BackgroundColor>) -> DynamicImage {
        match color {
            Some(color) => DynamicImage::ImageRgb8(Self::composite_onto_color(foreground, color)),
            None => foreground,
        }
    }

    /// Flatten onto white, for formats without transparency
    #[must_use]
    pub fn flatten(image: DynamicImage) -> RgbImage {
        Self::composite_onto_color(image, BackgroundColor::white())
    }
}
