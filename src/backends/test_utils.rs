//! Test utilities and mock backends for testing segmentation functionality
//!
//! Mocks implement [`SegmentationBackend`] deterministically so processor
//! tests run without model files.

use crate::error::{BgRemovalError, Result};
use crate::inference::SegmentationBackend;
use image::{DynamicImage, Rgba, RgbaImage};
use instant::Duration;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// What a [`MockBackend`] returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Input pixels with alpha 255 everywhere
    Opaque,
    /// Alpha 0 in a border of the given width, 255 inside
    TransparentBorder(u32),
    /// Every pixel fully transparent
    Transparent,
    /// Inference error
    Fail,
    /// Output one pixel wider than the input
    WrongSize,
    /// Opaque output after sleeping
    Slow(Duration),
}

/// Mock segmentation backend for testing
#[derive(Debug)]
pub struct MockBackend {
    behavior: MockBehavior,
    initialized: AtomicBool,
    calls: AtomicUsize,
}

impl MockBackend {
    #[must_use]
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            initialized: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `segment` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentationBackend for MockBackend {
    fn initialize(&self) -> Result<Option<Duration>> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            Ok(None)
        } else {
            Ok(Some(Duration::from_millis(1)))
        }
    }

    fn segment(&self, image: DynamicImage) -> Result<RgbaImage> {
        self.initialize()?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        match self.behavior {
            MockBehavior::Opaque => {
                for pixel in rgba.pixels_mut() {
                    pixel.0[3] = 255;
                }
            },
            MockBehavior::Slow(delay) => {
                std::thread::sleep(delay);
                for pixel in rgba.pixels_mut() {
                    pixel.0[3] = 255;
                }
            },
            MockBehavior::TransparentBorder(border) => {
                for (x, y, pixel) in rgba.enumerate_pixels_mut() {
                    let inside = x >= border
                        && y >= border
                        && x + border < width
                        && y + border < height;
                    *pixel = if inside {
                        Rgba([pixel[0], pixel[1], pixel[2], 255])
                    } else {
                        Rgba([0, 0, 0, 0])
                    };
                }
            },
            MockBehavior::Transparent => {
                for pixel in rgba.pixels_mut() {
                    *pixel = Rgba([0, 0, 0, 0]);
                }
            },
            MockBehavior::Fail => {
                return Err(BgRemovalError::segmentation("mock inference failure"));
            },
            MockBehavior::WrongSize => {
                return Ok(RgbaImage::new(width + 1, height));
            },
        }
        Ok(rgba)
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}
