//! Segmentation backend abstraction

use crate::error::{BgRemovalError, Result};
use image::{DynamicImage, RgbaImage};

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for segmentation backends
///
/// A backend turns an image into a same-sized RGBA image whose alpha channel
/// is the per-pixel foreground confidence. One instance is shared by every
/// request, so implementations must be callable concurrently through `&self`.
pub trait SegmentationBackend: Send + Sync {
    /// Load whatever the backend needs (model weights, plans)
    ///
    /// Returns the load time on the call that actually loaded, `None` when
    /// already initialized.
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - Model graph cannot be optimized for the configured input size
    fn initialize(&self) -> Result<Option<Duration>>;

    /// Segment `image`, initializing lazily when needed
    ///
    /// # Errors
    /// - Backend cannot be initialized
    /// - Inference failures or unexpected output tensors
    fn segment(&self, image: DynamicImage) -> Result<RgbaImage>;

    /// Short backend name for logs and `/api-info`
    fn name(&self) -> &str;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}

/// Backend used when no segmentation model is available
///
/// Every segmentation fails, which surfaces as a 500 on the removal endpoint
/// while health and info endpoints keep working.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SegmentationBackend for UnavailableBackend {
    fn initialize(&self) -> Result<Option<Duration>> {
        Err(BgRemovalError::model(self.reason.clone()))
    }

    fn segment(&self, _image: DynamicImage) -> Result<RgbaImage> {
        Err(BgRemovalError::model(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_initialized(&self) -> bool {
        false
    }
}
