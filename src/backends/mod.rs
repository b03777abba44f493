//! Segmentation backend implementations
//!
//! - Tract backend (pure Rust ONNX inference, feature `tract`)

#[cfg(feature = "tract")]
pub mod tract;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;
