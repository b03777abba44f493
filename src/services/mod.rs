//! Service layer
//!
//! Stateless image operations used by the processor: compositing onto a
//! background color and encoding the result.

pub mod compositor;
pub mod format;

pub use compositor::Compositor;
pub use format::{OutputFormatHandler, DEFAULT_JPEG_QUALITY};
