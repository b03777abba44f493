//! Utility modules for common operations

pub mod color;
pub mod preprocessing;
pub mod resize;
pub mod validation;

// Re-export commonly used items for convenience
pub use color::{BackgroundColor, ColorParser};
pub use preprocessing::{ImagePreprocessor, PreprocessingConfig};
pub use resize::Resizer;
pub use validation::UploadValidator;
