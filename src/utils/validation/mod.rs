//! Validation utilities
//!
//! Upload checks live here so the processor and the HTTP layer share one
//! implementation of the acceptance rules.

pub mod upload;

pub use upload::{extension_of, format_name, UploadValidator};
