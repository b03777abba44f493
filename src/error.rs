//! Error types for background removal operations
//!
//! Two layers: [`ValidationError`] covers everything that can be wrong with an
//! upload before processing starts, [`BgRemovalError`] covers the whole
//! request. Both map onto the flat [`ErrorKind`] taxonomy used in responses
//! and logs.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Flat classification of every failure a request can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    EmptyFile,
    UnsupportedExtension,
    TooLarge,
    UndecodableImage,
    TooSmall,
    TooLargeDimensions,
    UnsupportedFormat,
    InvalidColorFormat,
    /// Request body could not be read as multipart form data
    MalformedRequest,
    SegmentationFailure,
    EncodingFailure,
    Internal,
}

impl ErrorKind {
    /// Stable name used as the `code` field of error responses
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyFile => "EmptyFile",
            Self::UnsupportedExtension => "UnsupportedExtension",
            Self::TooLarge => "TooLarge",
            Self::UndecodableImage => "UndecodableImage",
            Self::TooSmall => "TooSmall",
            Self::TooLargeDimensions => "TooLargeDimensions",
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::InvalidColorFormat => "InvalidColorFormat",
            Self::MalformedRequest => "MalformedRequest",
            Self::SegmentationFailure => "SegmentationFailure",
            Self::EncodingFailure => "EncodingFailure",
            Self::Internal => "Internal",
        }
    }

    /// Whether the failure is the client's fault (4xx) rather than ours (5xx)
    #[must_use]
    pub fn is_client_error(self) -> bool {
        !matches!(
            self,
            Self::SegmentationFailure | Self::EncodingFailure | Self::Internal
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an upload is rejected before processing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty file provided")]
    EmptyFile,

    #[error("File type not allowed. Supported formats: {allowed}")]
    UnsupportedExtension {
        /// Lowercased extension, `None` when the filename has none
        extension: Option<String>,
        allowed: String,
    },

    #[error("File too large. Maximum size: {}MB", .max / (1024 * 1024))]
    TooLarge { size: usize, max: usize },

    #[error("Invalid image file: {0}")]
    UndecodableImage(String),

    #[error("Image too small. Minimum dimensions: {min}x{min}px (got {width}x{height}px)")]
    TooSmall { width: u32, height: u32, min: u32 },

    #[error(
        "Image too large. Maximum dimensions: {max_width}x{max_height}px (got {width}x{height}px)"
    )]
    TooLargeDimensions {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

impl ValidationError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyFile => ErrorKind::EmptyFile,
            Self::UnsupportedExtension { .. } => ErrorKind::UnsupportedExtension,
            Self::TooLarge { .. } => ErrorKind::TooLarge,
            Self::UndecodableImage(_) => ErrorKind::UndecodableImage,
            Self::TooSmall { .. } => ErrorKind::TooSmall,
            Self::TooLargeDimensions { .. } => ErrorKind::TooLargeDimensions,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
        }
    }
}

/// Comprehensive error types for background removal requests
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// Upload rejected by the validator
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Background color string is not `#RRGGBB`
    #[error("Invalid color format: {0}")]
    InvalidColor(String),

    /// The multipart body has no `image` field
    #[error("No image provided")]
    MissingImage,

    /// The `image` field has an empty filename
    #[error("No image selected")]
    EmptyFilename,

    /// Multipart body could not be parsed
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Body exceeded the transport-level size cap
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Segmentation backend errors
    #[error("Segmentation error: {0}")]
    Segmentation(String),

    /// Model loading or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Output encoding errors
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (socket bind, model file access)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgRemovalError {
    /// Create a new invalid color error
    pub fn invalid_color<S: Into<String>>(msg: S) -> Self {
        Self::InvalidColor(msg.into())
    }

    /// Create a new segmentation error
    pub fn segmentation<S: Into<String>>(msg: S) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new encoding error
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create segmentation error with stage context
    pub fn segmentation_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Segmentation(format!(
            "Segmentation failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Classify the error for responses and logs
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(e) => e.kind(),
            Self::InvalidColor(_) => ErrorKind::InvalidColorFormat,
            Self::MissingImage | Self::EmptyFilename => ErrorKind::EmptyFile,
            Self::MalformedRequest(_) => ErrorKind::MalformedRequest,
            Self::PayloadTooLarge(_) => ErrorKind::TooLarge,
            Self::Segmentation(_) | Self::Model(_) => ErrorKind::SegmentationFailure,
            Self::Encoding(_) => ErrorKind::EncodingFailure,
            Self::InvalidConfig(_) | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
