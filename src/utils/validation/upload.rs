//! Upload validation
//!
//! Checks an uploaded file against [`UploadConstraints`] and decodes it
//! exactly once. Dimensions come from the image header, so an oversized
//! upload is rejected without allocating its pixel buffer. The checks run in
//! a fixed order and stop at the first failure, so every rejection carries a
//! single [`ValidationError`].

use crate::config::UploadConstraints;
use crate::error::ValidationError;
use crate::types::ValidatedImage;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Limits};
use std::io::Cursor;

/// Validator for uploaded image files
pub struct UploadValidator;

impl UploadValidator {
    /// Validate raw upload bytes and return the decoded image
    ///
    /// Order: empty, extension, byte size, header, minimum dimensions, maximum
    /// dimensions, decode, decoded format. The extension and the detected
    /// format are checked independently; they are not required to agree.
    pub fn validate(
        bytes: &[u8],
        filename: &str,
        constraints: &UploadConstraints,
    ) -> Result<ValidatedImage, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        let extension = Self::check_extension(filename, constraints)?;

        if bytes.len() > constraints.max_file_size {
            return Err(ValidationError::TooLarge {
                size: bytes.len(),
                max: constraints.max_file_size,
            });
        }

        let (format, (width, height)) = Self::read_header(bytes, constraints)?;

        if width < constraints.min_dimension || height < constraints.min_dimension {
            return Err(ValidationError::TooSmall {
                width,
                height,
                min: constraints.min_dimension,
            });
        }

        if width > constraints.max_width || height > constraints.max_height {
            return Err(ValidationError::TooLargeDimensions {
                width,
                height,
                max_width: constraints.max_width,
                max_height: constraints.max_height,
            });
        }

        let image = Self::decode(bytes, format, constraints)?;

        if !constraints.is_format_allowed(format) {
            return Err(ValidationError::UnsupportedFormat(format_name(format)));
        }

        if ImageFormat::from_extension(&extension) != Some(format) {
            tracing::debug!(
                extension = %extension,
                detected_format = %format_name(format),
                "Filename extension does not match detected image format"
            );
        }

        Ok(ValidatedImage {
            image,
            format,
            extension,
            size_bytes: bytes.len(),
        })
    }

    /// Extension check only, for callers that reject early
    pub fn check_extension(
        filename: &str,
        constraints: &UploadConstraints,
    ) -> Result<String, ValidationError> {
        match extension_of(filename) {
            Some(extension) if constraints.is_extension_allowed(&extension) => Ok(extension),
            extension => Err(ValidationError::UnsupportedExtension {
                extension,
                allowed: constraints.allowed_extensions_display(),
            }),
        }
    }

    /// Detect the container format and read the dimensions from the header
    fn read_header(
        bytes: &[u8],
        constraints: &UploadConstraints,
    ) -> Result<(ImageFormat, (u32, u32)), ValidationError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ValidationError::UndecodableImage(e.to_string()))?;

        let format = reader.format().ok_or_else(|| {
            ValidationError::UndecodableImage("unrecognized image format".to_string())
        })?;

        // Only the header is read here; allocation limits apply to the decode
        reader.no_limits();
        let dimensions = reader
            .into_dimensions()
            .map_err(|e| Self::decode_error(&e, format, constraints))?;

        Ok((format, dimensions))
    }

    fn decode(
        bytes: &[u8],
        format: ImageFormat,
        constraints: &UploadConstraints,
    ) -> Result<DynamicImage, ValidationError> {
        let mut limits = Limits::default();
        limits.max_image_width = Some(constraints.max_width);
        limits.max_image_height = Some(constraints.max_height);

        let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
        reader.limits(limits);
        reader
            .decode()
            .map_err(|e| Self::decode_error(&e, format, constraints))
    }

    /// A broken file in a format we would refuse anyway reports the format
    fn decode_error(
        err: &ImageError,
        format: ImageFormat,
        constraints: &UploadConstraints,
    ) -> ValidationError {
        if constraints.is_format_allowed(format) {
            ValidationError::UndecodableImage(err.to_string())
        } else {
            ValidationError::UnsupportedFormat(format_name(format))
        }
    }
}

/// Lowercased text after the last `.` of `filename`
///
/// `None` when there is no dot or nothing follows it.
#[must_use]
pub fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Uppercase display name for a container format (`PNG`, `GIF`, ...)
#[must_use]
pub fn format_name(format: ImageFormat) -> String {
    format!("{format:?}").to_ascii_uppercase()
}
