//! Configuration types for the background removal service
//!
//! Everything here is built once at startup and shared read-only afterwards.
//! [`ServerConfig::from_env`] reads the process environment; tests go through
//! [`ServerConfig::from_lookup`] with an in-memory map.

use crate::error::{BgRemovalError, Result};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const MIB: usize = 1024 * 1024;

/// Default validation cap on the upload itself
pub const DEFAULT_MAX_FILE_SIZE: usize = 8 * MIB;

/// Default transport cap on the whole request body
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * MIB;

pub const DEFAULT_MIN_IMAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_IMAGE_WIDTH: u32 = 4000;
pub const DEFAULT_MAX_IMAGE_HEIGHT: u32 = 4000;
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL_INPUT_SIZE: u32 = 320;
pub const DEFAULT_SEGMENTATION_TIMEOUT_SECS: u64 = 120;

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// JPEG (no transparency, flattened onto white)
    Jpeg,
}

impl OutputFormat {
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Limits every upload is checked against before processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConstraints {
    /// Maximum upload size in bytes (inclusive)
    pub max_file_size: usize,
    /// Minimum width and height in pixels (inclusive)
    pub min_dimension: u32,
    /// Maximum width in pixels (inclusive)
    pub max_width: u32,
    /// Maximum height in pixels (inclusive)
    pub max_height: u32,
    /// Lowercase filename extensions without the dot
    pub allowed_extensions: Vec<String>,
    /// Container formats accepted after decoding
    pub allowed_formats: Vec<ImageFormat>,
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            min_dimension: DEFAULT_MIN_IMAGE_SIZE,
            max_width: DEFAULT_MAX_IMAGE_WIDTH,
            max_height: DEFAULT_MAX_IMAGE_HEIGHT,
            allowed_extensions: ["png", "jpg", "jpeg", "webp", "bmp", "tiff"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            allowed_formats: vec![
                ImageFormat::Png,
                ImageFormat::Jpeg,
                ImageFormat::WebP,
                ImageFormat::Bmp,
                ImageFormat::Tiff,
            ],
        }
    }
}

impl UploadConstraints {
    /// Create a new builder starting from the defaults
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_api::UploadConstraints;
    ///
    /// let constraints = UploadConstraints::builder()
    ///     .max_file_size(1024 * 1024)
    ///     .min_dimension(32)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(constraints.min_dimension, 32);
    /// ```
    #[must_use]
    pub fn builder() -> UploadConstraintsBuilder {
        UploadConstraintsBuilder::default()
    }

    /// Whether `extension` (any case) is accepted
    #[must_use]
    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    #[must_use]
    pub fn is_format_allowed(&self, format: ImageFormat) -> bool {
        self.allowed_formats.contains(&format)
    }

    /// Allowed extensions joined for user-facing messages
    #[must_use]
    pub fn allowed_extensions_display(&self) -> String {
        self.allowed_extensions.join(", ")
    }

    /// Reject limits that could never accept an image
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(BgRemovalError::config_value_error(
                "max file size",
                self.max_file_size,
                "> 0 bytes",
                Some(DEFAULT_MAX_FILE_SIZE),
            ));
        }
        if self.min_dimension == 0 {
            return Err(BgRemovalError::config_value_error(
                "min image size",
                self.min_dimension,
                "> 0 px",
                Some(DEFAULT_MIN_IMAGE_SIZE),
            ));
        }
        if self.min_dimension > self.max_width || self.min_dimension > self.max_height {
            return Err(BgRemovalError::invalid_config(format!(
                "Minimum image size {}px exceeds maximum dimensions {}x{}px",
                self.min_dimension, self.max_width, self.max_height
            )));
        }
        if self.allowed_extensions.is_empty() {
            return Err(BgRemovalError::invalid_config(
                "At least one file extension must be allowed",
            ));
        }
        if self.allowed_formats.is_empty() {
            return Err(BgRemovalError::invalid_config(
                "At least one image format must be allowed",
            ));
        }
        Ok(())
    }
}

/// Builder for `UploadConstraints`
#[derive(Debug, Default)]
pub struct UploadConstraintsBuilder {
    constraints: UploadConstraints,
}

impl UploadConstraintsBuilder {
    #[must_use]
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.constraints.max_file_size = bytes;
        self
    }

    #[must_use]
    pub fn min_dimension(mut self, pixels: u32) -> Self {
        self.constraints.min_dimension = pixels;
        self
    }

    #[must_use]
    pub fn max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.constraints.max_width = width;
        self.constraints.max_height = height;
        self
    }

    /// Replace the allowed extension set (stored lowercase)
    #[must_use]
    pub fn allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.constraints.allowed_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn allowed_formats(mut self, formats: Vec<ImageFormat>) -> Self {
        self.constraints.allowed_formats = formats;
        self
    }

    pub fn build(self) -> Result<UploadConstraints> {
        self.constraints.validate()?;
        Ok(self.constraints)
    }
}

/// Deployment profile selected by `APP_ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Debug mode when `DEBUG` is not set
    #[must_use]
    pub fn default_debug(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "default" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(BgRemovalError::invalid_config(format!(
                "Unknown APP_ENV {other:?} (expected development or production)"
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Origins allowed by the CORS layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorsOrigins {
    #[default]
    Any,
    List(Vec<String>),
}

impl FromStr for CorsOrigins {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::Any);
        }
        let origins: Vec<String> = trimmed
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(ToString::to_string)
            .collect();
        if origins.iter().any(|origin| origin == "*") {
            return Ok(Self::Any);
        }
        Ok(Self::List(origins))
    }
}

/// Segmentation model settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// ONNX file; `None` leaves the service without a usable backend
    pub path: Option<PathBuf>,
    /// Square input edge the model expects
    pub input_size: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: None,
            input_size: DEFAULT_MODEL_INPUT_SIZE,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Transport-level cap on the request body
    pub max_content_length: usize,
    pub upload: UploadConstraints,
    pub cors_origins: CorsOrigins,
    pub environment: Environment,
    /// Include error details in 500 responses
    pub debug: bool,
    pub model: ModelConfig,
    /// `None` disables the timeout
    pub segmentation_timeout: Option<Duration>,
    pub max_concurrent_segmentations: usize,
    /// Downscale validated images whose longer side exceeds this
    pub max_output_dimension: Option<u32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let environment = Environment::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            upload: UploadConstraints::default(),
            cors_origins: CorsOrigins::default(),
            environment,
            debug: environment.default_debug(),
            model: ModelConfig::default(),
            segmentation_timeout: Some(Duration::from_secs(DEFAULT_SEGMENTATION_TIMEOUT_SECS)),
            max_concurrent_segmentations: default_concurrency(),
            max_output_dimension: None,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Unset variables take their defaults; set but unparsable ones are errors.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_api::ServerConfig;
    /// use std::collections::HashMap;
    ///
    /// let vars: HashMap<&str, &str> = [("PORT", "9000"), ("APP_ENV", "production")].into();
    /// let config = ServerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.port, 9000);
    /// assert!(!config.debug);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = match lookup("APP_ENV") {
            Some(value) => value.parse()?,
            None => Environment::default(),
        };
        let debug = match lookup("DEBUG") {
            Some(value) => parse_flag(&value),
            None => environment.default_debug(),
        };

        let upload = UploadConstraints {
            max_file_size: parse_var(&lookup, "MAX_FILE_SIZE", defaults.upload.max_file_size)?,
            min_dimension: parse_var(&lookup, "MIN_IMAGE_SIZE", defaults.upload.min_dimension)?,
            max_width: parse_var(&lookup, "MAX_IMAGE_WIDTH", defaults.upload.max_width)?,
            max_height: parse_var(&lookup, "MAX_IMAGE_HEIGHT", defaults.upload.max_height)?,
            ..defaults.upload
        };

        let timeout_secs: u64 = parse_var(
            &lookup,
            "SEGMENTATION_TIMEOUT_SECS",
            DEFAULT_SEGMENTATION_TIMEOUT_SECS,
        )?;

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            max_content_length: parse_var(
                &lookup,
                "MAX_CONTENT_LENGTH",
                defaults.max_content_length,
            )?,
            upload,
            cors_origins: match lookup("CORS_ORIGINS") {
                Some(value) => value.parse()?,
                None => CorsOrigins::Any,
            },
            environment,
            debug,
            model: ModelConfig {
                path: lookup("MODEL_PATH").map(PathBuf::from),
                input_size: parse_var(&lookup, "MODEL_INPUT_SIZE", DEFAULT_MODEL_INPUT_SIZE)?,
            },
            segmentation_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_concurrent_segmentations: parse_var(
                &lookup,
                "MAX_CONCURRENT_SEGMENTATIONS",
                defaults.max_concurrent_segmentations,
            )?,
            max_output_dimension: lookup("MAX_OUTPUT_DIMENSION")
                .map(|value| parse_value::<u32>("MAX_OUTPUT_DIMENSION", &value))
                .transpose()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        self.upload.validate()?;

        if self.max_content_length == 0 {
            return Err(BgRemovalError::config_value_error(
                "MAX_CONTENT_LENGTH",
                self.max_content_length,
                "> 0 bytes",
                Some(DEFAULT_MAX_CONTENT_LENGTH),
            ));
        }
        if self.max_concurrent_segmentations == 0 {
            return Err(BgRemovalError::config_value_error(
                "MAX_CONCURRENT_SEGMENTATIONS",
                self.max_concurrent_segmentations,
                ">= 1",
                Some(default_concurrency()),
            ));
        }
        if self.model.input_size == 0 {
            return Err(BgRemovalError::config_value_error(
                "MODEL_INPUT_SIZE",
                self.model.input_size,
                "> 0",
                Some(DEFAULT_MODEL_INPUT_SIZE),
            ));
        }
        if self.max_output_dimension == Some(0) {
            return Err(BgRemovalError::invalid_config(
                "MAX_OUTPUT_DIMENSION must be greater than 0 when set",
            ));
        }
        Ok(())
    }

    /// Address the listener binds to
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("{host}:{}", self.port).parse().map_err(|e| {
            BgRemovalError::invalid_config(format!(
                "Invalid listen address {}:{}: {e}",
                self.host, self.port
            ))
        })
    }
}

/// Accept `true`/`1` in any case, everything else is false
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        BgRemovalError::invalid_config(format!("{key} has invalid value {value:?}: {e}"))
    })
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |value| parse_value(key, &value))
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}
