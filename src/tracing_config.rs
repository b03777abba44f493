//! Tracing configuration module for structured logging and observability
//!
//! The binary installs a subscriber once at startup; the library only emits
//! spans and events.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output with colors
    Console,
    /// Compact output without ANSI codes for containers and CI
    Compact,
    /// JSON structured logging for log aggregation
    #[cfg(feature = "tracing-json")]
    Json,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    /// Output format
    pub format: TracingFormat,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Create a new tracing configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-3+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set output format
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    ///
    /// HTTP plumbing crates stay at `warn` until `-vv` so request logs are
    /// not drowned out.
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info,hyper=warn,tower_http=info",
            1 => "debug,hyper=warn,tower_http=debug",
            _ => "trace",
        }
    }

    /// Initialize tracing subscriber based on configuration
    ///
    /// `RUST_LOG` wins over both the explicit filter and the verbosity level.
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => match &self.env_filter {
                Some(env_filter) => EnvFilter::try_new(env_filter)?,
                None => EnvFilter::try_new(self.verbosity_to_filter())?,
            },
        };

        let registry = Registry::default().with(filter);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_level(true)
                    .compact();

                registry.with(fmt_layer).try_init()?;
            },

            TracingFormat::Compact => {
                let fmt_layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .compact();

                registry.with(fmt_layer).try_init()?;
            },

            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);

                registry.with(fmt_layer).try_init()?;
            },
        }

        Ok(())
    }
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span covering one HTTP request
    pub fn request(request_id: &str, method: &str, path: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "request",
            request_id = %request_id,
            method = %method,
            path = %path
        )
    }

    /// Span for one background removal, nested under the request span
    pub fn removal(filename: &str, size_bytes: usize) -> Span {
        tracing::span!(
            Level::INFO,
            "removal",
            filename = %filename,
            size_bytes = size_bytes
        )
    }

    /// Create a span for model loading operations
    pub fn model_loading(backend: &str) -> Span {
        tracing::span!(Level::INFO, "model_loading", backend = %backend)
    }
}

/// Event helpers for common logging patterns
pub mod events {
    use crate::error::ErrorKind;
    use tracing::{error, info, warn};

    /// Log a request the client got wrong
    pub fn request_rejected(kind: ErrorKind, message: &str) {
        warn!(error_kind = %kind, message = %message, "⚠️  Request rejected");
    }

    /// Log a failure on our side
    pub fn request_failed(kind: ErrorKind, error: &dyn std::error::Error) {
        error!(error_kind = %kind, error = %error, "❌ Request failed");
    }

    /// Log a successful removal
    pub fn request_completed(status: u16, output_bytes: usize, duration_ms: u64) {
        info!(
            status,
            output_bytes,
            duration_ms,
            "✅ Background removed"
        );
    }

    /// Log the listening address once the socket is bound
    pub fn server_started(addr: &std::net::SocketAddr, backend: &str, environment: &str) {
        info!(
            addr = %addr,
            backend = %backend,
            environment = %environment,
            "🚀 Background removal API listening"
        );
    }
}
