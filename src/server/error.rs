//! Mapping from pipeline errors to HTTP responses

use crate::error::{BgRemovalError, ErrorKind, ValidationError};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const GENERIC_FAILURE_MESSAGE: &str =
    "Failed to process image. Please try again with a different image.";

/// Error response body and status
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub error: String,
    pub message: String,
    /// Internal detail, only populated in debug mode
    pub debug: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    code: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<&'a str>,
}

impl ApiError {
    /// Classify `err`; `debug` controls whether 5xx detail is exposed
    pub fn from_error(err: &BgRemovalError, debug: bool) -> Self {
        let kind = err.kind();
        let (status, error, message) = match err {
            BgRemovalError::MissingImage => (
                StatusCode::BAD_REQUEST,
                "No image provided",
                "Please upload an image file".to_string(),
            ),
            BgRemovalError::EmptyFilename => (
                StatusCode::BAD_REQUEST,
                "No image selected",
                "Please select an image file".to_string(),
            ),
            BgRemovalError::Validation(ValidationError::UnsupportedExtension { allowed, .. }) => (
                StatusCode::BAD_REQUEST,
                "Invalid file type",
                format!("Supported formats: {allowed}"),
            ),
            BgRemovalError::Validation(e) => {
                (StatusCode::BAD_REQUEST, "Invalid image", e.to_string())
            },
            BgRemovalError::MalformedRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "Malformed request",
                detail.clone(),
            ),
            BgRemovalError::PayloadTooLarge(detail) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "File too large",
                detail.clone(),
            ),
            BgRemovalError::InvalidColor(detail) => (
                StatusCode::BAD_REQUEST,
                "Invalid color",
                detail.clone(),
            ),
            _ if kind.is_client_error() => {
                (StatusCode::BAD_REQUEST, "Invalid request", err.to_string())
            },
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed",
                GENERIC_FAILURE_MESSAGE.to_string(),
            ),
        };

        let debug = (debug && !kind.is_client_error()).then(|| err.to_string());

        Self {
            status,
            kind,
            error: error.to_string(),
            message,
            debug,
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.error,
            message: &self.message,
            code: self.kind,
            debug: self.debug.as_deref(),
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(id) = self.request_id.and_then(|id| HeaderValue::from_str(&id).ok()) {
            response.headers_mut().insert("x-request-id", id);
        }
        response
    }
}
