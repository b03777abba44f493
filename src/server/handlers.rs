use super::error::ApiError;
use super::models::{ApiInfo, HealthResponse};
use super::AppState;
use crate::error::{BgRemovalError, ValidationError};
use crate::processor::RemovalRequest;
use crate::tracing_config::{events, spans};
use crate::types::ProcessedImage;
use crate::utils::validation::extension_of;
use axum::body::{Body, Bytes};
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use instant::Instant;
use serde_json::json;
use tracing::Instrument;

/// Extensions the upload route accepts before validation runs
pub const ROUTE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "bmp"];

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

pub async fn api_info(State(state): State<AppState>) -> Json<ApiInfo> {
    Json(ApiInfo::new(&state.config, state.processor.backend().name()))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// `POST /remove-background`
pub async fn remove_background(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = spans::request(&request_id, "POST", "/remove-background");
    let start = Instant::now();

    let result = async {
        let request = read_upload(multipart).await?;
        let filename = request.filename.clone();
        let removal_span = spans::removal(&filename, request.bytes.len());
        let processed = state
            .processor
            .process_async(request)
            .instrument(removal_span)
            .await?;
        Ok::<_, BgRemovalError>((filename, processed))
    }
    .instrument(span.clone())
    .await;

    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    span.in_scope(|| match result {
        Ok((filename, processed)) => {
            events::request_completed(StatusCode::OK.as_u16(), processed.bytes.len(), elapsed_ms);
            image_response(&filename, processed, &request_id, elapsed_ms)
        },
        Err(err) => {
            let api_error = ApiError::from_error(&err, state.config.debug);
            if api_error.status.is_server_error() {
                events::request_failed(api_error.kind, &err);
            } else {
                events::request_rejected(api_error.kind, &api_error.message);
            }
            api_error.with_request_id(request_id).into_response()
        },
    })
}

/// Pull the `image` file and optional `background_color` out of the form
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<RemovalRequest, BgRemovalError> {
    let mut multipart = multipart.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            BgRemovalError::PayloadTooLarge(rejection.body_text())
        } else {
            BgRemovalError::MalformedRequest(rejection.body_text())
        }
    })?;

    let mut image: Option<(Option<String>, Bytes)> = None;
    let mut background_color = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" if image.is_none() => {
                let filename = field.file_name().map(ToString::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                image = Some((filename, bytes));
            },
            "background_color" if background_color.is_none() => {
                background_color = Some(field.text().await.map_err(multipart_error)?);
            },
            _ => {
                // Drain so oversized bodies still trip the transport limit
                field.bytes().await.map_err(multipart_error)?;
            },
        }
    }

    let (filename, bytes) = match image {
        Some((Some(filename), bytes)) => (filename, bytes),
        // A field without a filename is a plain form value, not a file
        Some((None, _)) | None => return Err(BgRemovalError::MissingImage),
    };
    if filename.is_empty() {
        return Err(BgRemovalError::EmptyFilename);
    }

    let extension = extension_of(&filename);
    let allowed = extension
        .as_deref()
        .is_some_and(|ext| ROUTE_EXTENSIONS.contains(&ext));
    if !allowed {
        return Err(ValidationError::UnsupportedExtension {
            extension,
            allowed: ROUTE_EXTENSIONS.join(", "),
        }
        .into());
    }

    tracing::info!(filename = %filename, size_bytes = bytes.len(), "Processing image");

    Ok(RemovalRequest {
        bytes: Vec::from(bytes),
        filename,
        background_color,
    })
}

fn multipart_error(err: MultipartError) -> BgRemovalError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BgRemovalError::PayloadTooLarge(err.body_text())
    } else {
        BgRemovalError::MalformedRequest(err.body_text())
    }
}

fn image_response(
    filename: &str,
    processed: ProcessedImage,
    request_id: &str,
    elapsed_ms: u64,
) -> Response {
    let disposition = format!(
        "attachment; filename=\"removed_bg_{}\"",
        sanitize_filename(filename)
    );
    let built = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, processed.content_type())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .header("x-request-id", request_id)
        .header("x-processing-time-ms", elapsed_ms.to_string())
        .body(Body::from(processed.into_bytes()));

    match built {
        Ok(response) => response,
        Err(e) => ApiError::from_error(
            &BgRemovalError::internal(format!("Failed to build response: {e}")),
            false,
        )
        .with_request_id(request_id)
        .into_response(),
    }
}

/// Make a client filename safe to quote inside `Content-Disposition`
///
/// Anything outside visible ASCII, plus quotes, backslashes and path
/// separators, becomes `_`.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
