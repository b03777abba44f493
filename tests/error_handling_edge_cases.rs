//! Error handling and edge case testing for the upload endpoint
//!
//! Every rejection must produce a JSON body with a stable `code` and never a
//! partial image.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use bgremove_api::{SegmentationBackend, ServerConfig};
use common::*;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::sync::Arc;
use std::time::Duration;

async fn assert_rejected(body: Vec<u8>, status: StatusCode, code: &str) -> serde_json::Value {
    assert_rejected_by(app(), body, status, code).await
}

async fn assert_rejected_by(
    app: axum::Router,
    body: Vec<u8>,
    status: StatusCode,
    code: &str,
) -> serde_json::Value {
    let response = send(app, upload_request(body)).await;
    assert_eq!(response.status(), status);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert!(response.headers().contains_key("x-request-id"));
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "body: {json}");
    json
}

#[tokio::test]
async fn test_missing_image_field() {
    let body = MultipartBody::new().text("background_color", "#FFFFFF").finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "EmptyFile").await;
    assert_eq!(json["error"], "No image provided");
    assert_eq!(json["message"], "Please upload an image file");
}

#[tokio::test]
async fn test_image_sent_as_plain_field() {
    let body = MultipartBody::new().text("image", "not a file").finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "EmptyFile").await;
    assert_eq!(json["error"], "No image provided");
}

#[tokio::test]
async fn test_empty_filename() {
    let body = MultipartBody::new()
        .file("image", "", "image/png", &png(120, 120))
        .finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "EmptyFile").await;
    assert_eq!(json["error"], "No image selected");
    assert_eq!(json["message"], "Please select an image file");
}

#[tokio::test]
async fn test_route_level_extension_check() {
    for filename in ["anim.gif", "scan.tiff", "README", "archive.png.zip", "trailing."] {
        let body = MultipartBody::new()
            .file("image", filename, "application/octet-stream", &png(120, 120))
            .finish();
        let json = assert_rejected(body, StatusCode::BAD_REQUEST, "UnsupportedExtension").await;
        assert_eq!(json["error"], "Invalid file type", "{filename}");
        assert_eq!(
            json["message"], "Supported formats: png, jpg, jpeg, webp, bmp",
            "{filename}"
        );
    }
}

#[tokio::test]
async fn test_empty_file() {
    let body = MultipartBody::new()
        .file("image", "empty.png", "image/png", &[])
        .finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "EmptyFile").await;
    assert_eq!(json["message"], "Empty file provided");
}

#[tokio::test]
async fn test_file_over_validation_cap() {
    // Over 8 MiB but under the 16 MiB transport cap
    let data = vec![0u8; 8 * 1024 * 1024 + 1];
    let body = MultipartBody::new()
        .file("image", "huge.png", "image/png", &data)
        .finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "TooLarge").await;
    assert_eq!(json["message"], "File too large. Maximum size: 8MB");
}

#[tokio::test]
async fn test_body_over_transport_cap() {
    let config = ServerConfig {
        max_content_length: 4 * 1024,
        ..test_config()
    };
    let app = app_with(config, Arc::new(BorderStubBackend::new(0)));

    let body = MultipartBody::new()
        .file("image", "big.png", "image/png", &vec![7u8; 64 * 1024])
        .finish();
    let response = send(app, upload_request(body)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["code"], "TooLarge");
}

#[tokio::test]
async fn test_undecodable_image() {
    let body = MultipartBody::new()
        .file("image", "broken.png", "image/png", b"definitely not an image")
        .finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "UndecodableImage").await;
    assert_eq!(json["error"], "Invalid image");
}

#[tokio::test]
async fn test_truncated_png() {
    let mut data = png(120, 120);
    data.truncate(data.len() / 2);
    let body = MultipartBody::new()
        .file("image", "cut.png", "image/png", &data)
        .finish();
    assert_rejected(body, StatusCode::BAD_REQUEST, "UndecodableImage").await;
}

#[tokio::test]
async fn test_image_too_small() {
    for (width, height) in [(50, 50), (99, 200), (200, 99)] {
        let body = MultipartBody::new()
            .file("image", "tiny.png", "image/png", &png(width, height))
            .finish();
        let json = assert_rejected(body, StatusCode::BAD_REQUEST, "TooSmall").await;
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("Minimum dimensions: 100x100px"));
    }
}

#[tokio::test]
async fn test_image_too_large_dimensions() {
    let body = MultipartBody::new()
        .file("image", "panorama.png", "image/png", &png(4001, 100))
        .finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "TooLargeDimensions").await;
    assert!(json["message"].as_str().unwrap().contains("4000x4000px"));
}

#[tokio::test]
async fn test_decoded_format_outside_allowed_set() {
    let gif = encode(
        &DynamicImage::ImageRgba8(RgbaImage::new(120, 120)),
        ImageFormat::Gif,
    );
    let body = MultipartBody::new()
        .file("image", "disguised.png", "image/png", &gif)
        .finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "UnsupportedFormat").await;
    assert!(json["message"].as_str().unwrap().contains("GIF"));
}

#[tokio::test]
async fn test_broken_file_in_disallowed_format() {
    let body = MultipartBody::new()
        .file("image", "stub.png", "image/png", b"GIF89a")
        .finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "UnsupportedFormat").await;
    assert!(json["message"].as_str().unwrap().contains("GIF"));
}

#[tokio::test]
async fn test_oversized_dimensions_rejected_from_header() {
    let body = MultipartBody::new()
        .file("image", "poster.png", "image/png", &png_header_only(12_000, 12_000))
        .finish();
    let json = assert_rejected(body, StatusCode::BAD_REQUEST, "TooLargeDimensions").await;
    assert!(json["message"].as_str().unwrap().contains("4000x4000px"));
}

#[tokio::test]
async fn test_segmentation_failure_hides_detail_outside_debug() {
    let app = app_with(test_config(), Arc::new(FailingBackend));
    let body = MultipartBody::new()
        .file("image", "photo.png", "image/png", &png(120, 120))
        .finish();
    let json = assert_rejected_by(
        app,
        body,
        StatusCode::INTERNAL_SERVER_ERROR,
        "SegmentationFailure",
    )
    .await;
    assert_eq!(json["error"], "Processing failed");
    assert_eq!(
        json["message"],
        "Failed to process image. Please try again with a different image."
    );
    assert!(json.get("debug").is_none());
}

#[tokio::test]
async fn test_segmentation_failure_detail_in_debug_mode() {
    let config = ServerConfig {
        debug: true,
        ..test_config()
    };
    let app = app_with(config, Arc::new(FailingBackend));
    let body = MultipartBody::new()
        .file("image", "photo.png", "image/png", &png(120, 120))
        .finish();
    let json = assert_rejected_by(
        app,
        body,
        StatusCode::INTERNAL_SERVER_ERROR,
        "SegmentationFailure",
    )
    .await;
    assert!(json["debug"].as_str().unwrap().contains("weights missing"));
}

#[tokio::test]
async fn test_validation_errors_never_reach_backend() {
    let backend = Arc::new(BorderStubBackend::new(0));
    let app = app_with(
        test_config(),
        Arc::clone(&backend) as Arc<dyn SegmentationBackend>,
    );
    let body = MultipartBody::new()
        .file("image", "tiny.png", "image/png", &png(10, 10))
        .finish();
    assert_rejected_by(app, body, StatusCode::BAD_REQUEST, "TooSmall").await;
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_segmentation_timeout() {
    let config = ServerConfig {
        segmentation_timeout: Some(Duration::from_millis(50)),
        ..test_config()
    };
    let app = app_with(
        config,
        Arc::new(BorderStubBackend::slow(Duration::from_millis(500))),
    );
    let body = MultipartBody::new()
        .file("image", "slow.png", "image/png", &png(120, 120))
        .finish();
    assert_rejected_by(
        app,
        body,
        StatusCode::INTERNAL_SERVER_ERROR,
        "SegmentationFailure",
    )
    .await;
}

#[tokio::test]
async fn test_not_multipart() {
    let request = Request::builder()
        .method("POST")
        .uri("/remove-background")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = send(app(), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "MalformedRequest");
}

#[tokio::test]
async fn test_wrong_method() {
    let response = send(app(), get("/remove-background")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
