//! Shared helpers for integration tests
//!
//! Stub backends stand in for the model so responses are deterministic, and
//! `MultipartBody` assembles form uploads by hand.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use bgremove_api::server::{create_app, AppState};
use bgremove_api::{BgRemovalError, Result, SegmentationBackend, ServerConfig};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const BOUNDARY: &str = "bgremove-test-boundary";

/// Keeps a centered square opaque and clears a border of `border` pixels
#[derive(Debug, Default)]
pub struct BorderStubBackend {
    pub border: u32,
    pub delay: Option<Duration>,
    calls: AtomicUsize,
}

impl BorderStubBackend {
    pub fn new(border: u32) -> Self {
        Self {
            border,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            border: 0,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentationBackend for BorderStubBackend {
    fn initialize(&self) -> Result<Option<Duration>> {
        Ok(None)
    }

    fn segment(&self, image: DynamicImage) -> Result<RgbaImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let mut rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let border = self.border;
        for (x, y, pixel) in rgba.enumerate_pixels_mut() {
            let inside =
                x >= border && y >= border && x + border < width && y + border < height;
            *pixel = if inside {
                Rgba([pixel[0], pixel[1], pixel[2], 255])
            } else {
                Rgba([0, 0, 0, 0])
            };
        }
        Ok(rgba)
    }

    fn name(&self) -> &str {
        "border-stub"
    }

    fn is_initialized(&self) -> bool {
        true
    }
}

/// Always fails, like a model that cannot be loaded
#[derive(Debug, Default)]
pub struct FailingBackend;

impl SegmentationBackend for FailingBackend {
    fn initialize(&self) -> Result<Option<Duration>> {
        Err(BgRemovalError::model("weights missing"))
    }

    fn segment(&self, _image: DynamicImage) -> Result<RgbaImage> {
        Err(BgRemovalError::model("weights missing"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn is_initialized(&self) -> bool {
        false
    }
}

/// Solid green test photo
pub fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([20, 180, 40])))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(&photo(width, height), ImageFormat::Png)
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = out.len();
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let crc = crc32(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
}

/// PNG with a valid RGBA header for `width`x`height` and junk pixel data
pub fn png_header_only(width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    png_chunk(&mut out, b"IHDR", &ihdr);
    png_chunk(&mut out, b"IDAT", &[0xDE, 0xAD, 0xBE, 0xEF]);
    png_chunk(&mut out, b"IEND", &[]);
    out
}

/// Hand-built `multipart/form-data` body
#[derive(Debug, Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.bytes
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        debug: false,
        max_concurrent_segmentations: 2,
        ..ServerConfig::default()
    }
}

pub fn app_with(config: ServerConfig, backend: Arc<dyn SegmentationBackend>) -> Router {
    create_app(AppState::new(config, backend).unwrap())
}

pub fn app() -> Router {
    app_with(test_config(), Arc::new(BorderStubBackend::new(10)))
}

pub fn upload_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/remove-background")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
