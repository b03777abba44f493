//! JSON bodies returned by the informational endpoints

use crate::config::ServerConfig;
use serde::Serialize;
use serde_json::{json, Value};

pub const SERVICE_ID: &str = "background-removal-api";
pub const SERVICE_NAME: &str = "Background Removal API";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy",
            service: SERVICE_ID,
        }
    }
}

/// Upload limits currently enforced
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Limits {
    pub max_file_size: usize,
    pub max_content_length: usize,
    pub min_dimension: u32,
    pub max_width: u32,
    pub max_height: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Value,
    pub supported_formats: Vec<&'static str>,
    pub limits: Limits,
    pub backend: String,
}

impl ApiInfo {
    pub fn new(config: &ServerConfig, backend: &str) -> Self {
        Self {
            service: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            endpoints: json!({
                "POST /remove-background": {
                    "description": "Remove background from uploaded image",
                    "parameters": {
                        "image": "Image file (required)",
                        "background_color": "Hex color like #FF0000 (optional)"
                    }
                },
                "GET /health": {
                    "description": "Service health check"
                },
                "GET /api-info": {
                    "description": "Service information and active limits"
                }
            }),
            supported_formats: super::ROUTE_EXTENSIONS.to_vec(),
            limits: Limits {
                max_file_size: config.upload.max_file_size,
                max_content_length: config.max_content_length,
                min_dimension: config.upload.min_dimension,
                max_width: config.upload.max_width,
                max_height: config.upload.max_height,
            },
            backend: backend.to_string(),
        }
    }
}
