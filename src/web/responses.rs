//! HTTP response types and utilities
//!
//! Maps domain results onto HTTP responses. Only a missing image has a
//! client-visible meaning; every other failure becomes a bare 500 so no
//! internal detail leaks to the caller.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::AppError;
use crate::images::DeliveredImage;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::NotFound { .. } => {
                debug!("Responding 404: {}", self);
                (StatusCode::NOT_FOUND, "Not Found").into_response()
            }
            _ => {
                error!("Request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// `Content-Disposition` value suggesting `download_name` as the saved filename
pub fn attachment_disposition(download_name: &str) -> Result<HeaderValue, AppError> {
    let sanitized: String = download_name.chars().filter(|c| *c != '"').collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{sanitized}\"")).map_err(|e| {
        AppError::configuration(format!(
            "download name {download_name:?} is not a valid header value: {e}"
        ))
    })
}

/// 200 response carrying JPEG bytes as an attachment
pub fn jpeg_attachment(image: DeliveredImage, disposition: &HeaderValue) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(JPEG_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition.clone()),
            (X_CACHE, HeaderValue::from_static(image.origin.as_str())),
        ],
        image.bytes,
    )
        .into_response()
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub cache: CacheHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub backend: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthResponse {
    pub fn new(cache: CacheHealth, start_time: DateTime<Utc>) -> Self {
        let now = Utc::now();
        let status = if cache.error.is_none() {
            "healthy"
        } else {
            "degraded"
        };
        Self {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: now,
            uptime_seconds: (now - start_time).num_seconds(),
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CacheError;
    use crate::images::ImageOrigin;
    use bytes::Bytes;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::image_not_found("a/b.png").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let errors = vec![
            AppError::CacheUnavailable(CacheError::connection("refused")),
            AppError::internal("boom"),
            AppError::Io(std::io::Error::other("disk")),
        ];
        for error in errors {
            assert_eq!(
                error.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn test_attachment_disposition() {
        let value = attachment_disposition("logo.jpeg").unwrap();
        assert_eq!(value, "attachment; filename=\"logo.jpeg\"");

        let value = attachment_disposition("we\"ird.jpeg").unwrap();
        assert_eq!(value, "attachment; filename=\"weird.jpeg\"");

        assert!(attachment_disposition("bad\nname").is_err());
    }

    #[test]
    fn test_jpeg_attachment_headers() {
        let disposition = attachment_disposition("logo.jpeg").unwrap();
        let response = jpeg_attachment(
            DeliveredImage {
                bytes: Bytes::from_static(b"jpeg"),
                origin: ImageOrigin::Cache,
            },
            &disposition,
        );

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"logo.jpeg\""
        );
        assert_eq!(headers["x-cache"], "HIT");
    }
}
