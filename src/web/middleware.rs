//! HTTP middleware
//!
//! Cross-cutting concerns applied to every route: request logging and
//! response hardening headers.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method, Uri, header},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use super::responses::X_CACHE;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request logging middleware
///
/// Runs the rest of the stack inside a `request` span so the delivery
/// service's cache hit/miss logs carry the same `request_id`. The id is
/// echoed back as `X-Request-Id` and the completion line records the
/// `X-Cache` outcome for image responses.
pub async fn request_logging_middleware(
    method: Method,
    uri: Uri,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = uri.path(),
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    let _entered = span.enter();

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();
    let cache = response
        .headers()
        .get(X_CACHE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    if status.is_server_error() {
        warn!(status = status.as_u16(), cache, duration_ms, "Request failed");
    } else if status.is_client_error() {
        debug!(status = status.as_u16(), cache, duration_ms, "Request rejected");
    } else {
        info!(status = status.as_u16(), cache, duration_ms, "Request served");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;

    fn server() -> TestServer {
        let app = Router::new()
            .route(
                "/hit",
                get(|| async { ([(X_CACHE, "HIT")], "bytes") }),
            )
            .route(
                "/fail",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .layer(axum::middleware::from_fn(security_headers_middleware))
            .layer(axum::middleware::from_fn(request_logging_middleware));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let server = server();

        let first = server.get("/hit").await;
        let second = server.get("/hit").await;

        first.assert_status_ok();
        assert_eq!(first.header("x-cache"), "HIT");
        let first_id = first.header("x-request-id");
        let second_id = second.header("x-request-id");
        assert!(uuid::Uuid::parse_str(first_id.to_str().unwrap()).is_ok());
        assert_ne!(first_id, second_id);
    }

    #[tokio::test]
    async fn test_error_responses_keep_headers() {
        let response = server().get("/fail").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.header("x-content-type-options"), "nosniff");
        assert_eq!(response.header("x-frame-options"), "DENY");
    }
}
