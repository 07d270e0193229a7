//! Web layer module
//!
//! This module provides the HTTP interface for the image cache service.
//! Handlers stay thin and delegate to `ImageDeliveryService`.
//!
//! # Routes
//!
//! - `GET /image/{directory}/{filename}`: JPEG rendition of a source image
//! - `GET /health`: liveness and cache store reachability

use anyhow::Result;
use axum::{Router, http::HeaderValue, routing::get};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

use crate::{config::Config, errors::AppResult, images::ImageDeliveryService};

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use responses::{HealthResponse, jpeg_attachment};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub image_service: ImageDeliveryService,
    /// Precomputed `Content-Disposition` for every image response
    pub content_disposition: HeaderValue,
    /// Application start time for uptime calculation
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, image_service: ImageDeliveryService) -> AppResult<Self> {
        let content_disposition = responses::attachment_disposition(&config.images.download_name)?;
        Ok(Self {
            config,
            image_service,
            content_disposition,
            start_time: Utc::now(),
        })
    }
}

/// Create the router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/image/{directory}/{filename}",
            get(handlers::images::get_image),
        )
        // Middleware (applied in reverse order)
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::request_logging_middleware,
        ))
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = state.config.bind_address().parse()?;
        let app = create_router(state);
        Ok(Self { app, addr })
    }

    /// Serve until SIGINT/SIGTERM, reporting the bind outcome on `ready_signal`
    pub async fn serve_with_signal(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        self.serve_with_shutdown(ready_signal, shutdown_signal())
            .await
    }

    /// Serve until `shutdown` completes
    pub async fn serve_with_shutdown<F>(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                // Signal that we're now actually listening on the port
                let _ = ready_signal.send(Ok(()));

                axum::serve(listener, self.app)
                    .with_graceful_shutdown(shutdown)
                    .await?;
                Ok(())
            }
            Err(bind_error) => {
                // Signal the bind failure immediately
                let bind_err_msg = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", bind_err_msg)));
                Err(anyhow::anyhow!("{}", bind_err_msg))
            }
        }
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, shutting down gracefully");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully");
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Received Ctrl+C, shutting down gracefully");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received Ctrl+C, shutting down gracefully");
    }
}
