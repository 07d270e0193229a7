//! Health check HTTP handler
//!
//! Reports process liveness plus cache store reachability. The endpoint
//! always answers 200; a failing cache only degrades the reported status.

use axum::{Json, extract::State};

use crate::web::{
    AppState,
    responses::{CacheHealth, HealthResponse},
};

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let cache = state.image_service.cache();

    let cache_health = match cache.ping().await {
        Ok(()) => CacheHealth {
            backend: cache.backend_name().to_string(),
            status: "connected".to_string(),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Cache health check failed: {}", e);
            CacheHealth {
                backend: cache.backend_name().to_string(),
                status: "unavailable".to_string(),
                error: Some(e.to_string()),
            }
        }
    };

    Json(HealthResponse::new(cache_health, state.start_time))
}
