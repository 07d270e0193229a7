//! Cache store adapters
//!
//! The delivery service only needs two operations from a cache store:
//! look up bytes by key, and store bytes under a key. `ImageCache` is that
//! seam. Redis is the production backend; the in-memory backend is used for
//! tests and for running without a Redis instance.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

use crate::config::{CacheBackend, CacheConfig};
use crate::errors::CacheResult;

pub mod memory;
pub mod redis_backend;

pub use memory::MemoryImageCache;
pub use redis_backend::RedisImageCache;

/// Key-value store holding encoded image bytes
#[async_trait]
pub trait ImageCache: Send + Sync {
    /// Fetch the bytes stored under `key`, if any
    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>>;

    /// Store `value` under `key` with no expiry
    async fn set(&self, key: &str, value: Bytes) -> CacheResult<()>;

    /// Round-trip to the store, used by the health endpoint
    async fn ping(&self) -> CacheResult<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Build the configured cache backend
pub async fn connect(config: &CacheConfig) -> CacheResult<Arc<dyn ImageCache>> {
    match config.backend {
        CacheBackend::Redis => {
            info!("Connecting to Redis cache at {}", config.display_url());
            let cache = RedisImageCache::connect(config).await?;
            Ok(Arc::new(cache))
        }
        CacheBackend::Memory => {
            info!("Using in-memory image cache");
            Ok(Arc::new(MemoryImageCache::new()))
        }
    }
}
