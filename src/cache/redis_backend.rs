//! Redis cache backend
//!
//! Stores encoded images as plain Redis strings under the image key, with no
//! prefix and no TTL. The connection is established lazily on first use so
//! the service can start while Redis is still coming up; until then every
//! cache operation fails with a connection error.

use async_trait::async_trait;
use bytes::Bytes;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::ImageCache;
use crate::config::CacheConfig;
use crate::errors::{CacheError, CacheResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct RedisImageCache {
    client: redis::Client,
    connection: Arc<OnceCell<ConnectionManager>>,
}

impl RedisImageCache {
    /// Create a cache for the configured host, port and database
    ///
    /// Only the URL is validated here; no network I/O happens until the
    /// first command.
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        Self::from_url(&config.url())
    }

    pub fn from_url(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Arc::new(OnceCell::new()),
        })
    }

    /// Create the cache and try to connect immediately
    ///
    /// A failed initial connection is logged and left for the first request
    /// to retry.
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        let cache = Self::new(config)?;
        match cache.connection().await {
            Ok(_) => info!("Connected to Redis at {}", config.display_url()),
            Err(e) => warn!(
                "Redis at {} not reachable yet, will retry on first request: {}",
                config.display_url(),
                e
            ),
        }
        Ok(cache)
    }

    async fn connection(&self) -> CacheResult<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                debug!("Opening Redis connection manager");
                match tokio::time::timeout(
                    CONNECT_TIMEOUT,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                {
                    Ok(result) => result.map_err(|e| CacheError::connection(e.to_string())),
                    Err(_) => Err(CacheError::connection(format!(
                        "timed out after {}s",
                        CONNECT_TIMEOUT.as_secs()
                    ))),
                }
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl ImageCache for RedisImageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set(key, &value[..]).await?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
