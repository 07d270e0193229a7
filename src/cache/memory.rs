use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::ImageCache;
use crate::errors::CacheResult;

/// Process-local cache backend
///
/// Entries live until the process exits. Like the Redis backend, nothing is
/// ever evicted.
#[derive(Debug, Default)]
pub struct MemoryImageCache {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }
}

#[async_trait]
impl ImageCache for MemoryImageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Bytes>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> CacheResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
