use bytes::Bytes;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::codec;
use super::key::CacheKey;
use super::source::{FsImageSource, ImageSource};
use crate::cache::ImageCache;
use crate::config::Config;
use crate::errors::{AppError, AppResult};

/// Where the returned bytes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    Cache,
    Disk,
}

impl ImageOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageOrigin::Cache => "HIT",
            ImageOrigin::Disk => "MISS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeliveredImage {
    /// JPEG-encoded bytes
    pub bytes: Bytes,
    pub origin: ImageOrigin,
}

/// Read-through cache in front of the image source
///
/// On a hit the stored bytes are returned as-is. On a miss the source file
/// is decoded, re-encoded as JPEG, written back to the cache and returned.
/// Concurrent misses for the same key are not coalesced.
#[derive(Clone)]
pub struct ImageDeliveryService {
    cache: Arc<dyn ImageCache>,
    source: Arc<dyn ImageSource>,
    jpeg_quality: u8,
}

impl ImageDeliveryService {
    pub fn new(cache: Arc<dyn ImageCache>, source: Arc<dyn ImageSource>, jpeg_quality: u8) -> Self {
        Self {
            cache,
            source,
            jpeg_quality,
        }
    }

    /// Service reading from the configured image root
    pub fn from_config(config: &Config, cache: Arc<dyn ImageCache>) -> Self {
        let source = FsImageSource::new(config.storage.image_root.clone());
        Self::new(cache, Arc::new(source), config.images.jpeg_quality)
    }

    pub fn cache(&self) -> &Arc<dyn ImageCache> {
        &self.cache
    }

    pub async fn serve(&self, directory: &str, filename: &str) -> AppResult<DeliveredImage> {
        let key = CacheKey::new(directory, filename);

        if let Some(bytes) = self.cache.get(key.as_str()).await? {
            debug!(key = %key, size = bytes.len(), "Image cache hit");
            return Ok(DeliveredImage {
                bytes,
                origin: ImageOrigin::Cache,
            });
        }

        debug!(key = %key, "Image cache miss");

        if !self.source.exists(&key).await {
            debug!(key = %key, "Image not found on disk");
            return Err(AppError::image_not_found(key.as_str()));
        }

        let raw = match self.source.read(&key).await {
            Ok(raw) => raw,
            // Removed between the existence check and the read
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AppError::image_not_found(key.as_str()));
            }
            Err(e) => return Err(e.into()),
        };

        let quality = self.jpeg_quality;
        let source_size = raw.len();
        let encoded = tokio::task::spawn_blocking(move || codec::transcode_to_jpeg(&raw, quality))
            .await
            .map_err(|e| AppError::internal(format!("Transcode task failed: {e}")))?
            .map_err(|e| AppError::from_codec(key.as_str(), e))?;
        let bytes = Bytes::from(encoded);

        if let Err(e) = self.cache.set(key.as_str(), bytes.clone()).await {
            warn!(key = %key, "Failed to store image in cache: {}", e);
        } else {
            info!(
                key = %key,
                source_size,
                jpeg_size = bytes.len(),
                "Cached re-encoded image"
            );
        }

        Ok(DeliveredImage {
            bytes,
            origin: ImageOrigin::Disk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryImageCache;
    use crate::errors::{CacheError, CacheResult};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source that counts filesystem-equivalent reads
    #[derive(Default)]
    struct StaticSource {
        files: HashMap<String, Vec<u8>>,
        reads: AtomicUsize,
    }

    impl StaticSource {
        fn with_file(key: &str, data: Vec<u8>) -> Self {
            let mut files = HashMap::new();
            files.insert(key.to_string(), data);
            Self {
                files,
                reads: AtomicUsize::new(0),
            }
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageSource for StaticSource {
        async fn exists(&self, key: &CacheKey) -> bool {
            self.files.contains_key(key.as_str())
        }

        async fn read(&self, key: &CacheKey) -> io::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(key.as_str())
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    /// Cache whose reads and/or writes always fail
    struct BrokenCache {
        fail_reads: bool,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl ImageCache for BrokenCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<Bytes>> {
            if self.fail_reads {
                Err(CacheError::connection("connection refused"))
            } else {
                Ok(None)
            }
        }

        async fn set(&self, _key: &str, _value: Bytes) -> CacheResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::connection("connection refused"))
        }

        async fn ping(&self) -> CacheResult<()> {
            Err(CacheError::connection("connection refused"))
        }

        fn backend_name(&self) -> &'static str {
            "broken"
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn service(cache: Arc<dyn ImageCache>, source: Arc<StaticSource>) -> ImageDeliveryService {
        ImageDeliveryService::new(cache, source, 75)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_source() {
        let cache = Arc::new(MemoryImageCache::new());
        cache
            .set("logos/acme.png", Bytes::from_static(b"cached bytes"))
            .await
            .unwrap();
        let source = Arc::new(StaticSource::with_file("logos/acme.png", png_bytes(4, 4)));

        let delivered = service(cache, source.clone())
            .serve("logos", "acme.png")
            .await
            .unwrap();

        assert_eq!(delivered.bytes, Bytes::from_static(b"cached bytes"));
        assert_eq!(delivered.origin, ImageOrigin::Cache);
        assert_eq!(source.reads(), 0);
    }

    #[tokio::test]
    async fn test_miss_populates_cache_with_jpeg() {
        let cache = Arc::new(MemoryImageCache::new());
        let png = png_bytes(100, 50);
        let expected = codec::transcode_to_jpeg(&png, 75).unwrap();
        let source = Arc::new(StaticSource::with_file("logos/acme.png", png));

        let delivered = service(cache.clone(), source.clone())
            .serve("logos", "acme.png")
            .await
            .unwrap();

        assert_eq!(delivered.origin, ImageOrigin::Disk);
        assert_eq!(delivered.bytes.as_ref(), expected.as_slice());
        assert_eq!(source.reads(), 1);

        let stored = cache.get("logos/acme.png").await.unwrap().unwrap();
        assert_eq!(stored, delivered.bytes);

        let decoded = image::load_from_memory(&stored).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[tokio::test]
    async fn test_second_call_is_identical_and_served_from_cache() {
        let cache = Arc::new(MemoryImageCache::new());
        let source = Arc::new(StaticSource::with_file("a/b.png", png_bytes(10, 10)));
        let service = service(cache, source.clone());

        let first = service.serve("a", "b.png").await.unwrap();
        let second = service.serve("a", "b.png").await.unwrap();

        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.origin, ImageOrigin::Disk);
        assert_eq!(second.origin, ImageOrigin::Cache);
        assert_eq!(source.reads(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found_without_cache_write() {
        let cache = Arc::new(MemoryImageCache::new());
        let source = Arc::new(StaticSource::default());

        let err = service(cache.clone(), source)
            .serve("logos", "missing.png")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_decode_error() {
        let cache = Arc::new(MemoryImageCache::new());
        let source = Arc::new(StaticSource::with_file("a/bad.png", b"not an image".to_vec()));

        let err = service(cache.clone(), source)
            .serve("a", "bad.png")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Decode { ref key, .. } if key == "a/bad.png"));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_read_failure_propagates() {
        let cache = Arc::new(BrokenCache {
            fail_reads: true,
            writes: AtomicUsize::new(0),
        });
        let source = Arc::new(StaticSource::with_file("a/b.png", png_bytes(4, 4)));

        let err = service(cache, source.clone())
            .serve("a", "b.png")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CacheUnavailable(_)));
        assert_eq!(source.reads(), 0);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_image() {
        let cache = Arc::new(BrokenCache {
            fail_reads: false,
            writes: AtomicUsize::new(0),
        });
        let source = Arc::new(StaticSource::with_file("a/b.png", png_bytes(4, 4)));

        let delivered = service(cache.clone(), source)
            .serve("a", "b.png")
            .await
            .unwrap();

        assert_eq!(delivered.origin, ImageOrigin::Disk);
        assert_eq!(
            image::guess_format(&delivered.bytes).unwrap(),
            ImageFormat::Jpeg
        );
        assert_eq!(cache.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_is_directory_slash_filename() {
        let cache = Arc::new(MemoryImageCache::new());
        let source = Arc::new(StaticSource::with_file("a/b.png", png_bytes(4, 4)));

        let delivered = service(cache.clone(), source)
            .serve("a", "b.png")
            .await
            .unwrap();

        assert!(cache.contains_key("a/b.png").await);
        assert_eq!(cache.get("a/b.png").await.unwrap(), Some(delivered.bytes));
    }
}
