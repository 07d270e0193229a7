use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::key::CacheKey;

/// Authoritative store of source images
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Whether `key` names a readable regular file
    async fn exists(&self, key: &CacheKey) -> bool;

    /// Read the raw bytes behind `key`
    async fn read(&self, key: &CacheKey) -> io::Result<Vec<u8>>;
}

/// Image source rooted at a directory on the local filesystem
///
/// Keys resolve to `<root>/<directory>/<filename>`. Paths whose canonical
/// form falls outside the canonical root are treated as missing.
#[derive(Debug, Clone)]
pub struct FsImageSource {
    root: PathBuf,
}

impl FsImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).await?;
        }
        Ok(())
    }

    fn candidate_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.directory()).join(key.filename())
    }

    /// Canonical path of the file behind `key`, if it is a regular file inside the root
    async fn resolve(&self, key: &CacheKey) -> Option<PathBuf> {
        let candidate = self.candidate_path(key);

        let canonical = match fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(e) => {
                debug!("Cannot resolve {}: {}", candidate.display(), e);
                return None;
            }
        };

        let root = match fs::canonicalize(&self.root).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Image root {} is not accessible: {}", self.root.display(), e);
                return None;
            }
        };

        if !canonical.starts_with(&root) {
            warn!(
                key = %key,
                resolved = %canonical.display(),
                "Rejected image path outside of image root"
            );
            return None;
        }

        match fs::metadata(&canonical).await {
            Ok(meta) if meta.is_file() => Some(canonical),
            Ok(_) => None,
            Err(e) => {
                debug!("Cannot stat {}: {}", canonical.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl ImageSource for FsImageSource {
    async fn exists(&self, key: &CacheKey) -> bool {
        self.resolve(key).await.is_some()
    }

    async fn read(&self, key: &CacheKey) -> io::Result<Vec<u8>> {
        match self.resolve(key).await {
            Some(path) => fs::read(path).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("image {} not found", key),
            )),
        }
    }
}
