use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub mod defaults;

use defaults::*;

use crate::errors::AppError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub images: ImageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<directory>/<filename>` source images
    #[serde(default = "default_image_root")]
    pub image_root: PathBuf,
}

/// Which cache store implementation backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    /// Process-local map, lost on restart
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,
    #[serde(default = "default_cache_host")]
    pub host: String,
    #[serde(default = "default_cache_port")]
    pub port: u16,
    /// Logical database index
    #[serde(default = "default_cache_db")]
    pub db: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Filename suggested to clients in Content-Disposition
    #[serde(default = "default_download_name")]
    pub download_name: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_image_root() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGE_ROOT)
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Redis
}

fn default_cache_host() -> String {
    DEFAULT_CACHE_HOST.to_string()
}

fn default_cache_port() -> u16 {
    DEFAULT_CACHE_PORT
}

fn default_cache_db() -> i64 {
    DEFAULT_CACHE_DB
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_download_name() -> String {
    DEFAULT_DOWNLOAD_NAME.to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_root: default_image_root(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            host: default_cache_host(),
            port: default_cache_port(),
            db: default_cache_db(),
            password: None,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            download_name: default_download_name(),
        }
    }
}

impl CacheConfig {
    /// Connection URL in the form `redis://[:password@]host:port/db`
    ///
    /// The password is percent-encoded so reserved characters stay inside
    /// the userinfo component.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    /// URL safe for logging
    pub fn display_url(&self) -> String {
        match self.password {
            Some(_) => format!("redis://:***@{}:{}/{}", self.host, self.port, self.db),
            None => self.url(),
        }
    }
}

impl Config {
    /// Layer defaults, the TOML file (if present) and `IMGCACHE_*` environment variables
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(config_file).exists() {
            info!("Loading configuration from: {}", config_file);
        } else {
            debug!(
                "Config file {} not found, using defaults and environment",
                config_file
            );
        }

        let config: Config = Self::figment(config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(config_file: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(AppError::configuration(format!(
                "images.jpeg_quality must be between 1 and 100, got {}",
                self.images.jpeg_quality
            )));
        }
        if self.images.download_name.trim().is_empty() {
            return Err(AppError::configuration(
                "images.download_name must not be empty",
            ));
        }
        if self.cache.db < 0 {
            return Err(AppError::configuration(format!(
                "cache.db must be non-negative, got {}",
                self.cache.db
            )));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
