//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

// Storage defaults
pub const DEFAULT_IMAGE_ROOT: &str = "images";

// Cache store defaults
pub const DEFAULT_CACHE_HOST: &str = "redis";
pub const DEFAULT_CACHE_PORT: u16 = 6379;
pub const DEFAULT_CACHE_DB: i64 = 0;

// Image encoding defaults
pub const DEFAULT_JPEG_QUALITY: u8 = 75;
pub const DEFAULT_DOWNLOAD_NAME: &str = "logo.jpeg";

// Config loading
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "IMGCACHE_";
