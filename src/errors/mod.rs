//! Centralized error handling for the image cache service
//!
//! # Error Categories
//!
//! - **Not found**: the requested image is not on disk (HTTP 404)
//! - **Codec errors**: the file could not be decoded or re-encoded
//! - **Cache errors**: the cache store could not be reached
//! - **I/O errors**: the file exists but could not be read
//!
//! # Usage
//!
//! ```rust
//! use imgcache::errors::{AppError, AppResult};
//!
//! fn lookup(found: bool) -> AppResult<&'static str> {
//!     if found {
//!         Ok("bytes")
//!     } else {
//!         Err(AppError::image_not_found("logos/acme.png"))
//!     }
//! }
//!
//! assert!(lookup(false).unwrap_err().is_not_found());
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for cache store Results
pub type CacheResult<T> = Result<T, CacheError>;
