//! Error type definitions for the image cache service
//!
//! Errors are grouped by the collaborator that produced them: the cache
//! store, the image codec, the filesystem, and the application layer that
//! ties them together.

use thiserror::Error;

/// Top-level application error type
///
/// Only `NotFound` has a client-visible meaning. Every other variant is
/// reported to the client as a generic server error.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// The source file exists but could not be decoded as an image
    #[error("Decode error for {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: image::ImageError,
    },

    /// The decoded image could not be re-encoded
    #[error("Encode error for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: image::ImageError,
    },

    /// Cache store errors
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),

    /// Filesystem errors other than a missing file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Cache store specific errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Errors reported by the Redis client
    #[error("Redis error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Connection could not be established or was lost
    #[error("Connection failed: {message}")]
    Connection { message: String },
}

/// Image codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a not found error for an image key
    pub fn image_not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound {
            resource: "image".to_string(),
            id: key.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attach the cache key to a codec failure
    pub fn from_codec<S: Into<String>>(key: S, error: CodecError) -> Self {
        match error {
            CodecError::Decode(source) => Self::Decode {
                key: key.into(),
                source,
            },
            CodecError::Encode(source) => Self::Encode {
                key: key.into(),
                source,
            },
        }
    }

    /// Whether this error is the result of a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl CacheError {
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}
