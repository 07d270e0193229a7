//! Image delivery
//!
//! - `key`: cache key construction from the two request path segments
//! - `source`: filesystem access to the authoritative images
//! - `codec`: decode and JPEG re-encode
//! - `service`: the read-through cache path tying them together

pub mod codec;
pub mod key;
pub mod service;
pub mod source;

pub use key::CacheKey;
pub use service::{DeliveredImage, ImageDeliveryService, ImageOrigin};
pub use source::{FsImageSource, ImageSource};
