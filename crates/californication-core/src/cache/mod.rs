//! Local caching module for offline data access.
//!
//! This module provides:
//! - `CacheManager`: the last fetched place list, stored as one JSON file
//!   and overwritten wholesale on every save
//! - `ImageCache`: raw image bytes stored on disk, keyed by source URL
//!
//! Neither cache expires entries; callers decide when to refresh.

pub mod image;
pub mod manager;

pub use image::ImageCache;
pub use manager::{CacheManager, CachedData};
