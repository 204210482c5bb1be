//! Californication core - place aggregation and offline caching.
//!
//! Places are assembled from two remote sources: a document store with
//! editorial content (summaries, descriptions, image URLs) and a places
//! service with structured metadata (name, rating, location). The
//! [`PlaceDirector`] joins them by place id, the [`CacheManager`] keeps the
//! last result for offline display and the [`ImageCache`] fronts image
//! downloads with a disk cache.

pub mod api;
pub mod cache;
pub mod config;
pub mod director;
pub mod models;
pub mod source;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheManager, CachedData, ImageCache};
pub use config::Config;
pub use director::PlaceDirector;
pub use models::{Place, PlaceSortColumn};
pub use source::{DocumentSource, ImageFetcher, PlacesSource};
