//! Collaborator traits for the remote systems the core depends on.
//!
//! The director and the image cache only see these traits, so tests can
//! substitute in-memory fakes for the HTTP clients in [`crate::api`].

use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::{DocumentPlaceRecord, ExternalPlaceRecord};

/// Source of editorial place content.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch every place record, in the store's order.
    async fn all_places(&self) -> Result<Vec<DocumentPlaceRecord>, ApiError>;
}

/// Source of structured place metadata.
#[async_trait]
pub trait PlacesSource: Send + Sync {
    /// Fetch records for the given ids. The result order is not
    /// guaranteed to match `ids`.
    async fn places(&self, ids: &[String]) -> Result<Vec<ExternalPlaceRecord>, ApiError>;
}

/// Network access for raw image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}
