//! Place aggregation: joins document-store content with places-service
//! metadata and hands the result to the place cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::cache::CacheManager;
use crate::models::{DocumentPlaceRecord, ExternalPlaceRecord, Place};
use crate::source::{DocumentSource, PlacesSource};

pub struct PlaceDirector {
    documents: Arc<dyn DocumentSource>,
    places: Arc<dyn PlacesSource>,
    cache: Arc<CacheManager>,
}

impl PlaceDirector {
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        places: Arc<dyn PlacesSource>,
        cache: Arc<CacheManager>,
    ) -> Self {
        Self {
            documents,
            places,
            cache,
        }
    }

    /// Fetch both sources and join them by place id.
    ///
    /// Errors from either source are returned unchanged. If the places
    /// source returns a different number of records than ids requested,
    /// the whole batch is discarded and an empty list is returned.
    pub async fn fetch_all(&self) -> Result<Vec<Place>, ApiError> {
        let documents = self.documents.all_places().await?;
        let ids = unique_ids(&documents);
        debug!(documents = documents.len(), ids = ids.len(), "Fetched documents, requesting details");

        let externals = self.places.places(&ids).await?;
        Ok(link(&documents, &externals, ids.len()))
    }

    /// Fetch, then persist the result. An empty result leaves the previous
    /// cache in place; a failed save is logged and the places still returned.
    pub async fn refresh(&self) -> Result<Vec<Place>, ApiError> {
        let places = self.fetch_all().await?;
        if places.is_empty() {
            warn!("Refresh produced no places, keeping cached list");
            return Ok(places);
        }

        if let Err(e) = self.cache.save_places(&places) {
            warn!(error = %e, "Failed to save places to cache");
        }
        info!(count = places.len(), "Places refreshed");
        Ok(places)
    }

    pub fn save(&self, places: &[Place]) -> anyhow::Result<()> {
        self.cache.save_places(places)
    }

    /// The last saved list, if any.
    pub fn persisted(&self) -> Option<Vec<Place>> {
        self.cache.load_places()
    }
}

/// Ids in document order, duplicates dropped.
fn unique_ids(documents: &[DocumentPlaceRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for document in documents {
        if seen.insert(document.id.as_str()) {
            ids.push(document.id.clone());
        }
    }
    ids
}

// TODO: drop only the unmatched record once product confirms a partial
// list is acceptable; today one missing detail discards the batch.
fn link(documents: &[DocumentPlaceRecord], externals: &[ExternalPlaceRecord], requested: usize) -> Vec<Place> {
    if externals.len() != requested {
        warn!(
            requested = requested,
            received = externals.len(),
            "Place details count mismatch, discarding batch"
        );
        return Vec::new();
    }

    let by_id: HashMap<&str, &ExternalPlaceRecord> =
        externals.iter().map(|e| (e.id.as_str(), e)).collect();

    documents
        .iter()
        .filter_map(|document| {
            let external = by_id.get(document.id.as_str());
            if external.is_none() {
                debug!(id = %document.id, "No details for place, dropping");
            }
            external.map(|external| Place::from_records(document, external))
        })
        .collect()
}
