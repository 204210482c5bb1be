//! Data models for places.
//!
//! This module contains:
//!
//! - `DocumentPlaceRecord`: editorial content from the document store
//! - `ExternalPlaceRecord`: structured metadata from the places service
//! - `Place`: the joined entity that is displayed and persisted
//! - `PlaceSortColumn`: sorting options for place lists

pub mod place;
pub mod record;

pub use place::{sort_places, Place, PlaceSortColumn};
pub use record::{Coordinate, DocumentPlaceRecord, ExternalPlaceRecord, PlaceImage, PriceLevel};
