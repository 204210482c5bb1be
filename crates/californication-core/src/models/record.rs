//! Records produced by the two remote sources.
//!
//! These are transient: fetched, joined into [`Place`](super::Place)
//! values and discarded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage URLs of a place's image in three sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceImage {
    pub thumbnail: String,
    pub medium: String,
    pub large: String,
}

/// Editorial content for one place, keyed by the places-service id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPlaceRecord {
    pub id: String,
    /// Editorial name; the places-service name wins when both exist.
    #[serde(default)]
    pub name: Option<String>,
    pub summary: String,
    pub description: String,
    pub images: PlaceImage,
}

/// WGS84 location.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Price level reported by the places service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceLevel {
    #[default]
    Unknown,
    Free,
    Cheap,
    Medium,
    High,
    Expensive,
}

impl PriceLevel {
    /// Convert the service's 0..=4 integer scale. Anything outside it is unknown.
    pub fn from_api(level: Option<i64>) -> Self {
        match level {
            Some(0) => PriceLevel::Free,
            Some(1) => PriceLevel::Cheap,
            Some(2) => PriceLevel::Medium,
            Some(3) => PriceLevel::High,
            Some(4) => PriceLevel::Expensive,
            _ => PriceLevel::Unknown,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            PriceLevel::Unknown => "-",
            PriceLevel::Free => "Free",
            PriceLevel::Cheap => "$",
            PriceLevel::Medium => "$$",
            PriceLevel::High => "$$$",
            PriceLevel::Expensive => "$$$$",
        }
    }
}

/// Structured metadata for one place from the places service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPlaceRecord {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    /// Five-star rating; 0.0 means not enough reviews.
    pub rating: f32,
    pub price_level: PriceLevel,
    pub types: Vec<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}
