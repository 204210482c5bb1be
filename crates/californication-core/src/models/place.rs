//! The joined place entity and list sorting.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::record::{Coordinate, DocumentPlaceRecord, ExternalPlaceRecord, PlaceImage, PriceLevel};
use crate::utils::cmp_ignore_case;

/// A point of interest: editorial content from the document store merged
/// with structured metadata from the places service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub summary: String,
    pub description: String,
    pub phone_number: Option<String>,
    pub coordinate: Coordinate,
    pub address: Option<String>,
    pub rating: f32,
    pub price_level: PriceLevel,
    pub types: Vec<String>,
    pub website: Option<String>,
    pub image: PlaceImage,
}

impl Place {
    /// Join two records describing the same place.
    ///
    /// The caller is responsible for matching ids; the places-service id
    /// is the one kept.
    pub fn from_records(document: &DocumentPlaceRecord, external: &ExternalPlaceRecord) -> Self {
        let types = external
            .types
            .iter()
            .map(|t| t.replace('_', " "))
            .collect();

        Self {
            id: external.id.clone(),
            name: external.name.clone(),
            summary: document.summary.clone(),
            description: document.description.clone(),
            phone_number: external.phone_number.clone(),
            coordinate: external.coordinate,
            address: external.address.clone(),
            rating: external.rating,
            price_level: external.price_level,
            types,
            website: external.website.clone(),
            image: document.images.clone(),
        }
    }

    pub fn types_display(&self) -> String {
        if self.types.is_empty() {
            "-".to_string()
        } else {
            self.types.join(", ")
        }
    }

    /// Rating with one decimal, or "-" when the place has no reviews.
    pub fn rating_display(&self) -> String {
        if self.rating > 0.0 {
            format!("{:.1}", self.rating)
        } else {
            "-".to_string()
        }
    }
}

// Sorting options for place lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceSortColumn {
    #[default]
    Name,
    Rating,
}

impl PlaceSortColumn {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "name" => Some(PlaceSortColumn::Name),
            "rating" => Some(PlaceSortColumn::Rating),
            _ => None,
        }
    }
}

/// Sort in place. Names ascend ignoring case; ratings descend with the
/// name as tie-break.
pub fn sort_places(places: &mut [Place], column: PlaceSortColumn) {
    match column {
        PlaceSortColumn::Name => places.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name)),
        PlaceSortColumn::Rating => places.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
                .then_with(|| cmp_ignore_case(&a.name, &b.name))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(id: &str) -> DocumentPlaceRecord {
        DocumentPlaceRecord {
            id: id.to_string(),
            name: None,
            summary: format!("summary {}", id),
            description: format!("description {}", id),
            images: PlaceImage {
                thumbnail: format!("https://img/{}/t.jpg", id),
                medium: format!("https://img/{}/m.jpg", id),
                large: format!("https://img/{}/l.jpg", id),
            },
        }
    }

    fn external(id: &str, name: &str, rating: f32) -> ExternalPlaceRecord {
        ExternalPlaceRecord {
            id: id.to_string(),
            name: name.to_string(),
            coordinate: Coordinate::new(36.5, -121.9),
            rating,
            price_level: PriceLevel::Free,
            types: vec!["natural_feature".to_string(), "establishment".to_string()],
            phone_number: Some("+1 831-624-4909".to_string()),
            address: None,
            website: None,
        }
    }

    fn place(name: &str, rating: f32) -> Place {
        Place::from_records(&document(name), &external(name, name, rating))
    }

    #[test]
    fn test_from_records() {
        let place = Place::from_records(&document("p1"), &external("p1", "Point Lobos", 4.8));
        assert_eq!(place.id, "p1");
        assert_eq!(place.name, "Point Lobos");
        assert_eq!(place.summary, "summary p1");
        assert_eq!(place.description, "description p1");
        assert_eq!(place.rating, 4.8);
        assert_eq!(place.image.medium, "https://img/p1/m.jpg");
        assert_eq!(place.phone_number.as_deref(), Some("+1 831-624-4909"));
    }

    #[test]
    fn test_from_records_normalizes_types() {
        let place = Place::from_records(&document("p1"), &external("p1", "Point Lobos", 4.8));
        assert_eq!(place.types, vec!["natural feature", "establishment"]);
        assert_eq!(place.types_display(), "natural feature, establishment");
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(place("a", 4.26).rating_display(), "4.3");
        assert_eq!(place("a", 0.0).rating_display(), "-");
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let mut places = vec![place("yosemite", 4.9), place("Alcatraz", 4.7), place("big Sur", 4.8)];
        sort_places(&mut places, PlaceSortColumn::Name);
        let names: Vec<_> = places.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alcatraz", "big Sur", "yosemite"]);
    }

    #[test]
    fn test_sort_by_rating_descending_with_name_tiebreak() {
        let mut places = vec![place("Muir Woods", 4.5), place("Yosemite", 4.9), place("Alcatraz", 4.5)];
        sort_places(&mut places, PlaceSortColumn::Rating);
        let names: Vec<_> = places.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Yosemite", "Alcatraz", "Muir Woods"]);
    }

    #[test]
    fn test_sort_column_parse() {
        assert_eq!(PlaceSortColumn::parse("Rating"), Some(PlaceSortColumn::Rating));
        assert_eq!(PlaceSortColumn::parse("name"), Some(PlaceSortColumn::Name));
        assert_eq!(PlaceSortColumn::parse("price"), None);
    }
}
