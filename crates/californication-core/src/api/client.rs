//! API client implementing the document, places and image collaborators.

use std::cmp::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;

use crate::models::{Coordinate, DocumentPlaceRecord, ExternalPlaceRecord, PlaceImage, PriceLevel};
use crate::source::{DocumentSource, ImageFetcher, PlacesSource};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for the places service
pub const DEFAULT_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Path of the place collection inside the document store
const PLACES_COLLECTION: &str = "places";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of Place Details requests in flight at once.
const MAX_CONCURRENT_REQUESTS: usize = 5;

/// Fields requested from Place Details; keeps the billing tier predictable.
const PLACE_DETAILS_FIELDS: &str = "place_id,name,geometry/location,rating,price_level,types,\
international_phone_number,formatted_address,website";

/// API client for the document store, the places service and image hosts.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    database_url: String,
    database_auth: Option<String>,
    places_base_url: String,
    places_api_key: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(database_url: &str, places_api_key: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            database_url: database_url.trim_end_matches('/').to_string(),
            database_auth: None,
            places_base_url: DEFAULT_PLACES_BASE_URL.to_string(),
            places_api_key: places_api_key.to_string(),
        })
    }

    /// Set the token passed as `auth` to the document store
    pub fn with_database_auth(mut self, token: Option<String>) -> Self {
        self.database_auth = token;
        self
    }

    /// Point the places client at another host (proxies, test servers)
    pub fn with_places_base_url(mut self, base_url: &str) -> Self {
        self.places_base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let response = self.client.get(url).query(query).send().await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e)))
    }

    // ===== Document store =====

    /// Fetch all editorial place records.
    pub async fn fetch_document_places(&self) -> Result<Vec<DocumentPlaceRecord>, ApiError> {
        let url = format!("{}/{}.json", self.database_url, PLACES_COLLECTION);
        let query: Vec<(&str, &str)> = match self.database_auth.as_deref() {
            Some(token) => vec![("auth", token)],
            None => Vec::new(),
        };

        let snapshot: Value = self.get(&url, &query).await?;
        let places = Self::parse_document_snapshot(snapshot)?;
        debug!(count = places.len(), "Fetched document places");
        Ok(places)
    }

    /// Turn a collection snapshot into records.
    ///
    /// The store returns an object of children keyed by push id, an array
    /// when keys are small integers (with `null` holes), or `null` when the
    /// collection does not exist. Children that do not parse are skipped.
    fn parse_document_snapshot(snapshot: Value) -> Result<Vec<DocumentPlaceRecord>, ApiError> {
        let children: Vec<Value> = match snapshot {
            Value::Null => Vec::new(),
            Value::Array(items) => items.into_iter().filter(|v| !v.is_null()).collect(),
            Value::Object(map) => {
                let mut entries: Vec<(String, Value)> = map.into_iter().collect();
                entries.sort_by(|a, b| cmp_snapshot_keys(&a.0, &b.0));
                entries.into_iter().map(|(_, v)| v).collect()
            }
            other => {
                return Err(ApiError::InvalidResponse(format!(
                    "Unexpected document snapshot: {}",
                    other
                )))
            }
        };

        Ok(children
            .into_iter()
            .filter_map(|child| match serde_json::from_value::<DocumentPlaceApi>(child) {
                Ok(place) => Some(place.into_record()),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed document place");
                    None
                }
            })
            .collect())
    }

    // ===== Places service =====

    /// Fetch details for a single place.
    pub async fn fetch_place_details(&self, place_id: &str) -> Result<ExternalPlaceRecord, ApiError> {
        let url = format!("{}/place/details/json", self.places_base_url);
        let query = [
            ("place_id", place_id),
            ("fields", PLACE_DETAILS_FIELDS),
            ("key", self.places_api_key.as_str()),
        ];

        let response: PlaceDetailsResponse = self.get(&url, &query).await?;
        Self::parse_place_details(response, place_id)
    }

    fn parse_place_details(
        response: PlaceDetailsResponse,
        place_id: &str,
    ) -> Result<ExternalPlaceRecord, ApiError> {
        if response.status != "OK" {
            return Err(ApiError::from_places_status(
                &response.status,
                response.error_message.as_deref(),
                place_id,
            ));
        }
        response
            .result
            .map(PlaceDetailsApi::into_record)
            .ok_or_else(|| ApiError::InvalidResponse(format!("Missing result for place {}", place_id)))
    }

    /// Fetch details for every id with bounded concurrency. Results arrive
    /// in completion order; the first failure aborts the batch.
    pub async fn fetch_places(&self, ids: &[String]) -> Result<Vec<ExternalPlaceRecord>, ApiError> {
        let places: Vec<ExternalPlaceRecord> = stream::iter(ids.iter().cloned())
            .map(|id| async move { self.fetch_place_details(&id).await })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await?;

        debug!(requested = ids.len(), received = places.len(), "Fetched place details");
        Ok(places)
    }

    // ===== Images =====

    /// Download raw image bytes, rejecting responses that are not images.
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(url).send().await?;
        let response = Self::check_response(response).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap_or_default());
        check_image_content_type(url, content_type)?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::InvalidResponse(format!("Empty image body from {}", url)));
        }
        Ok(bytes.to_vec())
    }
}

/// Child key order of the document store: integer-like keys first in
/// numeric order, then everything else lexicographically.
fn cmp_snapshot_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Accept a missing content type or any `image/*` one.
fn check_image_content_type(url: &str, content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) if !ct.trim_start().to_ascii_lowercase().starts_with("image/") => Err(
            ApiError::InvalidResponse(format!("Expected an image from {}, got {}", url, ct)),
        ),
        _ => Ok(()),
    }
}

#[async_trait]
impl DocumentSource for ApiClient {
    async fn all_places(&self) -> Result<Vec<DocumentPlaceRecord>, ApiError> {
        self.fetch_document_places().await
    }
}

#[async_trait]
impl PlacesSource for ApiClient {
    async fn places(&self, ids: &[String]) -> Result<Vec<ExternalPlaceRecord>, ApiError> {
        self.fetch_places(ids).await
    }
}

#[async_trait]
impl ImageFetcher for ApiClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.fetch_image(url).await
    }
}

// ============================================================================
// API response types - internal only
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct DocumentPlaceApi {
    #[serde(rename = "placeId")]
    place_id: String,
    #[serde(default)]
    name: Option<String>,
    summary: String,
    description: String,
    images: DocumentImagesApi,
}

#[derive(Debug, Clone, Deserialize)]
struct DocumentImagesApi {
    thumbnail: String,
    medium: String,
    large: String,
}

impl DocumentPlaceApi {
    fn into_record(self) -> DocumentPlaceRecord {
        DocumentPlaceRecord {
            id: self.place_id,
            name: self.name,
            summary: self.summary,
            description: self.description,
            images: PlaceImage {
                thumbnail: self.images.thumbnail,
                medium: self.images.medium,
                large: self.images.large,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PlaceDetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlaceDetailsApi>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlaceDetailsApi {
    place_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    geometry: Option<GeometryApi>,
    #[serde(default)]
    rating: Option<f32>,
    #[serde(default)]
    price_level: Option<i64>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    international_phone_number: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    website: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeometryApi {
    location: LatLngApi,
}

#[derive(Debug, Clone, Deserialize)]
struct LatLngApi {
    lat: f64,
    lng: f64,
}

impl PlaceDetailsApi {
    fn into_record(self) -> ExternalPlaceRecord {
        let coordinate = self
            .geometry
            .map(|g| Coordinate::new(g.location.lat, g.location.lng))
            .unwrap_or_default();

        ExternalPlaceRecord {
            id: self.place_id,
            name: self.name,
            coordinate,
            rating: self.rating.unwrap_or(0.0).clamp(0.0, 5.0),
            price_level: PriceLevel::from_api(self.price_level),
            types: self.types,
            phone_number: self.international_phone_number,
            address: self.formatted_address,
            website: self.website,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal HTTP/1.1 server on a random local port. Each request target
    /// (path and query) is answered with `respond(target)`.
    async fn serve<F>(respond: F) -> String
    where
        F: Fn(&str) -> (u16, &'static str, Vec<u8>) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let respond = Arc::new(respond);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let respond = respond.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let request = String::from_utf8_lossy(&request).to_string();
                    let target = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let (status, content_type, body) = respond(&target);
                    let head = format!(
                        "HTTP/1.1 {} OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        content_type,
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    /// Client aimed at a local test server, bypassing any configured proxy.
    fn local_client(base: &str) -> ApiClient {
        let mut client = ApiClient::new(base, "key")
            .expect("client")
            .with_places_base_url(base);
        client.client = Client::builder().no_proxy().build().expect("reqwest client");
        client
    }

    /// Value of `name` in a request target's query string.
    fn query_param(target: &str, name: &str) -> Option<String> {
        let query = target.split_once('?')?.1;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.to_string())
    }

    /// Place Details answers: `missing` is NOT_FOUND, every other id is OK.
    fn place_details(target: &str) -> (u16, &'static str, Vec<u8>) {
        let id = query_param(target, "place_id").unwrap_or_default();
        let body = if id == "missing" {
            json!({ "status": "NOT_FOUND" })
        } else {
            json!({
                "status": "OK",
                "result": {
                    "place_id": id,
                    "name": format!("Name {}", id),
                    "geometry": { "location": { "lat": 36.0, "lng": -121.0 } },
                    "rating": 4.0
                }
            })
        };
        (200, "application/json", body.to_string().into_bytes())
    }

    fn child(id: &str) -> Value {
        json!({
            "placeId": id,
            "summary": format!("Summary {}", id),
            "description": format!("Description {}", id),
            "images": {
                "thumbnail": format!("https://cdn.example.com/{}/thumb.jpg", id),
                "medium": format!("https://cdn.example.com/{}/medium.jpg", id),
                "large": format!("https://cdn.example.com/{}/large.jpg", id)
            }
        })
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = ApiClient::new("https://californication.firebaseio.com/", "key")
            .expect("client")
            .with_places_base_url("http://localhost:8080/");
        assert_eq!(client.database_url, "https://californication.firebaseio.com");
        assert_eq!(client.places_base_url, "http://localhost:8080");
    }

    #[test]
    fn test_parse_document_snapshot_object_sorted_by_key() {
        let snapshot = json!({ "-Kb": child("p2"), "-Ka": child("p1") });
        let places = ApiClient::parse_document_snapshot(snapshot).expect("parse");
        let ids: Vec<_> = places.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(places[0].summary, "Summary p1");
        assert_eq!(places[0].images.large, "https://cdn.example.com/p1/large.jpg");
        assert_eq!(places[0].name, None);
    }

    #[test]
    fn test_parse_document_snapshot_array_with_holes() {
        let snapshot = json!([null, child("p1"), null, child("p2")]);
        let places = ApiClient::parse_document_snapshot(snapshot).expect("parse");
        assert_eq!(places.len(), 2);
        assert_eq!(places[1].id, "p2");
    }

    #[test]
    fn test_parse_document_snapshot_skips_malformed_children() {
        let snapshot = json!({
            "a": child("p1"),
            "b": { "placeId": "p2", "summary": "no images" },
            "c": 42
        });
        let places = ApiClient::parse_document_snapshot(snapshot).expect("parse");
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id, "p1");
    }

    #[test]
    fn test_parse_document_snapshot_null_and_scalar() {
        assert!(ApiClient::parse_document_snapshot(Value::Null).expect("null").is_empty());
        assert!(matches!(
            ApiClient::parse_document_snapshot(json!("oops")),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_place_details() {
        let json = r#"{
            "html_attributions": [],
            "result": {
                "place_id": "ChIJ7cv00DwsDogRAMDACa2m4K8",
                "name": "Golden Gate Bridge",
                "geometry": { "location": { "lat": 37.8199286, "lng": -122.4782551 } },
                "rating": 4.8,
                "types": ["tourist_attraction", "point_of_interest", "establishment"],
                "international_phone_number": "+1 415-921-5858",
                "formatted_address": "Golden Gate Bridge, San Francisco, CA, USA",
                "website": "http://www.goldengate.org/"
            },
            "status": "OK"
        }"#;

        let response: PlaceDetailsResponse = serde_json::from_str(json).expect("Failed to parse place details JSON");
        let place = ApiClient::parse_place_details(response, "ChIJ7cv00DwsDogRAMDACa2m4K8").expect("record");

        assert_eq!(place.id, "ChIJ7cv00DwsDogRAMDACa2m4K8");
        assert_eq!(place.name, "Golden Gate Bridge");
        assert_eq!(place.coordinate, Coordinate::new(37.8199286, -122.4782551));
        assert_eq!(place.rating, 4.8);
        assert_eq!(place.price_level, PriceLevel::Unknown);
        assert_eq!(place.types.len(), 3);
        assert_eq!(place.phone_number.as_deref(), Some("+1 415-921-5858"));
        assert_eq!(place.website.as_deref(), Some("http://www.goldengate.org/"));
    }

    #[test]
    fn test_parse_place_details_minimal_result() {
        let json = r#"{"status": "OK", "result": {"place_id": "p1", "name": "Mono Lake", "price_level": 0}}"#;
        let response: PlaceDetailsResponse = serde_json::from_str(json).expect("parse");
        let place = ApiClient::parse_place_details(response, "p1").expect("record");
        assert_eq!(place.rating, 0.0);
        assert_eq!(place.price_level, PriceLevel::Free);
        assert_eq!(place.coordinate, Coordinate::default());
        assert!(place.types.is_empty());
    }

    #[test]
    fn test_parse_place_details_error_status() {
        let json = r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#;
        let response: PlaceDetailsResponse = serde_json::from_str(json).expect("parse");
        assert!(matches!(
            ApiClient::parse_place_details(response, "p1"),
            Err(ApiError::AccessDenied(_))
        ));

        let json = r#"{"status": "OK"}"#;
        let response: PlaceDetailsResponse = serde_json::from_str(json).expect("parse");
        assert!(matches!(
            ApiClient::parse_place_details(response, "p1"),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_places_empty_ids_makes_no_requests() {
        // Unroutable base URL: any request would fail.
        let client = ApiClient::new("http://127.0.0.1:9", "key")
            .expect("client")
            .with_places_base_url("http://127.0.0.1:9");
        let places = client.fetch_places(&[]).await.expect("no requests");
        assert!(places.is_empty());
    }

    #[test]
    fn test_parse_place_details_clamps_rating() {
        let json = r#"{"status": "OK", "result": {"place_id": "p1", "name": "High", "rating": 7.5}}"#;
        let response: PlaceDetailsResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(ApiClient::parse_place_details(response, "p1").expect("record").rating, 5.0);

        let json = r#"{"status": "OK", "result": {"place_id": "p2", "name": "Low", "rating": -1.0}}"#;
        let response: PlaceDetailsResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(ApiClient::parse_place_details(response, "p2").expect("record").rating, 0.0);
    }

    #[test]
    fn test_parse_document_snapshot_integer_keys_sort_numerically() {
        let snapshot = json!({ "10": child("p10"), "2": child("p2"), "1": child("p1"), "-Ka": child("pa") });
        let places = ApiClient::parse_document_snapshot(snapshot).expect("parse");
        let ids: Vec<_> = places.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p10", "pa"]);
    }

    #[test]
    fn test_check_image_content_type() {
        assert!(check_image_content_type("u", Some("image/jpeg")).is_ok());
        assert!(check_image_content_type("u", Some("Image/PNG")).is_ok());
        assert!(check_image_content_type("u", None).is_ok());
        assert!(matches!(
            check_image_content_type("u", Some("text/html; charset=utf-8")),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_places_source_fetches_every_id() {
        let base = serve(place_details).await;
        let client = local_client(&base);
        let source: &dyn PlacesSource = &client;

        let ids = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];
        let mut places = source.places(&ids).await.expect("places");
        places.sort_by(|a, b| a.id.cmp(&b.id));

        let names: Vec<_> = places.iter().map(|p| (p.id.as_str(), p.name.as_str())).collect();
        assert_eq!(names, vec![("p1", "Name p1"), ("p2", "Name p2"), ("p3", "Name p3")]);
        assert_eq!(places[0].coordinate, Coordinate::new(36.0, -121.0));
    }

    #[tokio::test]
    async fn test_places_source_propagates_first_failure() {
        let base = serve(place_details).await;
        let client = local_client(&base);
        let source: &dyn PlacesSource = &client;

        let ids = vec!["p1".to_string(), "missing".to_string()];
        assert!(matches!(source.places(&ids).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_document_source_over_http() {
        let base = serve(|target: &str| {
            if target.starts_with("/places.json") {
                let body = json!({ "-Kb": child("p2"), "-Ka": child("p1") });
                (200, "application/json", body.to_string().into_bytes())
            } else {
                (404, "text/plain", b"not found".to_vec())
            }
        })
        .await;
        let client = local_client(&base);
        let source: &dyn DocumentSource = &client;

        let places = source.all_places().await.expect("documents");
        let ids: Vec<_> = places.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_fetch_image_rejects_non_image_content() {
        let base = serve(|target: &str| match target {
            "/photo.png" => (200, "image/png", b"\x89PNG".to_vec()),
            "/page" => (200, "text/html", b"<html></html>".to_vec()),
            _ => (404, "text/plain", Vec::new()),
        })
        .await;
        let client = local_client(&base);

        let bytes = client.fetch_image(&format!("{}/photo.png", base)).await.expect("image");
        assert_eq!(bytes, b"\x89PNG");
        assert!(matches!(
            client.fetch_image(&format!("{}/page", base)).await,
            Err(ApiError::InvalidResponse(_))
        ));
        assert!(matches!(
            client.fetch_image(&format!("{}/gone.png", base)).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
