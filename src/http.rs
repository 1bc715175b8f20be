//! HTTP client for the Places API (New).
//!
//! This module provides both search collaborators over one pooled client:
//! - Search along route via `places:searchText` with an encoded polyline
//! - Nearby search via `places:searchNearby` with a circular restriction
//!
//! Requests are never retried. The client is built with the configured
//! timeout, and a timeout is reported like any other [`SearchError`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    DiscoveryPreferences, EncodedRoute, LatLng, NearbySearch, RawPlaceResult, RouteSearch,
    SearchError,
};

pub const DEFAULT_BASE_URL: &str = "https://places.googleapis.com/v1";

/// Only the fields mapped into [`RawPlaceResult`] are requested.
pub const FIELD_MASK: &str = "places.id,places.displayName,places.types,places.rating,\
places.userRatingCount,places.location,places.priceLevel";

// Longest error body kept in SearchError::Status
const MAX_ERROR_BODY: usize = 512;

/// Configuration for [`GooglePlacesClient`].
#[derive(Debug, Clone)]
pub struct PlacesClientConfig {
    pub api_key: String,
    /// API root, without trailing slash. Default: Places API (New)
    pub base_url: String,
    /// Per-request timeout. Default: 10 seconds
    pub request_timeout: Duration,
    /// Results requested per call (API maximum 20). Default: 20
    pub max_result_count: u32,
    /// Language for display names, e.g. "en"
    pub language_code: Option<String>,
}

impl PlacesClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            max_result_count: 20,
            language_code: None,
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTextRequest {
    pub text_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    pub max_result_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    pub search_along_route_parameters: SearchAlongRouteParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchAlongRouteParameters {
    pub polyline: ApiPolyline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPolyline {
    pub encoded_polyline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNearbyRequest {
    pub included_types: Vec<String>,
    pub max_result_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    pub location_restriction: LocationRestriction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRestriction {
    pub circle: Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Circle {
    pub center: LatLng,
    pub radius: f64,
}

/// API response for both search endpoints
#[derive(Debug, Deserialize)]
struct PlacesResponse {
    places: Option<Vec<ApiPlace>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlace {
    id: Option<String>,
    display_name: Option<LocalizedText>,
    #[serde(default)]
    types: Vec<String>,
    rating: Option<f64>,
    user_rating_count: Option<u32>,
    location: Option<LatLng>,
    price_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: String,
}

// ============================================================================
// Request Building and Response Parsing
// ============================================================================

/// Build the search-along-route request body.
///
/// `searchText` accepts a single `includedType`. With several types enabled
/// they only reach the server as the `textQuery` ("cafe or restaurant"); the
/// local type filter enforces them on the results.
///
/// The minimum rating is sent rounded down to the API's 0.5 step, so the
/// server never drops a place the local rating filter would keep.
pub fn build_search_along_route_request(
    route: &EncodedRoute,
    preferences: &DiscoveryPreferences,
    max_result_count: u32,
    language_code: Option<&str>,
) -> SearchTextRequest {
    let types = preferences.effective_place_types();
    let text_query = types
        .iter()
        .map(|t| t.replace('_', " "))
        .collect::<Vec<_>>()
        .join(" or ");
    let included_type = match types.as_slice() {
        [only] => Some(only.to_string()),
        _ => None,
    };
    let min_rating = (preferences.minimum_rating() > 0.0)
        .then(|| (preferences.minimum_rating() * 2.0).floor() / 2.0)
        .filter(|r| *r > 0.0);

    SearchTextRequest {
        text_query,
        included_type,
        min_rating,
        max_result_count,
        language_code: language_code.map(str::to_string),
        search_along_route_parameters: SearchAlongRouteParameters {
            polyline: ApiPolyline {
                encoded_polyline: route.as_str().to_string(),
            },
        },
    }
}

/// Build the nearby-search request body for one place type.
pub fn build_nearby_request(
    center: LatLng,
    radius_m: f64,
    place_type: &str,
    max_result_count: u32,
    language_code: Option<&str>,
) -> SearchNearbyRequest {
    SearchNearbyRequest {
        included_types: vec![place_type.to_string()],
        max_result_count,
        language_code: language_code.map(str::to_string),
        location_restriction: LocationRestriction {
            circle: Circle {
                center,
                radius: radius_m,
            },
        },
    }
}

/// Parse a response body.
///
/// With `require_places`, a body without places is an
/// [`SearchError::EmptyResponse`]; otherwise it is an empty success.
/// Places missing an id or location are skipped; if every listed place is
/// unusable the payload is malformed.
pub fn parse_places_response(
    body: &str,
    require_places: bool,
) -> Result<Vec<RawPlaceResult>, SearchError> {
    let response: PlacesResponse =
        serde_json::from_str(body).map_err(|e| SearchError::MalformedPayload {
            message: e.to_string(),
        })?;

    let api_places = response.places.unwrap_or_default();
    if api_places.is_empty() {
        return if require_places {
            Err(SearchError::EmptyResponse)
        } else {
            Ok(Vec::new())
        };
    }

    let listed = api_places.len();
    let places: Vec<RawPlaceResult> = api_places.into_iter().filter_map(to_raw_place).collect();

    if places.is_empty() {
        return Err(SearchError::MalformedPayload {
            message: format!("none of {} places had an id and location", listed),
        });
    }
    if places.len() < listed {
        debug!(
            "[PlacesClient] Skipped {} places without id or location",
            listed - places.len()
        );
    }

    Ok(places)
}

fn to_raw_place(place: ApiPlace) -> Option<RawPlaceResult> {
    let place_id = place.id.filter(|id| !id.is_empty())?;
    let location = place.location?;

    Some(RawPlaceResult {
        place_id,
        name: place.display_name.map(|n| n.text).unwrap_or_default(),
        types: place.types,
        rating: place.rating,
        rating_count: place.user_rating_count.unwrap_or(0),
        location,
        price_level: place.price_level.as_deref().and_then(price_level_value),
    })
}

/// Map the API's price level enum to 0 (free) through 4 (very expensive).
pub fn price_level_value(level: &str) -> Option<u8> {
    match level {
        "PRICE_LEVEL_FREE" => Some(0),
        "PRICE_LEVEL_INEXPENSIVE" => Some(1),
        "PRICE_LEVEL_MODERATE" => Some(2),
        "PRICE_LEVEL_EXPENSIVE" => Some(3),
        "PRICE_LEVEL_VERY_EXPENSIVE" => Some(4),
        _ => None,
    }
}

// ============================================================================
// Client
// ============================================================================

/// Places API client implementing both search collaborators.
pub struct GooglePlacesClient {
    client: Client,
    config: PlacesClientConfig,
}

impl GooglePlacesClient {
    /// Create a new client. Credentials come only from `config`.
    pub fn new(config: PlacesClientConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SearchError::Client {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PlacesClientConfig {
        &self.config
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
        require_places: bool,
    ) -> Result<Vec<RawPlaceResult>, SearchError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Api-Key", &self.config.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            let message: String = text.chars().take(MAX_ERROR_BODY).collect();
            warn!("[PlacesClient] {} returned HTTP {}", endpoint, status);
            return Err(SearchError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        let places = parse_places_response(&text, require_places)?;
        debug!(
            "[PlacesClient] {}: {} places in {:?}",
            endpoint,
            places.len(),
            start.elapsed()
        );
        Ok(places)
    }
}

fn request_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else if e.is_decode() {
        SearchError::MalformedPayload {
            message: e.to_string(),
        }
    } else {
        SearchError::Transport {
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl RouteSearch for GooglePlacesClient {
    async fn search_along_route(
        &self,
        route: &EncodedRoute,
        preferences: &DiscoveryPreferences,
    ) -> Result<Vec<RawPlaceResult>, SearchError> {
        let body = build_search_along_route_request(
            route,
            preferences,
            self.config.max_result_count,
            self.config.language_code.as_deref(),
        );
        info!(
            "[PlacesClient] Search along route: {} polyline chars, query '{}'",
            route.as_str().len(),
            body.text_query
        );
        self.post("places:searchText", &body, true).await
    }
}

#[async_trait]
impl NearbySearch for GooglePlacesClient {
    async fn search_nearby(
        &self,
        center: LatLng,
        radius_m: f64,
        place_type: &str,
    ) -> Result<Vec<RawPlaceResult>, SearchError> {
        let body = build_nearby_request(
            center,
            radius_m,
            place_type,
            self.config.max_result_count,
            self.config.language_code.as_deref(),
        );
        self.post("places:searchNearby", &body, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{polyline, RoutePoint};
    use serde_json::json;

    fn route() -> EncodedRoute {
        polyline::encode(&[
            RoutePoint::new(51.5074, -0.1278, 0),
            RoutePoint::new(51.5090, -0.1300, 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_search_along_route_body() {
        let prefs = DiscoveryPreferences::new(["tourist_attraction", "cafe"], 3.7, false).unwrap();
        let body = build_search_along_route_request(&route(), &prefs, 20, Some("en"));
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["textQuery"], json!("cafe or tourist attraction"));
        assert!(value.get("includedType").is_none());
        assert_eq!(value["minRating"], json!(3.5));
        assert_eq!(value["maxResultCount"], json!(20));
        assert_eq!(value["languageCode"], json!("en"));
        assert_eq!(
            value["searchAlongRouteParameters"]["polyline"]["encodedPolyline"],
            json!(route().as_str())
        );
    }

    #[test]
    fn test_single_type_sets_included_type() {
        let prefs = DiscoveryPreferences::new(["museum"], 0.0, false).unwrap();
        let body = build_search_along_route_request(&route(), &prefs, 10, None);
        assert_eq!(body.included_type.as_deref(), Some("museum"));
        assert_eq!(body.min_rating, None);
        assert_eq!(body.language_code, None);
    }

    #[test]
    fn test_min_rating_below_first_step_is_omitted() {
        let prefs = DiscoveryPreferences::new(["museum"], 0.3, false).unwrap();
        let body = build_search_along_route_request(&route(), &prefs, 10, None);
        assert_eq!(body.min_rating, None);
    }

    #[test]
    fn test_nearby_body() {
        let body = build_nearby_request(LatLng::new(51.5, -0.12), 500.0, "park", 20, None);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["includedTypes"], json!(["park"]));
        assert_eq!(value["locationRestriction"]["circle"]["radius"], json!(500.0));
        assert_eq!(
            value["locationRestriction"]["circle"]["center"],
            json!({"latitude": 51.5, "longitude": -0.12})
        );
    }

    #[test]
    fn test_parse_places() {
        let body = json!({
            "places": [
                {
                    "id": "ChIJ1",
                    "displayName": {"text": "Dishoom", "languageCode": "en"},
                    "types": ["indian_restaurant", "restaurant"],
                    "rating": 4.7,
                    "userRatingCount": 15000,
                    "location": {"latitude": 51.5136, "longitude": -0.1365},
                    "priceLevel": "PRICE_LEVEL_MODERATE"
                },
                {
                    "id": "ChIJ2",
                    "location": {"latitude": 51.5, "longitude": -0.1}
                },
                {
                    "displayName": {"text": "No id"}
                }
            ]
        })
        .to_string();

        let places = parse_places_response(&body, true).unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].name, "Dishoom");
        assert_eq!(places[0].primary_type(), Some("indian_restaurant"));
        assert_eq!(places[0].rating_count, 15000);
        assert_eq!(places[0].price_level, Some(2));
        assert_eq!(places[1].rating, None);
        assert!(places[1].types.is_empty());
    }

    #[test]
    fn test_parse_empty_and_malformed() {
        assert_eq!(
            parse_places_response("{}", true),
            Err(SearchError::EmptyResponse)
        );
        assert_eq!(
            parse_places_response(r#"{"places": []}"#, true),
            Err(SearchError::EmptyResponse)
        );
        assert_eq!(parse_places_response("{}", false), Ok(vec![]));
        assert!(matches!(
            parse_places_response("<html>", false),
            Err(SearchError::MalformedPayload { .. })
        ));
        assert!(matches!(
            parse_places_response(r#"{"places": [{"name": "x"}]}"#, false),
            Err(SearchError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_price_levels() {
        assert_eq!(price_level_value("PRICE_LEVEL_FREE"), Some(0));
        assert_eq!(price_level_value("PRICE_LEVEL_VERY_EXPENSIVE"), Some(4));
        assert_eq!(price_level_value("PRICE_LEVEL_UNSPECIFIED"), None);
    }
}
