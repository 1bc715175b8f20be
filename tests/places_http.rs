//! Places client against a mock Places API.

use std::time::Duration;

use route_discovery::http::FIELD_MASK;
use route_discovery::{
    polyline, DiscoveryPreferences, EncodedRoute, GooglePlacesClient, LatLng, NearbySearch,
    PlacesClientConfig, RoutePoint, RouteSearch, SearchError,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_TEXT: &str = "/v1/places:searchText";
const SEARCH_NEARBY: &str = "/v1/places:searchNearby";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn client(server: &MockServer, timeout: Duration) -> GooglePlacesClient {
    init_logging();
    let mut config = PlacesClientConfig::new("test-key");
    config.base_url = format!("{}/v1", server.uri());
    config.request_timeout = timeout;
    GooglePlacesClient::new(config).unwrap()
}

fn places_body() -> Value {
    json!({
        "places": [
            {
                "id": "ChIJ-cafe",
                "displayName": { "text": "Corner Cafe", "languageCode": "en" },
                "types": ["cafe", "food", "establishment"],
                "rating": 4.4,
                "userRatingCount": 120,
                "location": { "latitude": 51.5076, "longitude": -0.1281 },
                "priceLevel": "PRICE_LEVEL_INEXPENSIVE"
            },
            {
                "id": "ChIJ-park",
                "displayName": { "text": "Riverside Park" },
                "types": ["park"],
                "location": { "latitude": 51.5081, "longitude": -0.1290 }
            }
        ]
    })
}

fn route() -> EncodedRoute {
    polyline::encode(&[
        RoutePoint::new(51.5074, -0.1278, 0),
        RoutePoint::new(51.5080, -0.1290, 30_000),
        RoutePoint::new(51.5090, -0.1300, 60_000),
    ])
    .unwrap()
}

fn cafe_prefs(minimum_rating: f64) -> DiscoveryPreferences {
    DiscoveryPreferences::new(["cafe"], minimum_rating, false).unwrap()
}

#[tokio::test]
async fn test_search_along_route_request_and_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_TEXT))
        .and(header("x-goog-api-key", "test-key"))
        .and(header_exists("x-goog-fieldmask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(places_body()))
        .expect(1)
        .mount(&server)
        .await;

    let places = client(&server, Duration::from_secs(5))
        .search_along_route(&route(), &cafe_prefs(4.0))
        .await
        .unwrap();

    assert_eq!(places.len(), 2);
    assert_eq!(places[0].place_id, "ChIJ-cafe");
    assert_eq!(places[0].name, "Corner Cafe");
    assert_eq!(places[0].primary_type(), Some("cafe"));
    assert_eq!(places[0].rating, Some(4.4));
    assert_eq!(places[0].rating_count, 120);
    assert_eq!(places[0].price_level, Some(1));
    assert_eq!(places[0].location, LatLng::new(51.5076, -0.1281));
    assert_eq!(places[1].rating, None);
    assert_eq!(places[1].rating_count, 0);

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    assert_eq!(
        request.headers.get("x-goog-fieldmask").unwrap().to_str().unwrap(),
        FIELD_MASK
    );
    let body: Value = request.body_json().unwrap();
    assert_eq!(
        body["searchAlongRouteParameters"]["polyline"]["encodedPolyline"],
        json!(route().as_str())
    );
    assert_eq!(body["textQuery"], json!("cafe"));
    assert_eq!(body["includedType"], json!("cafe"));
    assert_eq!(body["minRating"], json!(4.0));
}

#[tokio::test]
async fn test_search_along_route_empty_body_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_TEXT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .search_along_route(&route(), &cafe_prefs(0.0))
        .await
        .unwrap_err();

    assert_eq!(err, SearchError::EmptyResponse);
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_TEXT))
        .respond_with(ResponseTemplate::new(403).set_body_json(
            json!({"error": {"code": 403, "message": "API key not valid"}}),
        ))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .search_along_route(&route(), &cafe_prefs(0.0))
        .await
        .unwrap_err();

    match err {
        SearchError::Status {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 403);
            assert!(message.contains("API key not valid"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_service_unavailable_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_NEARBY))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .search_nearby(LatLng::new(51.5, -0.12), 500.0, "cafe")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SearchError::Status {
            status_code: 503,
            ..
        }
    ));
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_NEARBY))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .search_nearby(LatLng::new(51.5, -0.12), 500.0, "cafe")
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::MalformedPayload { .. }));
}

#[tokio::test]
async fn test_nearby_request_and_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_NEARBY))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({ "includedTypes": ["museum"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let places = client(&server, Duration::from_secs(5))
        .search_nearby(LatLng::new(51.5, -0.12), 500.0, "museum")
        .await
        .unwrap();
    assert!(places.is_empty());

    let requests = server.received_requests().await.unwrap();
    let body: Value = requests[0].body_json().unwrap();
    assert_eq!(
        body["locationRestriction"]["circle"],
        json!({
            "center": { "latitude": 51.5, "longitude": -0.12 },
            "radius": 500.0
        })
    );
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH_NEARBY))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(places_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_millis(200))
        .search_nearby(LatLng::new(51.5, -0.12), 500.0, "cafe")
        .await
        .unwrap_err();

    assert_eq!(err, SearchError::Timeout);
}
