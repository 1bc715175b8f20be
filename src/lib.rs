//! # Route Discovery
//!
//! Place discovery along recorded GPS walks.
//!
//! This library provides:
//! - Polyline encoding of GPS traces for search-along-route queries
//! - Route length, centroid and eligibility checks
//! - A two-strategy discovery pipeline: search along the route, falling back
//!   to per-type radius searches around the route centroid
//! - Deduplication and preference filtering of place results
//!
//! ## Features
//!
//! - **`http`** (default) - Places API client built on reqwest
//! - **`persistence`** - SQLite discovery store
//! - **`ffi`** - FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_discovery::{geo_utils, polyline, RoutePoint};
//!
//! let route = vec![
//!     RoutePoint::new(51.5074, -0.1278, 0),
//!     RoutePoint::new(51.5080, -0.1290, 15_000),
//!     RoutePoint::new(51.5090, -0.1300, 30_000),
//! ];
//!
//! let length = geo_utils::route_length(&route);
//! assert!(length > 50.0);
//!
//! let encoded = polyline::encode(&route).unwrap();
//! assert!(!encoded.as_str().is_empty());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{
    DiscoveryError, InvalidCoordinateError, OptionExt, Result, SearchError, StorageError,
};

// Polyline encoding for search-along-route requests
pub mod polyline;
pub use self::polyline::EncodedRoute;

// Geographic utilities (distance, length, centroid)
pub mod geo_utils;

// User discovery preferences and the place type catalog
pub mod preferences;
pub use preferences::{DiscoveryPreferences, SUPPORTED_PLACE_TYPES};

// Search collaborators
pub mod places;
pub use places::{NearbySearch, RouteSearch};

// Center-point fallback search
pub mod fallback;
pub use fallback::{search_center_point, CenterPointResults, PlaceTypeFailure};

// Result deduplication and filtering
pub mod processor;
pub use processor::ResultProcessor;

// Discovery state machine and orchestration
pub mod pipeline;
pub use pipeline::{
    DiscoveryConfig, DiscoveryEvent, DiscoveryOutcome, DiscoveryPipeline, DiscoveryRequest,
    DiscoveryService, DiscoveryState, ShortRoutePolicy,
};

// Discovery persistence
pub mod storage;
#[cfg(feature = "persistence")]
pub use storage::SqliteDiscoveryStore;
pub use storage::{DiscoveryStore, InMemoryDiscoveryStore};

// HTTP client for the Places API
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{GooglePlacesClient, PlacesClientConfig};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RouteDiscoveryRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A recorded GPS fix. Route order is temporal order.
///
/// # Example
/// ```
/// use route_discovery::RoutePoint;
/// let point = RoutePoint::new(51.5074, -0.1278, 1_700_000_000_000);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
}

impl RoutePoint {
    /// Create a new route point.
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Coordinates without the timestamp.
    pub fn location(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// A bare WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Which strategy produced a discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoverySource {
    SearchAlongRoute,
    CenterPointFallback,
}

impl DiscoverySource {
    /// Stable name used in persisted records.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoverySource::SearchAlongRoute => "SEARCH_ALONG_ROUTE",
            DiscoverySource::CenterPointFallback => "CENTER_POINT_FALLBACK",
        }
    }

    /// Parse a persisted source name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SEARCH_ALONG_ROUTE" => Some(DiscoverySource::SearchAlongRoute),
            "CENTER_POINT_FALLBACK" => Some(DiscoverySource::CenterPointFallback),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place as returned by a search request, before any filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlaceResult {
    pub place_id: String,
    pub name: String,
    /// Place types, most specific first
    pub types: Vec<String>,
    pub rating: Option<f64>,
    pub rating_count: u32,
    pub location: LatLng,
    /// 0 (free) to 4 (very expensive)
    pub price_level: Option<u8>,
}

impl RawPlaceResult {
    /// First-listed type, used as the place's category.
    pub fn primary_type(&self) -> Option<&str> {
        self.types.first().map(String::as_str)
    }
}

/// A processed place discovered on a completed journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    /// Document id, unique per journey and place
    pub id: String,
    pub journey_id: String,
    pub place_id: String,
    pub name: String,
    pub primary_type: String,
    pub types: Vec<String>,
    pub rating: Option<f64>,
    pub location: LatLng,
    pub discovery_source: DiscoverySource,
    /// Unix timestamp in milliseconds
    pub discovered_at: i64,
}

impl Discovery {
    /// Build the document id for a place discovered on a journey.
    pub fn make_id(journey_id: &str, place_id: &str) -> String {
        format!("{}_{}", journey_id, place_id)
    }
}

// ============================================================================
// Tests
// ============================================================================
