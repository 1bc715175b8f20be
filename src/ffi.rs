//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose discovery to Kotlin
//! and Swift. The mobile shell persists discoveries itself, so nothing here
//! writes to storage.

use std::collections::HashSet;
use std::sync::Arc;

use log::{info, warn};

use crate::{
    geo_utils, init_logging, polyline, Discovery, DiscoveryConfig, DiscoveryPipeline,
    DiscoveryPreferences, DiscoveryRequest, DiscoverySource, GooglePlacesClient, LatLng,
    PlacesClientConfig, RoutePoint,
};

// ============================================================================
// Geometry
// ============================================================================

/// Encode a route as a polyline. Returns None if any point is invalid.
#[uniffi::export]
pub fn ffi_encode_route(points: Vec<RoutePoint>) -> Option<String> {
    init_logging();
    match polyline::encode(&points) {
        Ok(encoded) => Some(encoded.into_string()),
        Err(e) => {
            warn!("[RouteDiscoveryRust] encode_route rejected: {}", e);
            None
        }
    }
}

/// Route length in meters.
#[uniffi::export]
pub fn ffi_route_length(points: Vec<RoutePoint>) -> f64 {
    geo_utils::route_length(&points)
}

/// Arithmetic mean of the route's coordinates.
#[uniffi::export]
pub fn ffi_route_centroid(points: Vec<RoutePoint>) -> Option<LatLng> {
    geo_utils::centroid(&points)
}

// ============================================================================
// Discovery
// ============================================================================

/// Preferences as sent by the app.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiscoveryPreferences {
    pub enabled_place_types: Vec<String>,
    pub minimum_rating: f64,
    pub use_all_types: bool,
}

/// Result of a discovery run.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDiscoveryResult {
    pub discoveries: Vec<Discovery>,
    pub source: Option<DiscoverySource>,
    pub route_length_m: f64,
    /// Fallback place types whose requests failed
    pub failed_place_types: Vec<String>,
    /// Set when the run failed outright
    pub error: Option<String>,
}

impl FfiDiscoveryResult {
    fn failed(error: String) -> Self {
        Self {
            discoveries: Vec::new(),
            source: None,
            route_length_m: 0.0,
            failed_place_types: Vec::new(),
            error: Some(error),
        }
    }
}

/// Run discovery for a completed journey.
///
/// Blocks on a private tokio runtime. Errors are reported in
/// `FfiDiscoveryResult::error` rather than thrown: discovery is best effort.
#[uniffi::export]
pub fn discover_places(
    api_key: String,
    journey_id: String,
    points: Vec<RoutePoint>,
    preferences: FfiDiscoveryPreferences,
    known_place_ids: Vec<String>,
) -> FfiDiscoveryResult {
    use tokio::runtime::Runtime;

    init_logging();
    info!(
        "[RouteDiscoveryRust] discover_places called for {} with {} points",
        journey_id,
        points.len()
    );

    let preferences = match DiscoveryPreferences::new(
        preferences.enabled_place_types,
        preferences.minimum_rating,
        preferences.use_all_types,
    ) {
        Ok(p) => p,
        Err(e) => return FfiDiscoveryResult::failed(e.to_string()),
    };

    let client = match GooglePlacesClient::new(PlacesClientConfig::new(api_key)) {
        Ok(c) => Arc::new(c),
        Err(e) => return FfiDiscoveryResult::failed(e.to_string()),
    };

    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            warn!("Failed to create tokio runtime: {}", e);
            return FfiDiscoveryResult::failed(format!("Runtime error: {}", e));
        }
    };

    let pipeline = match DiscoveryPipeline::new(client.clone(), client, DiscoveryConfig::default())
    {
        Ok(p) => p,
        Err(e) => return FfiDiscoveryResult::failed(e.to_string()),
    };
    let request = DiscoveryRequest {
        journey_id,
        route: points,
        preferences,
        known_place_ids: known_place_ids.into_iter().collect::<HashSet<_>>(),
    };

    match rt.block_on(pipeline.run(&request)) {
        Ok(outcome) => FfiDiscoveryResult {
            discoveries: outcome.discoveries,
            source: outcome.source,
            route_length_m: outcome.route_length_m,
            failed_place_types: outcome
                .fallback_failures
                .into_iter()
                .map(|f| f.place_type)
                .collect(),
            error: None,
        },
        Err(e) => {
            warn!("[RouteDiscoveryRust] discover_places failed: {}", e);
            FfiDiscoveryResult::failed(e.to_string())
        }
    }
}
