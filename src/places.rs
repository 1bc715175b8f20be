//! Search collaborators.
//!
//! The pipeline never talks to the network directly. It is handed one
//! implementation of each trait, normally both backed by the same
//! [`GooglePlacesClient`](crate::GooglePlacesClient), and fakes in tests.

use async_trait::async_trait;

use crate::{DiscoveryPreferences, EncodedRoute, LatLng, RawPlaceResult, SearchError};

/// Places search along an encoded route.
#[async_trait]
pub trait RouteSearch: Send + Sync {
    /// Issue exactly one request for the whole route.
    ///
    /// Must not retry: any failure, including an empty result set, is
    /// returned as a [`SearchError`] so the caller can fall back.
    async fn search_along_route(
        &self,
        route: &EncodedRoute,
        preferences: &DiscoveryPreferences,
    ) -> Result<Vec<RawPlaceResult>, SearchError>;
}

/// Radius search around a single point for a single place type.
#[async_trait]
pub trait NearbySearch: Send + Sync {
    /// An empty result is a success.
    async fn search_nearby(
        &self,
        center: LatLng,
        radius_m: f64,
        place_type: &str,
    ) -> Result<Vec<RawPlaceResult>, SearchError>;
}
