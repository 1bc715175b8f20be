//! Center-point fallback search.
//!
//! One nearby request per effective place type, all scoped to a fixed radius
//! around the route centroid. Requests are issued together and joined before
//! results are merged in place-type order, so output order does not depend on
//! which request finished first.

use futures::future::join_all;
use log::{debug, info, warn};

use crate::{DiscoveryPreferences, LatLng, NearbySearch, RawPlaceResult, SearchError};

/// A place type whose nearby request failed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceTypeFailure {
    pub place_type: String,
    pub error: SearchError,
}

/// Union of the successful nearby requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CenterPointResults {
    /// Raw places, grouped by place type in request order
    pub places: Vec<RawPlaceResult>,
    /// Number of requests issued
    pub attempted: usize,
    /// Requests that failed; the rest contributed to `places`
    pub failures: Vec<PlaceTypeFailure>,
}

impl CenterPointResults {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }
}

/// Search around `center` for every effective place type.
///
/// Partial failure is tolerated: failed types are logged and reported in
/// [`CenterPointResults::failures`]. Only when every request fails is the
/// whole search an error ([`SearchError::AllRequestsFailed`]).
pub async fn search_center_point(
    client: &dyn NearbySearch,
    center: LatLng,
    preferences: &DiscoveryPreferences,
    radius_m: f64,
) -> Result<CenterPointResults, SearchError> {
    let place_types = preferences.effective_place_types();

    info!(
        "[Fallback] Searching {} place types within {:.0}m of ({:.5}, {:.5})",
        place_types.len(),
        radius_m,
        center.latitude,
        center.longitude
    );

    let requests = place_types
        .iter()
        .map(|place_type| client.search_nearby(center, radius_m, place_type));
    let responses = join_all(requests).await;

    let mut results = CenterPointResults {
        attempted: place_types.len(),
        ..Default::default()
    };

    for (place_type, response) in place_types.iter().zip(responses) {
        match response {
            Ok(places) => {
                debug!("[Fallback] {}: {} places", place_type, places.len());
                results.places.extend(places);
            }
            Err(error) => {
                warn!("[Fallback] {} search failed: {}", place_type, error);
                results.failures.push(PlaceTypeFailure {
                    place_type: place_type.to_string(),
                    error,
                });
            }
        }
    }

    if results.attempted > 0 && results.succeeded() == 0 {
        let failed = results.failures.len();
        let first = results.failures.swap_remove(0).error;
        return Err(SearchError::AllRequestsFailed {
            failed,
            first: Box::new(first),
        });
    }

    info!(
        "[Fallback] {}/{} requests succeeded, {} places",
        results.succeeded(),
        results.attempted,
        results.places.len()
    );

    Ok(results)
}
