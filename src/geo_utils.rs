//! # Geographic Utilities
//!
//! Route geometry used to decide and prepare a discovery search.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two coordinates |
//! | [`route_length`] | Total length of a route in meters |
//! | [`centroid`] | Arithmetic mean of a route's coordinates |
//! | [`is_eligible_for_route_search`] | Minimum-length check for search along route |
//! | [`simplify_for_search`] | Bound the point count of a route before encoding |
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a spherical Earth (geo's mean radius,
//! 6,371,008.8 m). The centroid is a plain mean of latitudes and longitudes.
//! That is not the geodesic center, but on walking-scale routes the error is
//! far below the 500 m fallback radius. It is wrong for routes crossing the
//! antimeridian, which walks do not.

use geo::{Coord, Distance, Haversine, LineString, Point, SimplifyIdx};

use crate::{LatLng, RoutePoint};

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two coordinates in meters.
///
/// # Example
///
/// ```rust
/// use route_discovery::{geo_utils, LatLng};
///
/// let london = LatLng::new(51.5074, -0.1278);
/// let paris = LatLng::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &LatLng, p2: &LatLng) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Total length of a route in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// routes return 0.0.
pub fn route_length(points: &[RoutePoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0].location(), &w[1].location()))
        .sum()
}

/// Arithmetic mean of all coordinates, or `None` for an empty route.
pub fn centroid(points: &[RoutePoint]) -> Option<LatLng> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let (lat_sum, lng_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.latitude, lng + p.longitude));

    Some(LatLng::new(lat_sum / n, lng_sum / n))
}

/// Whether a route is long enough to search along. The threshold is inclusive.
#[inline]
pub fn is_eligible_for_route_search(length_m: f64, min_length_m: f64) -> bool {
    length_m >= min_length_m
}

// =============================================================================
// Simplification
// =============================================================================

/// Reduce a route to at most `max_points` points for encoding.
///
/// Routes already within the limit are returned unchanged. Longer routes are
/// simplified with Douglas-Peucker (`tolerance` in degrees), then uniformly
/// sampled if still too long. The first and last points are always kept.
pub fn simplify_for_search(
    points: &[RoutePoint],
    tolerance: f64,
    max_points: usize,
) -> Vec<RoutePoint> {
    if points.len() <= max_points || max_points < 2 {
        return points.to_vec();
    }

    let line: LineString = points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    let kept: Vec<usize> = line.simplify_idx(&tolerance);
    if kept.len() <= max_points {
        return kept.into_iter().map(|i| points[i]).collect();
    }

    // Uniform sampling over the simplified indices
    let step = (kept.len() - 1) as f64 / (max_points - 1) as f64;
    (0..max_points)
        .map(|i| {
            let idx = ((i as f64 * step).round() as usize).min(kept.len() - 1);
            points[kept[idx]]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_route() -> Vec<RoutePoint> {
        vec![
            RoutePoint::new(51.5074, -0.1278, 0),
            RoutePoint::new(51.5080, -0.1290, 10_000),
            RoutePoint::new(51.5090, -0.1300, 20_000),
        ]
    }

    #[test]
    fn test_route_length_sums_segments() {
        let route = sample_route();
        let expected = haversine_distance(&route[0].location(), &route[1].location())
            + haversine_distance(&route[1].location(), &route[2].location());
        assert!((route_length(&route) - expected).abs() < 1e-9);
        assert!(route_length(&route) > 100.0);
    }

    #[test]
    fn test_route_length_short_inputs() {
        assert_eq!(route_length(&[]), 0.0);
        assert_eq!(route_length(&sample_route()[..1]), 0.0);
    }

    #[test]
    fn test_centroid_is_arithmetic_mean() {
        let route = vec![
            RoutePoint::new(10.0, 20.0, 0),
            RoutePoint::new(12.0, 22.0, 1),
            RoutePoint::new(14.0, 27.0, 2),
        ];
        let c = centroid(&route).unwrap();
        assert!((c.latitude - 12.0).abs() < 1e-12);
        assert!((c.longitude - 23.0).abs() < 1e-12);
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_eligibility_boundary_inclusive() {
        assert!(is_eligible_for_route_search(50.0, 50.0));
        assert!(!is_eligible_for_route_search(49.999, 50.0));
        assert!(is_eligible_for_route_search(120.0, 50.0));
    }

    #[test]
    fn test_simplify_keeps_short_routes() {
        let route = sample_route();
        assert_eq!(simplify_for_search(&route, 0.0001, 10), route);
    }

    #[test]
    fn test_simplify_bounds_point_count() {
        // Straight line north with a wiggle every 50th point
        let route: Vec<RoutePoint> = (0..2000)
            .map(|i| {
                let wiggle = if i % 50 == 0 { 0.0005 } else { 0.0 };
                RoutePoint::new(51.5 + i as f64 * 0.00001, -0.12 + wiggle, i)
            })
            .collect();

        let simplified = simplify_for_search(&route, 0.00001, 30);
        assert!(simplified.len() <= 30);
        assert_eq!(simplified.first(), route.first());
        assert_eq!(simplified.last(), route.last());
        // Order preserved
        assert!(simplified
            .windows(2)
            .all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    }
}
