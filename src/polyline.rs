//! # Encoded Polylines
//!
//! GPS traces in the Encoded Polyline Algorithm Format used by the Google Maps
//! Platform, at 5 decimal places. The output is sent to the Places API
//! verbatim. Encoding and decoding go through the `polyline` crate, which
//! rounds half away from zero like the reference JavaScript encoder.
//!
//! `geo` line strings are `(x, y) = (lng, lat)`; the encoded format is
//! latitude first. The conversion happens here and nowhere else.
//!
//! Reference: <https://developers.google.com/maps/documentation/utilities/polylinealgorithm>

use std::fmt;

use geo::{Coord, LineString};
use ::polyline::errors::PolylineError;

use crate::{InvalidCoordinateError, LatLng, RoutePoint};

const PRECISION: u32 = 5;

/// An encoded polyline string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedRoute(String);

impl EncodedRoute {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EncodedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error decoding a polyline string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid character at byte {position}")]
    InvalidCharacter { position: usize },
    #[error("polyline ends before the longitude of the point at byte {position}")]
    Truncated { position: usize },
    #[error("decoded coordinate at byte {position} is out of range")]
    OutOfRange { position: usize },
    #[error("polyline decoding failed: {message}")]
    Other { message: String },
}

impl From<PolylineError> for DecodeError {
    fn from(e: PolylineError) -> Self {
        match e {
            PolylineError::DecodeError { idx } => DecodeError::InvalidCharacter { position: idx },
            PolylineError::NoLongError { idx } => DecodeError::Truncated { position: idx },
            PolylineError::LatitudeCoordError { idx, .. }
            | PolylineError::LongitudeCoordError { idx, .. } => {
                DecodeError::OutOfRange { position: idx }
            }
            other => DecodeError::Other {
                message: other.to_string(),
            },
        }
    }
}

/// Check every point is inside the WGS84 range, reporting the first that is not.
pub fn validate(points: &[RoutePoint]) -> Result<(), InvalidCoordinateError> {
    match points.iter().position(|p| !p.is_valid()) {
        Some(index) => Err(invalid_at(points, index)),
        None => Ok(()),
    }
}

/// Encode a route as a polyline string.
///
/// Fails without producing output if any point is out of range.
///
/// # Example
/// ```
/// use route_discovery::{polyline, RoutePoint};
///
/// let route = vec![
///     RoutePoint::new(38.5, -120.2, 0),
///     RoutePoint::new(40.7, -120.95, 0),
///     RoutePoint::new(43.252, -126.453, 0),
/// ];
/// let encoded = polyline::encode(&route).unwrap();
/// assert_eq!(encoded.as_str(), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
/// ```
pub fn encode(points: &[RoutePoint]) -> Result<EncodedRoute, InvalidCoordinateError> {
    validate(points)?;

    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    ::polyline::encode_coordinates(line, PRECISION)
        .map(EncodedRoute)
        .map_err(|e| match e {
            PolylineError::LatitudeCoordError { idx, .. }
            | PolylineError::LongitudeCoordError { idx, .. }
            | PolylineError::CoordEncodingError { idx, .. } => invalid_at(points, idx),
            // Every point passed validation; report the first
            _ => invalid_at(points, 0),
        })
}

/// Decode a polyline string back into coordinates at 1e-5 precision.
pub fn decode(encoded: &str) -> Result<Vec<LatLng>, DecodeError> {
    let line = ::polyline::decode_polyline(encoded, PRECISION)?;
    Ok(line
        .coords()
        .map(|c| LatLng::new(c.y, c.x))
        .collect())
}

fn invalid_at(points: &[RoutePoint], index: usize) -> InvalidCoordinateError {
    let (latitude, longitude) = points
        .get(index)
        .map_or((f64::NAN, f64::NAN), |p| (p.latitude, p.longitude));
    InvalidCoordinateError {
        index,
        latitude,
        longitude,
    }
}
