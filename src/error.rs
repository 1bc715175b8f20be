//! Unified error handling for the route-discovery library.
//!
//! Discovery failures fall into three families with different recovery rules:
//! - [`InvalidCoordinateError`] is fatal and aborts before any network call.
//! - [`SearchError`] is recoverable: a failed route search hands over to the
//!   center-point fallback, and failed fallback sub-requests are tolerated.
//! - [`StorageError`] is surfaced to the caller and never retried here.
//!
//! [`DiscoveryError`] is what a full discovery run returns.

use thiserror::Error;

/// A route point outside the WGS84 coordinate range (or non-finite).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid coordinate at point {index}: ({latitude}, {longitude})")]
pub struct InvalidCoordinateError {
    /// Position of the first offending point in the route
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
}

/// Failure of a single places search request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// Connection, TLS or body transfer failure
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The caller-supplied request timeout elapsed
    #[error("request timed out")]
    Timeout,
    /// Non-2xx response
    #[error("HTTP error ({status_code}): {message}")]
    Status { status_code: u16, message: String },
    /// The response body could not be interpreted
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },
    /// The response carried no places at all
    #[error("empty response")]
    EmptyResponse,
    /// Every sub-request of a fan-out failed
    #[error("all {failed} requests failed, first error: {first}")]
    AllRequestsFailed {
        failed: usize,
        first: Box<SearchError>,
    },
    /// The HTTP client could not be constructed
    #[error("client error: {message}")]
    Client { message: String },
}

/// Failure while persisting discoveries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("storage backend error: {message}")]
    Backend { message: String },
    #[error("serialization error: {message}")]
    Serialization { message: String },
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },
}

/// Error returned by a discovery run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiscoveryError {
    /// A route point is malformed; nothing was searched
    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinateError),
    /// The route has no points to search around
    #[error("route has {point_count} points, minimum {minimum_required} required")]
    InsufficientPoints {
        point_count: usize,
        minimum_required: usize,
    },
    /// Preferences were rejected at the boundary
    #[error("invalid preferences: {message}")]
    InvalidPreferences { message: String },
    /// Discovery configuration is out of range or malformed
    #[error("configuration error: {message}")]
    InvalidConfig { message: String },
    /// Every network request attempted by both strategies failed
    #[error("search exhausted: {fallback}")]
    SearchExhausted {
        /// Error from the route search, if it was attempted
        primary: Option<SearchError>,
        /// Error from the center-point fallback
        fallback: SearchError,
    },
    /// Persisting the processed batch failed
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Generic internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for route-discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Extension trait for converting Option to DiscoveryError.
pub trait OptionExt<T> {
    /// Convert Option to Result with insufficient points error.
    fn ok_or_insufficient_points(self, point_count: usize, minimum: usize) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(self, point_count: usize, minimum: usize) -> Result<T> {
        self.ok_or(DiscoveryError::InsufficientPoints {
            point_count,
            minimum_required: minimum,
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| DiscoveryError::Internal {
            message: message.to_string(),
        })
    }
}
