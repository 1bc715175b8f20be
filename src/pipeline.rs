//! # Discovery Pipeline
//!
//! Runs one discovery pass for a completed journey:
//!
//! ```text
//! Eligible ──RouteQualified──▶ Searching ──SearchSucceeded──▶ Success(SearchAlongRoute)
//!    │                            │
//!    │ RouteTooShort              │ SearchFailed
//!    ▼                            ▼
//!    └──────────────────────▶ Fallback ──FallbackSucceeded──▶ Success(CenterPointFallback)
//!    │                            │
//!    │ RouteSkipped               │ FallbackEmpty
//!    ▼                            ▼
//!  Empty ◀────────────────────────┘
//! ```
//!
//! Route validation happens before `Eligible`; an invalid coordinate aborts the
//! run before any request. A failed route search is recoverable. If every
//! fallback request fails as well, the run ends with
//! [`DiscoveryError::SearchExhausted`].

use std::collections::HashSet;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::OptionExt;
use crate::fallback::{search_center_point, PlaceTypeFailure};
use crate::{
    geo_utils, polyline, Discovery, DiscoveryError, DiscoveryPreferences, DiscoverySource,
    DiscoveryStore, NearbySearch, RawPlaceResult, Result, ResultProcessor, RouteSearch,
    RoutePoint, SearchError,
};

// ============================================================================
// Configuration
// ============================================================================

/// What to do with routes too short to search along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortRoutePolicy {
    /// Search around the route centroid instead
    #[default]
    CenterPointFallback,
    /// Produce no discoveries
    Skip,
}

/// Configuration for discovery runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Minimum route length for search along route (inclusive).
    /// Default: 50.0 meters
    pub min_route_length_m: f64,

    /// Radius of each center-point fallback request.
    /// Default: 500.0 meters
    pub fallback_radius_m: f64,

    /// Handling of routes below `min_route_length_m`.
    /// Default: CenterPointFallback
    pub short_route_policy: ShortRoutePolicy,

    /// Maximum points sent in the encoded polyline.
    /// Longer routes are simplified first. Default: 1000
    pub max_route_points: usize,

    /// Douglas-Peucker tolerance used when simplifying (in degrees).
    /// Default: 0.00001 (~1 meter)
    pub simplification_tolerance: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_route_length_m: 50.0,
            fallback_radius_m: 500.0,
            short_route_policy: ShortRoutePolicy::CenterPointFallback,
            max_route_points: 1000,
            simplification_tolerance: 0.00001,
        }
    }
}

impl DiscoveryConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| DiscoveryError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let problem = if !(self.min_route_length_m.is_finite() && self.min_route_length_m >= 0.0) {
            Some("min_route_length_m must be a non-negative number")
        } else if !(self.fallback_radius_m.is_finite() && self.fallback_radius_m > 0.0) {
            Some("fallback_radius_m must be positive")
        } else if self.max_route_points < 2 {
            Some("max_route_points must be at least 2")
        } else if !(self.simplification_tolerance.is_finite() && self.simplification_tolerance >= 0.0)
        {
            Some("simplification_tolerance must be a non-negative number")
        } else {
            None
        };

        match problem {
            Some(message) => Err(DiscoveryError::InvalidConfig {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// Discovery run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoveryState {
    /// Route validated and measured
    Eligible,
    /// Search along route in flight
    Searching,
    /// Center-point search in flight
    Fallback,
    /// Places found by the given strategy
    Success(DiscoverySource),
    /// No places found, or the route was skipped
    Empty,
}

/// Inputs that move a run between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryEvent {
    RouteQualified,
    RouteTooShort,
    RouteSkipped,
    SearchSucceeded,
    SearchFailed,
    FallbackSucceeded,
    FallbackEmpty,
}

impl DiscoveryState {
    /// Next state, or `None` if `event` is not valid in this state.
    pub fn on(self, event: DiscoveryEvent) -> Option<DiscoveryState> {
        use DiscoveryEvent::*;
        use DiscoveryState::*;

        match (self, event) {
            (Eligible, RouteQualified) => Some(Searching),
            (Eligible, RouteTooShort) => Some(Fallback),
            (Eligible, RouteSkipped) => Some(Empty),
            (Searching, SearchSucceeded) => Some(Success(DiscoverySource::SearchAlongRoute)),
            (Searching, SearchFailed) => Some(Fallback),
            (Fallback, FallbackSucceeded) => Some(Success(DiscoverySource::CenterPointFallback)),
            (Fallback, FallbackEmpty) => Some(Empty),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DiscoveryState::Success(_) | DiscoveryState::Empty)
    }
}

/// Current state plus every state visited.
struct StateTrail {
    current: DiscoveryState,
    visited: Vec<DiscoveryState>,
}

impl StateTrail {
    fn new() -> Self {
        Self {
            current: DiscoveryState::Eligible,
            visited: vec![DiscoveryState::Eligible],
        }
    }

    fn advance(&mut self, event: DiscoveryEvent) -> Result<DiscoveryState> {
        let next = self
            .current
            .on(event)
            .ok_or_internal(&format!("no transition from {:?} on {:?}", self.current, event))?;
        self.current = next;
        self.visited.push(next);
        Ok(next)
    }
}

// ============================================================================
// Requests and Outcomes
// ============================================================================

/// Inputs for one discovery run. Owned, so later changes to the caller's
/// preferences or saved places do not affect a run in progress.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub journey_id: String,
    pub route: Vec<RoutePoint>,
    pub preferences: DiscoveryPreferences,
    /// Saved and dismissed place ids
    pub known_place_ids: HashSet<String>,
}

/// Result of a discovery run.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOutcome {
    pub journey_id: String,
    pub discoveries: Vec<Discovery>,
    /// Strategy that produced the raw results; `None` when the run ended empty
    pub source: Option<DiscoverySource>,
    pub route_length_m: f64,
    /// States visited, starting at `Eligible`
    pub states: Vec<DiscoveryState>,
    /// Why search along route was abandoned, if it was attempted and failed
    pub primary_error: Option<SearchError>,
    /// Fallback place types whose requests failed
    pub fallback_failures: Vec<PlaceTypeFailure>,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Two-strategy discovery over injected search clients.
pub struct DiscoveryPipeline {
    route_search: Arc<dyn RouteSearch>,
    nearby_search: Arc<dyn NearbySearch>,
    config: DiscoveryConfig,
}

impl DiscoveryPipeline {
    /// Build a pipeline. Fails with `InvalidConfig` if `config` does not
    /// pass [`DiscoveryConfig::validate`].
    pub fn new(
        route_search: Arc<dyn RouteSearch>,
        nearby_search: Arc<dyn NearbySearch>,
        config: DiscoveryConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            route_search,
            nearby_search,
            config,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Run discovery for one journey. Nothing is persisted.
    pub async fn run(&self, request: &DiscoveryRequest) -> Result<DiscoveryOutcome> {
        let route = &request.route;
        let preferences = &request.preferences;

        polyline::validate(route)?;
        let centroid = geo_utils::centroid(route).ok_or_insufficient_points(route.len(), 1)?;
        let route_length_m = geo_utils::route_length(route);

        info!(
            "[Discovery] Journey {}: {} points, {:.0}m",
            request.journey_id,
            route.len(),
            route_length_m
        );

        let mut trail = StateTrail::new();
        let mut raw: Vec<RawPlaceResult> = Vec::new();
        let mut primary_error = None;
        let mut fallback_failures = Vec::new();

        let first = if geo_utils::is_eligible_for_route_search(
            route_length_m,
            self.config.min_route_length_m,
        ) {
            DiscoveryEvent::RouteQualified
        } else {
            match self.config.short_route_policy {
                ShortRoutePolicy::CenterPointFallback => DiscoveryEvent::RouteTooShort,
                ShortRoutePolicy::Skip => DiscoveryEvent::RouteSkipped,
            }
        };
        let mut state = trail.advance(first)?;

        while !state.is_terminal() {
            let event = match state {
                DiscoveryState::Searching => {
                    let points = geo_utils::simplify_for_search(
                        route,
                        self.config.simplification_tolerance,
                        self.config.max_route_points,
                    );
                    let encoded = polyline::encode(&points)?;

                    match self
                        .route_search
                        .search_along_route(&encoded, preferences)
                        .await
                    {
                        Ok(places) => {
                            raw = places;
                            DiscoveryEvent::SearchSucceeded
                        }
                        Err(e) => {
                            warn!(
                                "[Discovery] Search along route failed for {}: {}, falling back",
                                request.journey_id, e
                            );
                            primary_error = Some(e);
                            DiscoveryEvent::SearchFailed
                        }
                    }
                }
                DiscoveryState::Fallback => {
                    let results = search_center_point(
                        self.nearby_search.as_ref(),
                        centroid,
                        preferences,
                        self.config.fallback_radius_m,
                    )
                    .await
                    .map_err(|fallback| DiscoveryError::SearchExhausted {
                        primary: primary_error.clone(),
                        fallback,
                    })?;

                    fallback_failures = results.failures;
                    if results.places.is_empty() {
                        DiscoveryEvent::FallbackEmpty
                    } else {
                        raw = results.places;
                        DiscoveryEvent::FallbackSucceeded
                    }
                }
                other => {
                    return Err(DiscoveryError::Internal {
                        message: format!("unexpected non-terminal state {:?}", other),
                    })
                }
            };
            state = trail.advance(event)?;
        }

        let source = match state {
            DiscoveryState::Success(source) => Some(source),
            _ => None,
        };

        let discoveries = match source {
            Some(source) => ResultProcessor::new(
                request.journey_id.as_str(),
                source,
                chrono::Utc::now().timestamp_millis(),
            )
            .process(&raw, preferences, &request.known_place_ids),
            None => Vec::new(),
        };

        info!(
            "[Discovery] Journey {}: {} discoveries via {}",
            request.journey_id,
            discoveries.len(),
            source.map_or("none", |s| s.as_str())
        );

        Ok(DiscoveryOutcome {
            journey_id: request.journey_id.clone(),
            discoveries,
            source,
            route_length_m,
            states: trail.visited,
            primary_error,
            fallback_failures,
        })
    }
}

/// Pipeline plus persistence of the processed batch.
pub struct DiscoveryService {
    pipeline: DiscoveryPipeline,
    store: Arc<dyn DiscoveryStore>,
}

impl DiscoveryService {
    pub fn new(pipeline: DiscoveryPipeline, store: Arc<dyn DiscoveryStore>) -> Self {
        Self { pipeline, store }
    }

    /// Run discovery and persist the whole batch in one call.
    ///
    /// Storage failures are returned as-is, never retried.
    pub async fn discover(&self, request: &DiscoveryRequest) -> Result<DiscoveryOutcome> {
        let outcome = self.pipeline.run(request).await?;
        self.store
            .persist(&outcome.discoveries, &request.journey_id)
            .await?;
        Ok(outcome)
    }
}
