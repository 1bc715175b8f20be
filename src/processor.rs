//! Result processing: raw place results to discoveries.
//!
//! Steps, in order:
//! 1. Deduplicate by place id; the first occurrence wins and keeps its position
//! 2. Drop places the user already saved or dismissed
//! 3. Drop places rated below the minimum (unrated places pass)
//! 4. Drop places whose primary type (first listed) is not enabled,
//!    unless all types are enabled
//!
//! No sorting happens here; output order is first-appearance order.

use std::collections::HashSet;

use log::debug;

use crate::{Discovery, DiscoveryPreferences, DiscoverySource, RawPlaceResult};

/// Primary type recorded for places that list no types.
const UNKNOWN_TYPE: &str = "point_of_interest";

/// Turns the raw results of one discovery run into discoveries.
#[derive(Debug, Clone)]
pub struct ResultProcessor {
    journey_id: String,
    source: DiscoverySource,
    discovered_at: i64,
}

impl ResultProcessor {
    /// `discovered_at` is stamped on every discovery (Unix millis).
    pub fn new(journey_id: impl Into<String>, source: DiscoverySource, discovered_at: i64) -> Self {
        Self {
            journey_id: journey_id.into(),
            source,
            discovered_at,
        }
    }

    pub fn process(
        &self,
        raw_results: &[RawPlaceResult],
        preferences: &DiscoveryPreferences,
        known_place_ids: &HashSet<String>,
    ) -> Vec<Discovery> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(raw_results.len());
        let mut discoveries = Vec::new();
        let mut dropped_known = 0usize;
        let mut dropped_rating = 0usize;
        let mut dropped_type = 0usize;

        for place in raw_results {
            if place.place_id.is_empty() || !seen.insert(place.place_id.as_str()) {
                continue;
            }
            if known_place_ids.contains(&place.place_id) {
                dropped_known += 1;
                continue;
            }
            if !preferences.accepts_rating(place.rating) {
                dropped_rating += 1;
                continue;
            }
            if !preferences.accepts_type(place.primary_type()) {
                dropped_type += 1;
                continue;
            }
            discoveries.push(self.to_discovery(place));
        }

        debug!(
            "[Processor] {} raw -> {} unique -> {} kept (known: {}, rating: {}, type: {})",
            raw_results.len(),
            seen.len(),
            discoveries.len(),
            dropped_known,
            dropped_rating,
            dropped_type
        );

        discoveries
    }

    fn to_discovery(&self, place: &RawPlaceResult) -> Discovery {
        Discovery {
            id: Discovery::make_id(&self.journey_id, &place.place_id),
            journey_id: self.journey_id.clone(),
            place_id: place.place_id.clone(),
            name: place.name.clone(),
            primary_type: place.primary_type().unwrap_or(UNKNOWN_TYPE).to_string(),
            types: place.types.clone(),
            rating: place.rating,
            location: place.location,
            discovery_source: self.source,
            discovered_at: self.discovered_at,
        }
    }
}
