//! User discovery preferences.
//!
//! Preferences arrive from the app as JSON (`enabledPlaceTypes`,
//! `minimumRating`, `useAllTypes`). They are validated when deserialized:
//! unknown fields, unknown place types and out-of-range ratings are rejected
//! instead of being replaced by defaults.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::DiscoveryError;

/// Place types the discovery pipeline knows how to search for.
pub const SUPPORTED_PLACE_TYPES: &[&str] = &[
    "art_gallery",
    "bakery",
    "bar",
    "book_store",
    "cafe",
    "library",
    "museum",
    "park",
    "restaurant",
    "shopping_mall",
    "tourist_attraction",
    "zoo",
];

static SUPPORTED_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| SUPPORTED_PLACE_TYPES.iter().copied().collect());

/// Whether a place type is in the supported catalog.
pub fn is_supported_place_type(place_type: &str) -> bool {
    SUPPORTED_SET.contains(place_type)
}

/// Wire shape of the preferences document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PreferencesPayload {
    enabled_place_types: Vec<String>,
    minimum_rating: f64,
    use_all_types: bool,
}

/// Validated discovery preferences.
///
/// A snapshot: the pipeline owns its copy for the length of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PreferencesPayload")]
pub struct DiscoveryPreferences {
    enabled_place_types: BTreeSet<String>,
    minimum_rating: f64,
    use_all_types: bool,
}

impl TryFrom<PreferencesPayload> for DiscoveryPreferences {
    type Error = DiscoveryError;

    fn try_from(payload: PreferencesPayload) -> Result<Self, Self::Error> {
        Self::new(
            payload.enabled_place_types,
            payload.minimum_rating,
            payload.use_all_types,
        )
    }
}

impl DiscoveryPreferences {
    /// Validate and build preferences.
    ///
    /// Duplicate types collapse. At least one type is required unless
    /// `use_all_types` is set.
    pub fn new<I, S>(
        enabled_place_types: I,
        minimum_rating: f64,
        use_all_types: bool,
    ) -> Result<Self, DiscoveryError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !minimum_rating.is_finite() || !(0.0..=5.0).contains(&minimum_rating) {
            return Err(invalid(format!(
                "minimumRating must be within 0..=5, got {}",
                minimum_rating
            )));
        }

        let enabled_place_types: BTreeSet<String> =
            enabled_place_types.into_iter().map(Into::into).collect();

        if let Some(unknown) = enabled_place_types
            .iter()
            .find(|t| !is_supported_place_type(t))
        {
            return Err(invalid(format!("unsupported place type '{}'", unknown)));
        }

        if enabled_place_types.is_empty() && !use_all_types {
            return Err(invalid(
                "enabledPlaceTypes is empty and useAllTypes is false".to_string(),
            ));
        }

        Ok(Self {
            enabled_place_types,
            minimum_rating,
            use_all_types,
        })
    }

    /// Preferences that accept every supported type at any rating.
    pub fn all_types() -> Self {
        Self {
            enabled_place_types: BTreeSet::new(),
            minimum_rating: 0.0,
            use_all_types: true,
        }
    }

    /// Parse and validate the app's preferences JSON.
    pub fn from_json(json: &str) -> Result<Self, DiscoveryError> {
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))
    }

    pub fn enabled_place_types(&self) -> &BTreeSet<String> {
        &self.enabled_place_types
    }

    pub fn minimum_rating(&self) -> f64 {
        self.minimum_rating
    }

    pub fn use_all_types(&self) -> bool {
        self.use_all_types
    }

    /// Place types to search for, in a stable order.
    pub fn effective_place_types(&self) -> Vec<&str> {
        if self.use_all_types {
            SUPPORTED_PLACE_TYPES.to_vec()
        } else {
            self.enabled_place_types.iter().map(String::as_str).collect()
        }
    }

    /// Whether a place with this primary type passes the type filter.
    pub fn accepts_type(&self, primary_type: Option<&str>) -> bool {
        if self.use_all_types {
            return true;
        }
        primary_type.is_some_and(|t| self.enabled_place_types.contains(t))
    }

    /// Whether a place with this rating passes the rating filter.
    /// Unrated places pass.
    pub fn accepts_rating(&self, rating: Option<f64>) -> bool {
        rating.map_or(true, |r| r >= self.minimum_rating)
    }
}

fn invalid(message: String) -> DiscoveryError {
    DiscoveryError::InvalidPreferences { message }
}
