//! External services the engine consumes but does not implement.
//!
//! - [`GeoValidator`]: land/water/country boundary checks
//! - [`SuggestionEnricher`]: demographic, commercial and narrative enrichment
//!
//! Both are optional in the pipeline. Their failures are logged and degrade
//! to fallback values; they never abort a run.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Candidate, Location};

/// Verdict of a boundary check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoValidity {
    pub is_valid: bool,
    pub is_in_water: bool,
    #[serde(default)]
    pub detected_country: Option<String>,
}

impl GeoValidity {
    /// Whether full scoring should run for this location.
    pub fn is_viable(&self) -> bool {
        self.is_valid && !self.is_in_water
    }
}

pub trait GeoValidator: Send + Sync {
    fn validate(&self, location: &Location) -> Result<GeoValidity>;
}

/// Data attached to a finished candidate by downstream services.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(default)]
    pub demographics: Option<serde_json::Value>,
    #[serde(default)]
    pub rationale: Option<String>,
}

pub trait SuggestionEnricher: Send + Sync {
    fn enrich(&self, candidate: &Candidate) -> Result<Enrichment>;
}
