//! Core types for sitescout.
//!
//! Records flow through three stages (scoring, cannibalization, pattern
//! analysis) and out through the JSON CLI, so everything serialises with
//! camelCase keys. Key design decisions:
//! - Raw area inputs are `Option<f64>`: missing values are legal and score as 0
//! - `Location` is a plain value type; richer records embed it
//! - Enumerations serialise to the labels downstream consumers display

use serde::{Deserialize, Serialize};

/// A bare coordinate, optionally tagged with a country or region code.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng, tag: None }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Finite and inside the WGS84 coordinate range.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Same coordinates, ignoring the tag.
    pub fn same_point(&self, other: &Location) -> bool {
        (self.lat - other.lat).abs() < 1e-9 && (self.lng - other.lng).abs() < 1e-9
    }
}

/// Live signals vs. modelled (estimated) signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    Live,
    #[default]
    Modeled,
}

/// A candidate area under evaluation.
///
/// Raw inputs are filled by the caller; derived fields are populated by
/// [`GravityScorer::score`](crate::scoring::GravityScorer::score).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub centroid: Location,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,

    // Raw inputs
    #[serde(default)]
    pub population: Option<f64>,
    #[serde(default)]
    pub footfall_index: Option<f64>,
    #[serde(default)]
    pub income_index: Option<f64>,
    #[serde(default)]
    pub competitor_index: Option<f64>,
    /// Distance in metres to the nearest existing store.
    #[serde(default)]
    pub existing_store_distance: Option<f64>,

    // Derived, all in [0, 1] after scoring
    #[serde(default)]
    pub demand_score: f64,
    #[serde(default)]
    pub supply_penalty: f64,
    #[serde(default)]
    pub competition_penalty: f64,
    #[serde(default)]
    pub final_score: f64,
    #[serde(default)]
    pub confidence: f64,

    #[serde(default)]
    pub is_live: bool,
}

impl Candidate {
    pub fn new(id: impl Into<String>, centroid: Location) -> Self {
        Self {
            id: id.into(),
            centroid,
            ..Default::default()
        }
    }
}

/// Storage shape of an existing outlet, before performance is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutletRecord {
    pub id: String,
    pub location: Location,
    #[serde(default)]
    pub turnover: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub opened_on: Option<String>,
}

/// An operating outlet that a new site could cannibalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingOutlet {
    pub id: String,
    pub location: Location,
    /// Relative performance in [0, 1]; 0.5 when turnover is unknown.
    pub performance: f64,
    #[serde(default)]
    pub opened_on: Option<String>,
}

impl ExistingOutlet {
    /// Neutral performance used when no turnover has been reported.
    pub const DEFAULT_PERFORMANCE: f64 = 0.5;

    pub fn new(id: impl Into<String>, location: Location, performance: f64) -> Self {
        Self {
            id: id.into(),
            location,
            performance,
            opened_on: None,
        }
    }

    /// Build an outlet from a storage record.
    ///
    /// Returns `None` for records that are not trading (status other than
    /// `open`/`active`). Performance is turnover relative to
    /// `reference_turnover`, clamped to [0, 1].
    pub fn from_record(record: OutletRecord, reference_turnover: f64) -> Option<Self> {
        if let Some(status) = &record.status {
            let status = status.trim().to_ascii_lowercase();
            if status != "open" && status != "active" {
                return None;
            }
        }

        let performance = match record.turnover {
            Some(t) if t.is_finite() && reference_turnover > 0.0 => {
                (t / reference_turnover).clamp(0.0, 1.0)
            }
            _ => Self::DEFAULT_PERFORMANCE,
        };

        Some(Self {
            id: record.id,
            location: record.location,
            performance,
            opened_on: record.opened_on,
        })
    }
}

/// Cannibalization risk class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

/// An outlet expected to lose revenue to the new site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedOutlet {
    pub id: String,
    pub distance_m: f64,
    pub revenue_impact_percent: f64,
    pub current_performance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CannibalizationResult {
    pub risk_level: RiskLevel,
    /// Aggregate impact, capped at 1.
    pub estimated_impact: f64,
    pub affected_outlets: Vec<AffectedOutlet>,
    pub mitigations: Vec<String>,
    /// Produced by a degradation path rather than a full assessment.
    #[serde(default)]
    pub is_fallback: bool,
}

/// Geometric pattern family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Grid,
    Linear,
    Radial,
    Cluster,
}

impl PatternKind {
    pub fn label(self) -> &'static str {
        match self {
            PatternKind::Grid => "grid",
            PatternKind::Linear => "linear",
            PatternKind::Radial => "radial",
            PatternKind::Cluster => "cluster",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Weight in the aggregate pattern score.
    pub fn weight(self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.0,
            Severity::High => 3.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

/// A regular arrangement found among a set of sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometricPattern {
    pub kind: PatternKind,
    pub confidence: f64,
    pub locations: Vec<Location>,
    pub severity: Severity,
    pub description: String,
    /// Radial centre or cluster centroid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Location>,
}

/// A pattern-breaking coordinate proposed in place of the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeLocation {
    pub lat: f64,
    pub lng: f64,
    pub distance_from_original_m: f64,
    pub improvement_score: f64,
    pub reasons: Vec<String>,
    pub viability_score: f64,
    pub pattern: PatternKind,
}

impl AlternativeLocation {
    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysis {
    pub detected_patterns: Vec<GeometricPattern>,
    pub overall_pattern_score: f64,
    pub recommendations: Vec<String>,
    pub alternative_spacing: Vec<AlternativeLocation>,
}

/// Axis-aligned lat/lng rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, location: &Location) -> bool {
        (self.min_lat..=self.max_lat).contains(&location.lat)
            && (self.min_lng..=self.max_lng).contains(&location.lng)
    }

    /// Smallest box holding every location, or `None` for an empty slice.
    pub fn enclosing<'a>(locations: impl IntoIterator<Item = &'a Location>) -> Option<Self> {
        let mut iter = locations.into_iter().filter(|l| l.is_finite());
        let first = iter.next()?;
        let mut bounds = Self {
            min_lat: first.lat,
            min_lng: first.lng,
            max_lat: first.lat,
            max_lng: first.lng,
        };
        for l in iter {
            bounds.min_lat = bounds.min_lat.min(l.lat);
            bounds.min_lng = bounds.min_lng.min(l.lng);
            bounds.max_lat = bounds.max_lat.max(l.lat);
            bounds.max_lng = bounds.max_lng.max(l.lng);
        }
        Some(bounds)
    }

    /// Grow the box by `margin_m` metres on every side.
    pub fn expanded_by(&self, margin_m: f64) -> Self {
        let mid_lat = (self.min_lat + self.max_lat) / 2.0;
        let (dlat, dlng) = crate::spatial::metres_to_degrees(margin_m, mid_lat);
        Self {
            min_lat: (self.min_lat - dlat).max(-90.0),
            min_lng: (self.min_lng - dlng).max(-180.0),
            max_lat: (self.max_lat + dlat).min(90.0),
            max_lng: (self.max_lng + dlng).min(180.0),
        }
    }

    /// Box of half-width `radius_m` around a point.
    pub fn around(center: &Location, radius_m: f64) -> Self {
        Self {
            min_lat: center.lat,
            min_lng: center.lng,
            max_lat: center.lat,
            max_lng: center.lng,
        }
        .expanded_by(radius_m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Country,
    Region,
    Custom,
}

/// Which candidates and outlets a request covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub kind: ScopeKind,
    pub value: String,
    /// Explicit area; required to make `Custom` scopes match anything.
    #[serde(default)]
    pub area: Option<BoundingBox>,
}

impl Scope {
    pub fn country(code: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Country,
            value: code.into(),
            area: None,
        }
    }

    pub fn region(name: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Region,
            value: name.into(),
            area: None,
        }
    }

    pub fn custom(name: impl Into<String>, area: BoundingBox) -> Self {
        Self {
            kind: ScopeKind::Custom,
            value: name.into(),
            area: Some(area),
        }
    }

    /// Whether a candidate belongs to this scope.
    pub fn matches(&self, candidate: &Candidate) -> bool {
        if let Some(area) = &self.area {
            if !area.contains(&candidate.centroid) {
                return false;
            }
        }
        match self.kind {
            ScopeKind::Country => candidate
                .country
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(&self.value)),
            ScopeKind::Region => candidate
                .region
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(&self.value)),
            ScopeKind::Custom => self.area.is_some(),
        }
    }
}

/// Post-scoring filter applied by [`GravityScorer::rank`](crate::scoring::GravityScorer::rank).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankFilter {
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub live_only: bool,
}

impl RankFilter {
    pub fn accepts(&self, candidate: &Candidate) -> bool {
        if let Some(min) = self.min_score {
            if candidate.final_score < min {
                return false;
            }
        }
        if let Some(region) = &self.region {
            if !candidate.region.as_deref().is_some_and(|r| r.eq_ignore_ascii_case(region)) {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if !candidate.country.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(country)) {
                return false;
            }
        }
        !self.live_only || candidate.is_live
    }
}

/// Outcome of a batch recompute. Writes are not atomic: ids in `updated`
/// were persisted even when others failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeReport {
    pub updated: Vec<String>,
    pub failed: Vec<(String, String)>,
    #[serde(default)]
    pub load_error: Option<String>,
}

impl RecomputeReport {
    pub fn count(&self) -> usize {
        self.updated.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.load_error.is_none()
    }
}
