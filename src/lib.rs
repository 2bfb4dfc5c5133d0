//! sitescout - site-selection scoring and spatial pattern analysis
//!
//! Ranks candidate areas for a new retail site, estimates how much each
//! would cannibalize existing outlets, and checks whether the resulting
//! network looks artificially regular.
//!
//! # Architecture
//!
//! ```text
//! Candidates → Gravity Scorer → Rank/Filter → Cannibalization → Pattern Detector → Report
//!                   ↓                              ↓                   ↓
//!               TtlCache                     SiteStore (R-tree)   GeoSignalProvider
//! ```
//!
//! # Components
//!
//! - [`scoring`]: demand minus supply and competition penalties, with a
//!   confidence from signal agreement
//! - [`cannibalization`]: distance-decayed revenue impact on nearby outlets
//! - [`patterns`]: grid / linear / radial / cluster detection and
//!   pattern-breaking alternatives
//! - [`pipeline`]: the end-to-end run with validation and enrichment hooks
//!
//! Scoring and cannibalization never fail: bad input and collaborator errors
//! degrade to documented fallbacks. Pattern analysis returns
//! `anyhow::Result` and rejects malformed coordinates.

pub mod cache;
pub mod cannibalization;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod rendering;
pub mod scoring;
pub mod signals;
pub mod spatial;
pub mod store;
pub mod types;

// Re-export core types
pub use types::{
    AffectedOutlet, AlternativeLocation, BoundingBox, CannibalizationResult, Candidate, DataMode,
    ExistingOutlet, GeometricPattern, Location, OutletRecord, PatternAnalysis, PatternKind,
    RankFilter, RecomputeReport, RiskLevel, Scope, ScopeKind, Severity,
};

// Re-export components
pub use cannibalization::CannibalizationAssessor;
pub use config::EngineConfig;
pub use error::SiteError;
pub use patterns::PatternDetector;
pub use pipeline::{EnhancedSuggestion, SelectionReport, SelectionRequest, SiteEngine};
pub use scoring::GravityScorer;
