//! End-to-end site selection.
//!
//! ```text
//! candidates ─► score (validated) ─► rank/filter ─► outlets in scope
//!            ─► cannibalization ─► pattern analysis ─► re-score alternatives
//!            ─► signals + barriers ─► enrichment ─► EnhancedSuggestion
//! ```
//!
//! Collaborator failures degrade per stage (neutral scores, MEDIUM
//! cannibalization fallback, missing enrichment) and are logged. Pattern
//! analysis errors abort the run with context naming the candidate.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, TtlCache};
use crate::cannibalization::CannibalizationAssessor;
pub use crate::collaborators::{Enrichment, GeoValidator, GeoValidity, SuggestionEnricher};
use crate::config::{CacheConfig, EngineConfig};
use crate::patterns::{BarrierAdjustment, PatternDetector};
use crate::scoring::GravityScorer;
use crate::signals::{CommercialFeatures, GeoSignalProvider, SimulatedSignals};
use crate::spatial::haversine_m;
use crate::store::SiteStore;
use crate::types::{
    BoundingBox, CannibalizationResult, Candidate, DataMode, ExistingOutlet, Location, PatternAnalysis,
    RankFilter, Scope,
};

/// Radius for commercial feature counts around a suggestion.
const FEATURE_RADIUS_M: f64 = 1_000.0;

/// A batch of candidates to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub scope: Scope,
    #[serde(default)]
    pub mode: DataMode,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub filter: RankFilter,
    /// Candidates to evaluate; loaded from the store by scope when empty.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Pattern analysis radius; the configured default when absent.
    #[serde(default)]
    pub radius_m: Option<f64>,
}

impl SelectionRequest {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            mode: DataMode::default(),
            limit: None,
            filter: RankFilter::default(),
            candidates: Vec::new(),
            radius_m: None,
        }
    }
}

/// A ranked candidate with everything known about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSuggestion {
    pub candidate: Candidate,
    pub cannibalization: CannibalizationResult,
    pub patterns: PatternAnalysis,
    pub barrier_adjustment: BarrierAdjustment,
    pub urban_density: f64,
    pub commercial_features: CommercialFeatures,
    /// Density, barrier and feature values are placeholders.
    pub signals_simulated: bool,
    #[serde(default)]
    pub enrichment: Option<Enrichment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReport {
    pub scope: Scope,
    pub mode: DataMode,
    pub suggestions: Vec<EnhancedSuggestion>,
    /// Trading outlets found in the scope area; `None` when the query failed.
    pub outlets_considered: Option<usize>,
}

/// Hit/miss counters of the three component caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngineCacheStats {
    pub scores: CacheStats,
    pub cannibalization: CacheStats,
    pub patterns: CacheStats,
}

/// Owns the three scoring components and the optional collaborators.
pub struct SiteEngine {
    config: EngineConfig,
    scorer: GravityScorer,
    assessor: CannibalizationAssessor,
    detector: PatternDetector,
    signals: Arc<dyn GeoSignalProvider>,
    validator: Option<Arc<dyn GeoValidator>>,
    enricher: Option<Arc<dyn SuggestionEnricher>>,
}

impl SiteEngine {
    /// Engine with simulated signals and no validator or enricher.
    pub fn new(config: EngineConfig) -> Self {
        let signals: Arc<dyn GeoSignalProvider> = Arc::new(SimulatedSignals::new(config.seed));

        let scorer = GravityScorer::new(config.scoring.clone()).with_cache(build_cache(&config.cache));
        let assessor =
            CannibalizationAssessor::new(config.cannibalization.clone()).with_cache(build_cache(&config.cache));
        let detector = PatternDetector::new(config.patterns.clone(), config.seed)
            .with_signals(Arc::clone(&signals))
            .with_cache(build_cache(&config.cache));

        Self {
            config,
            scorer,
            assessor,
            detector,
            signals,
            validator: None,
            enricher: None,
        }
    }

    pub fn with_signals(mut self, signals: Arc<dyn GeoSignalProvider>) -> Self {
        self.detector = self.detector.with_signals(Arc::clone(&signals));
        self.signals = signals;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn GeoValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn SuggestionEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scorer(&self) -> &GravityScorer {
        &self.scorer
    }

    pub fn assessor(&self) -> &CannibalizationAssessor {
        &self.assessor
    }

    pub fn detector(&mut self) -> &mut PatternDetector {
        &mut self.detector
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            scores: self.scorer.cache().stats(),
            cannibalization: self.assessor.cache().stats(),
            patterns: self.detector.cache().stats(),
        }
    }

    /// Evaluate a request against `store`.
    ///
    /// # Errors
    ///
    /// Loading candidates from the store, or pattern analysis of a ranked
    /// candidate. Every other collaborator failure degrades in place.
    pub fn run(&mut self, request: SelectionRequest, store: &dyn SiteStore) -> Result<SelectionReport> {
        let SelectionRequest {
            scope,
            mode,
            limit,
            filter,
            candidates,
            radius_m,
        } = request;

        let candidates = if candidates.is_empty() {
            store
                .candidates_in(Some(&scope))
                .with_context(|| format!("loading candidates for {:?} scope '{}'", scope.kind, scope.value))?
        } else {
            candidates
        };

        let is_live = mode == DataMode::Live;
        let scored: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| {
                let placeable = c.centroid.is_finite();
                if !placeable {
                    warn!(candidate = c.id.as_str(), "dropping candidate without a usable centroid");
                }
                placeable
            })
            .map(|mut c| {
                c.is_live = is_live;
                self.score(c)
            })
            .collect();
        let scored_count = scored.len();
        let ranked = self.scorer.rank_scored(scored, limit, &filter);
        info!(scored = scored_count, ranked = ranked.len(), "candidates ranked");

        let outlets = self.load_outlets(&scope, &ranked, store);
        let outlet_locations: Vec<Location> = outlets
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|o| o.location.clone())
            .collect();
        let radius = radius_m.unwrap_or(self.config.patterns.analysis_radius_m);

        let mut suggestions = Vec::with_capacity(ranked.len());
        for (index, candidate) in ranked.iter().enumerate() {
            let cannibalization = match &outlets {
                Some(outlets) => self.assessor.assess(&candidate.centroid, outlets),
                None => CannibalizationAssessor::unavailable(),
            };

            let mut nearby = outlet_locations.clone();
            nearby.extend(
                ranked
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != index)
                    .map(|(_, c)| c.centroid.clone()),
            );

            let mut patterns = self
                .detector
                .analyze(&nearby, &candidate.centroid, radius)
                .with_context(|| format!("pattern analysis for candidate {}", candidate.id))?;
            self.rescore_alternatives(candidate, &mut patterns, &outlet_locations);

            let barrier_adjustment = self
                .detector
                .consider_natural_barriers(&candidate.centroid, &nearby, radius);

            let enrichment = self.enrich(candidate);

            suggestions.push(EnhancedSuggestion {
                candidate: candidate.clone(),
                cannibalization,
                patterns,
                barrier_adjustment,
                urban_density: self.signals.urban_density(&candidate.centroid),
                commercial_features: self.signals.commercial_features(&candidate.centroid, FEATURE_RADIUS_M),
                signals_simulated: self.signals.is_simulated(),
                enrichment,
            });
        }

        Ok(SelectionReport {
            scope,
            mode,
            suggestions,
            outlets_considered: outlets.map(|o| o.len()),
        })
    }

    fn score(&self, candidate: Candidate) -> Candidate {
        match &self.validator {
            Some(validator) => self.scorer.score_validated(candidate, validator.as_ref()),
            None => self.scorer.score(candidate),
        }
    }

    /// Trading outlets in the scope area, or `None` when the query failed.
    ///
    /// Without an explicit area the search box covers the ranked candidates
    /// plus the cannibalization radius.
    fn load_outlets(&self, scope: &Scope, ranked: &[Candidate], store: &dyn SiteStore) -> Option<Vec<ExistingOutlet>> {
        let bounds = match scope.area {
            Some(area) => area,
            None => BoundingBox::enclosing(ranked.iter().map(|c| &c.centroid))?
                .expanded_by(self.config.cannibalization.radius_m),
        };

        match store.outlets_in(&bounds) {
            Ok(records) => {
                let reference = self.config.cannibalization.reference_turnover;
                let outlets: Vec<ExistingOutlet> = records
                    .into_iter()
                    .filter_map(|r| ExistingOutlet::from_record(r, reference))
                    .collect();
                debug!(outlets = outlets.len(), "loaded outlets for scope");
                Some(outlets)
            }
            Err(e) => {
                warn!("outlet query failed, cannibalization will use fallbacks: {}", e);
                None
            }
        }
    }

    /// Replace placeholder viability with the alternative's own gravity score.
    fn rescore_alternatives(&self, original: &Candidate, patterns: &mut PatternAnalysis, outlets: &[Location]) {
        for (i, alternative) in patterns.alternative_spacing.iter_mut().enumerate() {
            let location = alternative.location();
            let mut probe = original.clone();
            probe.id = format!("{}#alt{}", original.id, i + 1);
            probe.centroid = location.clone();
            if let Some(nearest) = outlets
                .iter()
                .map(|o| haversine_m(&location, o))
                .min_by(f64::total_cmp)
            {
                probe.existing_store_distance = Some(nearest);
            }

            let rescored = self.score(probe);
            alternative.viability_score = rescored.final_score;
            alternative
                .reasons
                .push(format!("Re-scored viability {:.2} (original {:.2})", rescored.final_score, original.final_score));
        }
    }

    fn enrich(&self, candidate: &Candidate) -> Option<Enrichment> {
        let enricher = self.enricher.as_ref()?;
        match enricher.enrich(candidate) {
            Ok(enrichment) => Some(enrichment),
            Err(e) => {
                warn!(candidate = candidate.id.as_str(), "enrichment failed: {}", e);
                None
            }
        }
    }
}

fn build_cache<V: Clone>(config: &CacheConfig) -> Arc<TtlCache<V>> {
    let cache = TtlCache::new(Duration::from_secs(config.ttl_secs));
    Arc::new(match config.capacity {
        Some(capacity) => cache.with_capacity(capacity),
        None => cache,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result as SiteResult, SiteError};
    use crate::signals::TabulatedSignals;
    use crate::store::MemoryStore;
    use crate::types::{OutletRecord, RiskLevel};

    fn candidate(id: &str, lat: f64, lng: f64) -> Candidate {
        let mut c = Candidate::new(id, Location::new(lat, lng));
        c.country = Some("US".into());
        c.population = Some(120_000.0);
        c.footfall_index = Some(0.7);
        c.income_index = Some(0.6);
        c.competitor_index = Some(0.2);
        c.existing_store_distance = Some(1_500.0);
        c
    }

    fn outlet(id: &str, lat: f64, lng: f64) -> OutletRecord {
        OutletRecord {
            id: id.into(),
            location: Location::new(lat, lng),
            turnover: Some(800_000.0),
            status: Some("open".into()),
            opened_on: None,
        }
    }

    fn request(candidates: Vec<Candidate>) -> SelectionRequest {
        SelectionRequest {
            candidates,
            ..SelectionRequest::new(Scope::country("US"))
        }
    }

    #[test]
    fn test_run_produces_ranked_suggestions() {
        let store = MemoryStore::new(vec![outlet("o1", 40.7001, -74.0001)], vec![]);
        let mut strong = candidate("strong", 40.70, -74.00);
        strong.population = Some(200_000.0);
        let weak = candidate("weak", 40.75, -73.95);

        let mut engine = SiteEngine::new(EngineConfig::default());
        let report = engine.run(request(vec![weak, strong]), &store).unwrap();

        assert_eq!(report.suggestions.len(), 2);
        assert_eq!(report.suggestions[0].candidate.id, "strong");
        assert_eq!(report.outlets_considered, Some(1));
        assert_eq!(report.suggestions[0].cannibalization.risk_level, RiskLevel::High);
        assert!(report.suggestions.iter().all(|s| s.signals_simulated));
        assert!(report.suggestions.iter().all(|s| !s.candidate.is_live));
    }

    #[test]
    fn test_live_mode_marks_candidates() {
        let store = MemoryStore::new(vec![], vec![]);
        let mut engine = SiteEngine::new(EngineConfig::default());
        let mut req = request(vec![candidate("c1", 40.70, -74.00)]);
        req.mode = DataMode::Live;
        let report = engine.run(req, &store).unwrap();
        assert!(report.suggestions[0].candidate.is_live);
    }

    #[test]
    fn test_candidates_loaded_from_store() {
        let mut other = candidate("ca", 45.5, -73.56);
        other.country = Some("CA".into());
        let store = MemoryStore::new(vec![], vec![candidate("us", 40.70, -74.00), other]);

        let mut engine = SiteEngine::new(EngineConfig::default());
        let report = engine.run(SelectionRequest::new(Scope::country("US")), &store).unwrap();
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(report.suggestions[0].candidate.id, "us");
    }

    #[test]
    fn test_non_finite_candidate_dropped() {
        let store = MemoryStore::new(vec![], vec![]);
        let mut engine = SiteEngine::new(EngineConfig::default());
        let report = engine
            .run(
                request(vec![candidate("ok", 40.70, -74.00), candidate("bad", f64::NAN, -74.0)]),
                &store,
            )
            .unwrap();
        assert_eq!(report.suggestions.len(), 1);
    }

    #[test]
    fn test_alternatives_rescored() {
        // Lattice of outlets plus a candidate on the lattice
        let mut outlets = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                if i == 1 && j == 1 {
                    continue;
                }
                outlets.push(outlet(
                    &format!("o{i}{j}"),
                    40.69 + i as f64 * 0.01,
                    -74.01 + j as f64 * 0.01,
                ));
            }
        }
        let store = MemoryStore::new(outlets, vec![]);
        let mut engine = SiteEngine::new(EngineConfig::default());
        let report = engine.run(request(vec![candidate("center", 40.70, -74.00)]), &store).unwrap();

        let analysis = &report.suggestions[0].patterns;
        assert!(!analysis.alternative_spacing.is_empty());
        for alternative in &analysis.alternative_spacing {
            assert!((0.0..=1.0).contains(&alternative.viability_score));
            assert!(alternative.reasons.iter().any(|r| r.starts_with("Re-scored")));
        }
    }

    struct BrokenStore;

    impl SiteStore for BrokenStore {
        fn outlets_in(&self, _bounds: &BoundingBox) -> SiteResult<Vec<OutletRecord>> {
            Err(SiteError::Store("down".into()))
        }

        fn candidates_in(&self, _scope: Option<&Scope>) -> SiteResult<Vec<Candidate>> {
            Err(SiteError::Store("down".into()))
        }

        fn save_scores(&self, _candidate: &Candidate) -> SiteResult<()> {
            Err(SiteError::Store("down".into()))
        }
    }

    #[test]
    fn test_outlet_failure_degrades() {
        let mut engine = SiteEngine::new(EngineConfig::default());
        let report = engine
            .run(request(vec![candidate("c1", 40.70, -74.00)]), &BrokenStore)
            .unwrap();
        assert_eq!(report.outlets_considered, None);
        let result = &report.suggestions[0].cannibalization;
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.is_fallback);
    }

    #[test]
    fn test_candidate_load_failure_is_error() {
        let mut engine = SiteEngine::new(EngineConfig::default());
        let err = engine
            .run(SelectionRequest::new(Scope::country("US")), &BrokenStore)
            .unwrap_err();
        assert!(format!("{err:#}").contains("loading candidates"));
    }

    struct WaterValidator;

    impl GeoValidator for WaterValidator {
        fn validate(&self, location: &Location) -> SiteResult<GeoValidity> {
            Ok(GeoValidity {
                is_valid: true,
                is_in_water: location.lng > -73.99,
                detected_country: Some("US".into()),
            })
        }
    }

    #[test]
    fn test_validator_gates_scoring() {
        let store = MemoryStore::new(vec![], vec![]);
        let mut engine = SiteEngine::new(EngineConfig::default()).with_validator(Arc::new(WaterValidator));
        let report = engine
            .run(
                request(vec![candidate("land", 40.70, -74.00), candidate("bay", 40.70, -73.95)]),
                &store,
            )
            .unwrap();
        let bay = report
            .suggestions
            .iter()
            .find(|s| s.candidate.id == "bay")
            .unwrap();
        assert_eq!(bay.candidate.final_score, 0.05);
        assert_eq!(report.suggestions[0].candidate.id, "land");
    }

    struct FailingEnricher;

    impl SuggestionEnricher for FailingEnricher {
        fn enrich(&self, _candidate: &Candidate) -> SiteResult<Enrichment> {
            Err(SiteError::Enrichment("model unavailable".into()))
        }
    }

    struct RationaleEnricher;

    impl SuggestionEnricher for RationaleEnricher {
        fn enrich(&self, candidate: &Candidate) -> SiteResult<Enrichment> {
            Ok(Enrichment {
                demographics: None,
                rationale: Some(format!("{} has strong footfall", candidate.id)),
            })
        }
    }

    #[test]
    fn test_enrichment_failure_does_not_block() {
        let store = MemoryStore::new(vec![], vec![]);
        let mut engine = SiteEngine::new(EngineConfig::default()).with_enricher(Arc::new(FailingEnricher));
        let report = engine.run(request(vec![candidate("c1", 40.70, -74.00)]), &store).unwrap();
        assert_eq!(report.suggestions.len(), 1);
        assert!(report.suggestions[0].enrichment.is_none());

        let mut engine = SiteEngine::new(EngineConfig::default()).with_enricher(Arc::new(RationaleEnricher));
        let report = engine.run(request(vec![candidate("c1", 40.70, -74.00)]), &store).unwrap();
        let rationale = report.suggestions[0].enrichment.as_ref().and_then(|e| e.rationale.clone());
        assert_eq!(rationale.as_deref(), Some("c1 has strong footfall"));
    }

    #[test]
    fn test_tabulated_signals_not_simulated() {
        let store = MemoryStore::new(vec![], vec![]);
        let mut engine =
            SiteEngine::new(EngineConfig::default()).with_signals(Arc::new(TabulatedSignals::default()));
        let report = engine.run(request(vec![candidate("c1", 40.70, -74.00)]), &store).unwrap();
        assert!(!report.suggestions[0].signals_simulated);
        assert_eq!(report.suggestions[0].urban_density, TabulatedSignals::DEFAULT_DENSITY);
    }

    #[test]
    fn test_cache_stats_accumulate() {
        let store = MemoryStore::new(vec![], vec![]);
        let mut engine = SiteEngine::new(EngineConfig::default());
        engine.run(request(vec![candidate("c1", 40.70, -74.00)]), &store).unwrap();
        engine.run(request(vec![candidate("c1", 40.70, -74.00)]), &store).unwrap();
        let stats = engine.cache_stats();
        assert!(stats.scores.hits >= 1);
        assert!(stats.cannibalization.hits >= 1);
    }
}
