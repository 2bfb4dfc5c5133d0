//! Gravity-model scorer.
//!
//! ```text
//! demand      = w_pop·norm(population, 0, cap) + w_foot·footfall + w_inc·income
//! supply      = max_supply · min(1, ref_distance / store_distance)    (0 m → max_supply)
//! competition = w_comp · competitor_index
//! final       = clamp(demand − supply − competition, 0, 1)
//! confidence  = clamp(0.95 − k·variance(footfall, income, norm_pop), 0.3, 0.95)
//! ```
//!
//! Missing and non-finite inputs count as 0. Confidence measures agreement
//! between the demand signals: consistent signals give a confident score,
//! contradictory ones (dense population but no footfall) do not.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::collaborators::GeoValidator;
use crate::config::ScoringConfig;
use crate::spatial::{normalize, variance};
use crate::store::SiteStore;
use crate::types::{Candidate, RankFilter, RecomputeReport, Scope};

/// Confidence bounds.
const CONFIDENCE_MIN: f64 = 0.3;
const CONFIDENCE_MAX: f64 = 0.95;

/// Derived fields of a scored candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub demand_score: f64,
    pub supply_penalty: f64,
    pub competition_penalty: f64,
    pub final_score: f64,
    pub confidence: f64,
}

impl ScoreBreakdown {
    /// Used when a collaborator failed: mid-range, low-confidence.
    pub const NEUTRAL: Self = Self {
        demand_score: 0.0,
        supply_penalty: 0.0,
        competition_penalty: 0.0,
        final_score: 0.5,
        confidence: 0.5,
    };

    /// Used for invalid or in-water locations.
    pub const MINIMAL: Self = Self {
        demand_score: 0.0,
        supply_penalty: 0.0,
        competition_penalty: 0.0,
        final_score: 0.05,
        confidence: CONFIDENCE_MIN,
    };

    fn apply(&self, candidate: &mut Candidate) {
        candidate.demand_score = self.demand_score;
        candidate.supply_penalty = self.supply_penalty;
        candidate.competition_penalty = self.competition_penalty;
        candidate.final_score = self.final_score;
        candidate.confidence = self.confidence;
    }
}

/// Scores and ranks candidate areas.
pub struct GravityScorer {
    config: ScoringConfig,
    cache: Arc<TtlCache<ScoreBreakdown>>,
}

impl GravityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            cache: Arc::new(TtlCache::new(Duration::from_secs(3_600))),
        }
    }

    /// Share an externally owned cache.
    pub fn with_cache(mut self, cache: Arc<TtlCache<ScoreBreakdown>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<TtlCache<ScoreBreakdown>> {
        &self.cache
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Populate the derived fields of `candidate`.
    pub fn score(&self, mut candidate: Candidate) -> Candidate {
        let key = cache_key(&candidate);
        let breakdown = self.cache.get_or_compute(&key, || self.breakdown(&candidate));
        breakdown.apply(&mut candidate);

        debug!(
            "Scored {}: {:.3} (demand={:.3}, supply={:.3}, competition={:.3}, confidence={:.2})",
            candidate.id,
            candidate.final_score,
            candidate.demand_score,
            candidate.supply_penalty,
            candidate.competition_penalty,
            candidate.confidence
        );
        candidate
    }

    /// Score after a boundary check.
    ///
    /// Invalid or in-water locations get the minimal-viability fallback without
    /// running the model. A failing validator degrades to the neutral fallback.
    pub fn score_validated(&self, mut candidate: Candidate, validator: &dyn GeoValidator) -> Candidate {
        match validator.validate(&candidate.centroid) {
            Ok(validity) if validity.is_viable() => {
                if candidate.country.is_none() {
                    candidate.country = validity.detected_country;
                }
                self.score(candidate)
            }
            Ok(validity) => {
                debug!(
                    candidate = candidate.id.as_str(),
                    in_water = validity.is_in_water,
                    "location failed validation, using minimal viability"
                );
                ScoreBreakdown::MINIMAL.apply(&mut candidate);
                candidate
            }
            Err(e) => {
                warn!(candidate = candidate.id.as_str(), "geo validation unavailable: {}", e);
                ScoreBreakdown::NEUTRAL.apply(&mut candidate);
                candidate
            }
        }
    }

    /// Compute the breakdown for a candidate, bypassing the cache.
    pub fn breakdown(&self, candidate: &Candidate) -> ScoreBreakdown {
        let population = normalize(input(candidate.population), 0.0, self.config.population_cap);
        let footfall = input(candidate.footfall_index).clamp(0.0, 1.0);
        let income = input(candidate.income_index).clamp(0.0, 1.0);
        let competitors = input(candidate.competitor_index).clamp(0.0, 1.0);

        let (w_pop, w_foot, w_inc) = self.demand_weights();
        let demand_score = (w_pop * population + w_foot * footfall + w_inc * income).clamp(0.0, 1.0);
        let supply_penalty = self.supply_penalty(input(candidate.existing_store_distance));
        let competition_penalty = (self.config.competition_weight * competitors).clamp(0.0, 1.0);

        let final_score = (demand_score - supply_penalty - competition_penalty).clamp(0.0, 1.0);

        let spread = variance(&[footfall, income, population]).unwrap_or(0.0);
        let mut confidence = CONFIDENCE_MAX - self.config.confidence_variance_factor * spread;
        if !candidate.is_live {
            confidence -= self.config.modeled_confidence_discount;
        }

        ScoreBreakdown {
            demand_score,
            supply_penalty,
            competition_penalty,
            final_score,
            confidence: confidence.clamp(CONFIDENCE_MIN, CONFIDENCE_MAX),
        }
    }

    /// Score, filter and order candidates by final score (highest first).
    ///
    /// Ties are broken by id so the order is stable. `limit` defaults to the
    /// configured page size.
    pub fn rank(&self, candidates: Vec<Candidate>, limit: Option<usize>, filter: &RankFilter) -> Vec<Candidate> {
        let scored = candidates.into_iter().map(|c| self.score(c)).collect();
        self.rank_scored(scored, limit, filter)
    }

    /// [`rank`](Self::rank) for candidates whose derived fields are already
    /// populated (e.g. by [`score_validated`](Self::score_validated)).
    pub fn rank_scored(&self, scored: Vec<Candidate>, limit: Option<usize>, filter: &RankFilter) -> Vec<Candidate> {
        let limit = limit.unwrap_or(self.config.default_limit);

        let mut ranked: Vec<Candidate> = scored.into_iter().filter(|c| filter.accepts(c)).collect();
        ranked.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked.truncate(limit);
        ranked
    }

    /// Re-score every stored candidate in `scope` and write the results back.
    ///
    /// Not atomic: each successful write stays even if later ones fail. The
    /// report lists both so callers can retry only the failures.
    pub fn recompute(&self, store: &dyn SiteStore, scope: Option<&Scope>) -> RecomputeReport {
        let mut report = RecomputeReport::default();

        let candidates = match store.candidates_in(scope) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("recompute could not load candidates: {}", e);
                report.load_error = Some(e.to_string());
                return report;
            }
        };

        for candidate in candidates {
            self.cache.invalidate(&cache_key(&candidate));
            let scored = self.score(candidate);
            match store.save_scores(&scored) {
                Ok(()) => report.updated.push(scored.id),
                Err(e) => {
                    warn!(candidate = scored.id.as_str(), "failed to persist scores: {}", e);
                    report.failed.push((scored.id, e.to_string()));
                }
            }
        }

        info!(
            updated = report.updated.len(),
            failed = report.failed.len(),
            "recompute finished"
        );
        report
    }

    /// Inverse-distance supply penalty with an explicit zero-distance guard.
    fn supply_penalty(&self, distance_m: f64) -> f64 {
        let max = self.config.max_supply_penalty.clamp(0.0, 1.0);
        if distance_m <= 0.0 {
            return max;
        }
        max * (self.config.supply_reference_distance_m.max(0.0) / distance_m).min(1.0)
    }

    /// Demand weights, rescaled to sum to 1.
    fn demand_weights(&self) -> (f64, f64, f64) {
        let c = &self.config;
        let weights = [c.population_weight, c.footfall_weight, c.income_weight].map(|w| w.max(0.0));
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            let d = ScoringConfig::default();
            return (d.population_weight, d.footfall_weight, d.income_weight);
        }
        (weights[0] / total, weights[1] / total, weights[2] / total)
    }
}

/// Missing and non-finite inputs count as 0.
fn input(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn cache_key(candidate: &Candidate) -> String {
    format!(
        "score:{}:{:?}:{:?}:{:?}:{:?}:{:?}:{}",
        candidate.id,
        candidate.population,
        candidate.footfall_index,
        candidate.income_index,
        candidate.competitor_index,
        candidate.existing_store_distance,
        candidate.is_live
    )
}
