//! Distance-decayed impact model over nearby outlets.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::mitigation::{fallback_mitigations, mitigations_for};
use crate::cache::TtlCache;
use crate::config::CannibalizationConfig;
use crate::spatial::haversine_m;
use crate::store::SiteStore;
use crate::types::{
    AffectedOutlet, BoundingBox, CannibalizationResult, ExistingOutlet, Location, RiskLevel,
};

pub struct CannibalizationAssessor {
    config: CannibalizationConfig,
    cache: Arc<TtlCache<CannibalizationResult>>,
}

impl CannibalizationAssessor {
    pub fn new(config: CannibalizationConfig) -> Self {
        Self {
            config,
            cache: Arc::new(TtlCache::new(Duration::from_secs(3_600))),
        }
    }

    pub fn with_cache(mut self, cache: Arc<TtlCache<CannibalizationResult>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<TtlCache<CannibalizationResult>> {
        &self.cache
    }

    pub fn config(&self) -> &CannibalizationConfig {
        &self.config
    }

    /// Assess a new site against an explicit outlet list.
    pub fn assess(&self, new_location: &Location, outlets: &[ExistingOutlet]) -> CannibalizationResult {
        if !new_location.is_valid() {
            warn!(
                lat = new_location.lat,
                lng = new_location.lng,
                "cannot assess cannibalization for invalid location"
            );
            return CannibalizationResult {
                risk_level: RiskLevel::Low,
                estimated_impact: 0.0,
                affected_outlets: Vec::new(),
                mitigations: mitigations_for(RiskLevel::Low),
                is_fallback: true,
            };
        }

        let key = cache_key(new_location, outlets);
        self.cache
            .get_or_compute(&key, || self.compute(new_location, outlets))
    }

    /// Assess a new site against the outlets a store holds around it.
    ///
    /// Outlets that are not trading are skipped. A failing store query gives
    /// a MEDIUM fallback rather than an error.
    pub fn assess_in_store(&self, new_location: &Location, store: &dyn SiteStore) -> CannibalizationResult {
        if !new_location.is_valid() {
            return self.assess(new_location, &[]);
        }

        let bounds = BoundingBox::around(new_location, self.config.radius_m);
        match store.outlets_in(&bounds) {
            Ok(records) => {
                let outlets: Vec<ExistingOutlet> = records
                    .into_iter()
                    .filter_map(|r| ExistingOutlet::from_record(r, self.config.reference_turnover))
                    .collect();
                self.assess(new_location, &outlets)
            }
            Err(e) => {
                warn!("outlet query failed, using fallback assessment: {}", e);
                Self::unavailable()
            }
        }
    }

    /// MEDIUM result used when outlet data could not be loaded.
    pub fn unavailable() -> CannibalizationResult {
        CannibalizationResult {
            risk_level: RiskLevel::Medium,
            estimated_impact: 0.0,
            affected_outlets: Vec::new(),
            mitigations: fallback_mitigations(),
            is_fallback: true,
        }
    }

    /// Distance decay: 1 at the site, falling to the floor at the radius.
    pub fn decay(&self, distance_m: f64) -> f64 {
        let radius = self.config.radius_m.max(1.0);
        let scaled = 3.0 * distance_m / radius;
        (1.0 / (1.0 + scaled * scaled)).max(self.config.decay_floor)
    }

    /// Modelled revenue loss of one outlet, in [0, max_outlet_impact].
    pub fn outlet_impact(&self, distance_m: f64, performance: f64) -> f64 {
        let multiplier = 0.5 + 0.5 * performance.clamp(0.0, 1.0);
        (self.decay(distance_m) * multiplier).min(self.config.max_outlet_impact)
    }

    fn compute(&self, new_location: &Location, outlets: &[ExistingOutlet]) -> CannibalizationResult {
        let mut affected = Vec::new();
        let mut aggregate = 0.0;
        let mut max_single: f64 = 0.0;

        for outlet in outlets {
            if !outlet.location.is_finite() || !outlet.performance.is_finite() {
                warn!(outlet = outlet.id.as_str(), "skipping outlet with invalid data");
                continue;
            }

            let distance = haversine_m(new_location, &outlet.location);
            if distance > self.config.radius_m {
                continue;
            }

            let impact = self.outlet_impact(distance, outlet.performance);
            if impact > self.config.affected_threshold {
                aggregate += impact;
                max_single = max_single.max(impact);
                affected.push(AffectedOutlet {
                    id: outlet.id.clone(),
                    distance_m: distance,
                    revenue_impact_percent: impact * 100.0,
                    current_performance: outlet.performance,
                });
            }
        }

        affected.sort_by(|a, b| b.revenue_impact_percent.total_cmp(&a.revenue_impact_percent));

        let c = &self.config;
        let risk_level = if max_single > c.high_single_impact || aggregate > c.high_aggregate_impact {
            RiskLevel::High
        } else if affected.len() > c.medium_affected_count || aggregate > c.medium_aggregate_impact {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        debug!(
            "Cannibalization at ({:.5}, {:.5}): {} ({} affected, aggregate {:.3})",
            new_location.lat,
            new_location.lng,
            risk_level.label(),
            affected.len(),
            aggregate
        );

        CannibalizationResult {
            risk_level,
            estimated_impact: aggregate.min(1.0),
            affected_outlets: affected,
            mitigations: mitigations_for(risk_level),
            is_fallback: false,
        }
    }
}

fn cache_key(location: &Location, outlets: &[ExistingOutlet]) -> String {
    let mut key = format!("cannibalization:{:.6}:{:.6}", location.lat, location.lng);
    for outlet in outlets {
        key.push_str(&format!(
            "|{}:{:.6}:{:.6}:{:.4}",
            outlet.id, outlet.location.lat, outlet.location.lng, outlet.performance
        ));
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SiteError};
    use crate::spatial::destination;
    use crate::store::MemoryStore;
    use crate::types::{Candidate, OutletRecord, Scope};

    fn assessor() -> CannibalizationAssessor {
        CannibalizationAssessor::new(CannibalizationConfig::default())
    }

    fn site() -> Location {
        Location::new(51.5074, -0.1278)
    }

    #[test]
    fn test_same_spot_caps_impact() {
        let outlets = vec![ExistingOutlet::new("o1", site(), 1.0)];
        let result = assessor().assess(&site(), &outlets);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.affected_outlets.len(), 1);
        assert!((result.affected_outlets[0].revenue_impact_percent - 30.0).abs() < 1e-9);
        assert!((result.estimated_impact - 0.3).abs() < 1e-9);
        assert!(!result.is_fallback);
    }

    #[test]
    fn test_outlets_beyond_radius_ignored() {
        let far = destination(&site(), 45.0, 6_000.0);
        let result = assessor().assess(&site(), &[ExistingOutlet::new("far", far, 1.0)]);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.affected_outlets.is_empty());
        assert_eq!(result.estimated_impact, 0.0);
    }

    #[test]
    fn test_empty_outlets_is_low() {
        let result = assessor().assess(&site(), &[]);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.mitigations, mitigations_for(RiskLevel::Low));
    }

    #[test]
    fn test_decay_shape() {
        let a = assessor();
        assert_eq!(a.decay(0.0), 1.0);
        assert_eq!(a.decay(5_000.0), 0.1);
        assert!((a.decay(2_500.0) - 1.0 / 3.25).abs() < 1e-12);
        assert!(a.decay(1_000.0) > a.decay(2_000.0));
    }

    #[test]
    fn test_many_weak_outlets_are_medium() {
        let outlets: Vec<ExistingOutlet> = (0..3)
            .map(|i| ExistingOutlet::new(format!("o{i}"), destination(&site(), i as f64 * 120.0, 4_500.0), 0.0))
            .collect();
        let result = assessor().assess(&site(), &outlets);
        assert_eq!(result.affected_outlets.len(), 3);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.estimated_impact > 0.15 && result.estimated_impact < 0.3);
    }

    #[test]
    fn test_single_weak_outlet_is_low() {
        let outlet = ExistingOutlet::new("o1", destination(&site(), 0.0, 4_500.0), 0.0);
        let result = assessor().assess(&site(), &[outlet]);
        assert_eq!(result.affected_outlets.len(), 1);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_bad_outlet_skipped() {
        let outlets = vec![
            ExistingOutlet::new("bad", Location::new(f64::NAN, 0.0), 0.5),
            ExistingOutlet::new("nan-perf", site(), f64::NAN),
            ExistingOutlet::new("good", destination(&site(), 90.0, 100.0), 0.5),
        ];
        let result = assessor().assess(&site(), &outlets);
        assert_eq!(result.affected_outlets.len(), 1);
        assert_eq!(result.affected_outlets[0].id, "good");
    }

    #[test]
    fn test_invalid_location_falls_back_low() {
        let result = assessor().assess(&Location::new(120.0, 0.0), &[]);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.is_fallback);
    }

    #[test]
    fn test_affected_sorted_by_impact() {
        let outlets = vec![
            ExistingOutlet::new("far", destination(&site(), 0.0, 3_000.0), 0.5),
            ExistingOutlet::new("near", destination(&site(), 180.0, 300.0), 0.5),
        ];
        let result = assessor().assess(&site(), &outlets);
        assert_eq!(result.affected_outlets[0].id, "near");
    }

    #[test]
    fn test_results_cached() {
        let a = assessor();
        let outlets = vec![ExistingOutlet::new("o1", site(), 1.0)];
        a.assess(&site(), &outlets);
        a.assess(&site(), &outlets);
        assert_eq!(a.cache().stats().hits, 1);
    }

    #[test]
    fn test_assess_in_store_filters_closed() {
        let open = OutletRecord {
            id: "open".into(),
            location: destination(&site(), 0.0, 200.0),
            turnover: Some(900_000.0),
            status: Some("open".into()),
            opened_on: None,
        };
        let closed = OutletRecord {
            id: "closed".into(),
            status: Some("closed".into()),
            ..open.clone()
        };
        let store = MemoryStore::new(vec![open, closed], vec![]);

        let result = assessor().assess_in_store(&site(), &store);
        assert_eq!(result.affected_outlets.len(), 1);
        assert_eq!(result.affected_outlets[0].id, "open");
        assert!((result.affected_outlets[0].current_performance - 0.9).abs() < 1e-12);
    }

    struct BrokenStore;

    impl SiteStore for BrokenStore {
        fn outlets_in(&self, _bounds: &BoundingBox) -> Result<Vec<OutletRecord>> {
            Err(SiteError::Store("timeout".into()))
        }

        fn candidates_in(&self, _scope: Option<&Scope>) -> Result<Vec<Candidate>> {
            Ok(Vec::new())
        }

        fn save_scores(&self, _candidate: &Candidate) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_store_failure_is_medium_fallback() {
        let result = assessor().assess_in_store(&site(), &BrokenStore);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!(result.is_fallback);
        assert_eq!(result.mitigations, fallback_mitigations());
    }
}
