//! Pattern detector: runs the four detectors over an analysis set.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::{alternatives, cluster, grid, linear, radial};
use crate::cache::TtlCache;
use crate::config::PatternConfig;
use crate::error::SiteError;
use crate::signals::{GeoSignalProvider, SimulatedSignals};
use crate::spatial::haversine_m;
use crate::types::{GeometricPattern, Location, PatternAnalysis, PatternKind};

/// Recommendation returned when too few nearby sites are in range.
pub const INSUFFICIENT_DATA: &str =
    "Insufficient data for pattern analysis: at least 3 nearby locations are required";

pub struct PatternDetector {
    config: PatternConfig,
    rng: StdRng,
    signals: Arc<dyn GeoSignalProvider>,
    cache: Arc<TtlCache<Vec<GeometricPattern>>>,
}

impl PatternDetector {
    /// Detector with simulated signals and a private cache.
    pub fn new(config: PatternConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            signals: Arc::new(SimulatedSignals::new(seed)),
            cache: Arc::new(TtlCache::new(Duration::from_secs(3_600))),
        }
    }

    pub fn with_signals(mut self, signals: Arc<dyn GeoSignalProvider>) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_cache(mut self, cache: Arc<TtlCache<Vec<GeometricPattern>>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    pub fn signals(&self) -> &dyn GeoSignalProvider {
        self.signals.as_ref()
    }

    pub fn cache(&self) -> &Arc<TtlCache<Vec<GeometricPattern>>> {
        &self.cache
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Analyse `proposed` together with the `nearby` sites within `radius_m`.
    ///
    /// # Errors
    ///
    /// Any non-finite coordinate or radius. Fewer than three nearby sites in
    /// range is not an error; the analysis is empty and carries
    /// [`INSUFFICIENT_DATA`].
    pub fn analyze(&mut self, nearby: &[Location], proposed: &Location, radius_m: f64) -> Result<PatternAnalysis> {
        ensure_finite(proposed).context("proposed location")?;
        for (i, location) in nearby.iter().enumerate() {
            ensure_finite(location).with_context(|| format!("nearby location {i}"))?;
        }
        if !radius_m.is_finite() {
            bail!("analysis radius must be finite, got {radius_m}");
        }

        let in_range: Vec<&Location> = nearby
            .iter()
            .filter(|l| haversine_m(proposed, l) <= radius_m)
            .collect();

        if in_range.len() < self.config.min_locations {
            debug!(
                in_range = in_range.len(),
                total = nearby.len(),
                "too few nearby locations for pattern analysis"
            );
            return Ok(PatternAnalysis {
                recommendations: vec![INSUFFICIENT_DATA.to_string()],
                ..Default::default()
            });
        }

        let mut set: Vec<Location> = Vec::with_capacity(in_range.len() + 1);
        for location in in_range.into_iter().chain(std::iter::once(proposed)) {
            if !set.iter().any(|s| s.same_point(location)) {
                set.push(location.clone());
            }
        }

        let patterns = self.detect(&set);
        let overall_pattern_score = aggregate_score(&patterns);
        let recommendations = recommendations(&patterns, overall_pattern_score);
        let alternative_spacing = alternatives::generate(&patterns, proposed, &self.config, &mut self.rng);

        debug!(
            "Pattern analysis over {} locations: {} patterns, score {:.3}, {} alternatives",
            set.len(),
            patterns.len(),
            overall_pattern_score,
            alternative_spacing.len()
        );

        Ok(PatternAnalysis {
            detected_patterns: patterns,
            overall_pattern_score,
            recommendations,
            alternative_spacing,
        })
    }

    /// Every pattern found in `points`, cached by coordinate set.
    pub fn detect(&self, points: &[Location]) -> Vec<GeometricPattern> {
        let key = cache_key(points);
        self.cache.get_or_compute(&key, || {
            let mut patterns = Vec::new();
            patterns.extend(grid::detect(points, &self.config));
            patterns.extend(linear::detect(points, &self.config));
            patterns.extend(radial::detect(points, &self.config));
            patterns.extend(cluster::detect(points, &self.config));
            patterns
        })
    }

    /// Aggregate pattern score of a bare set; 0 below the minimum size.
    pub fn pattern_score(&self, points: &[Location]) -> f64 {
        if points.len() < self.config.min_locations {
            return 0.0;
        }
        aggregate_score(&self.detect(points))
    }
}

/// Severity-weighted mean of pattern confidences; 0 without patterns.
pub fn aggregate_score(patterns: &[GeometricPattern]) -> f64 {
    let total_weight: f64 = patterns.iter().map(|p| p.severity.weight()).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = patterns.iter().map(|p| p.confidence * p.severity.weight()).sum();
    (weighted / total_weight).clamp(0.0, 1.0)
}

/// One message per detected kind, then one for the overall level.
fn recommendations(patterns: &[GeometricPattern], score: f64) -> Vec<String> {
    let mut kinds: Vec<PatternKind> = Vec::new();
    for pattern in patterns {
        if !kinds.contains(&pattern.kind) {
            kinds.push(pattern.kind);
        }
    }

    let mut messages: Vec<String> = kinds
        .into_iter()
        .map(|kind| {
            let message = match kind {
                PatternKind::Grid => {
                    "Grid pattern detected: vary the spacing between sites so they do not sit on regular lines"
                }
                PatternKind::Linear => "Linear pattern detected: offset sites from the shared line",
                PatternKind::Radial => "Radial pattern detected: vary distances from the central site",
                PatternKind::Cluster => "Cluster pattern detected: spread tightly grouped sites further apart",
            };
            message.to_string()
        })
        .collect();

    let overall = if score > 0.8 {
        "Strong artificial pattern: adjust site placement significantly"
    } else if score > 0.6 {
        "Moderate pattern: a minor adjustment of site placement is recommended"
    } else if score > 0.3 {
        "Weak pattern: consider variation in site spacing"
    } else {
        "Site distribution appears natural"
    };
    messages.push(overall.to_string());
    messages
}

pub(crate) fn ensure_finite(location: &Location) -> Result<()> {
    if location.is_finite() {
        return Ok(());
    }
    Err(SiteError::InvalidLocation {
        lat: location.lat,
        lng: location.lng,
    }
    .into())
}

fn cache_key(points: &[Location]) -> String {
    let mut key = String::from("patterns");
    for p in points {
        key.push_str(&format!("|{:.6},{:.6}", p.lat, p.lng));
    }
    key
}
