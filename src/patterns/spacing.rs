//! Natural spacing variation: jitter a set of sites so it reads less regular.

use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ensure_finite, PatternDetector};
use crate::spatial::offset_m;
use crate::types::Location;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacingVariation {
    pub adjusted: Vec<Location>,
    /// 0.5 when the jitter made no difference, higher when it broke patterns.
    pub naturalness_score: f64,
    pub message: String,
}

impl PatternDetector {
    /// Jitter `locations` by up to `spacing_jitter_m · (1 − target_density)`.
    ///
    /// Dense targets tolerate regular spacing, so they are moved less.
    pub fn generate_natural_spacing_variation(
        &mut self,
        locations: &[Location],
        target_density: f64,
    ) -> Result<SpacingVariation> {
        if locations.is_empty() {
            return Ok(SpacingVariation {
                adjusted: Vec::new(),
                naturalness_score: 1.0,
                message: "There are no locations to adjust".to_string(),
            });
        }

        for (i, location) in locations.iter().enumerate() {
            ensure_finite(location).map_err(|e| e.context(format!("location {i}")))?;
        }

        let density = if target_density.is_finite() {
            target_density.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let jitter = (self.config().spacing_jitter_m * (1.0 - density)).abs();

        let adjusted: Vec<Location> = locations
            .iter()
            .map(|l| {
                let north = self.rng().gen_range(-jitter..=jitter);
                let east = self.rng().gen_range(-jitter..=jitter);
                offset_m(l, north, east)
            })
            .collect();

        let before = self.pattern_score(locations);
        let after = self.pattern_score(&adjusted);
        let naturalness_score = (0.5 + (before - after)).clamp(0.0, 1.0);

        debug!(before, after, naturalness_score, "spacing variation");

        Ok(SpacingVariation {
            message: format!(
                "Adjusted {} locations with up to {:.0} m of jitter (pattern score {:.2} -> {:.2})",
                adjusted.len(),
                jitter,
                before,
                after
            ),
            adjusted,
            naturalness_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternConfig;
    use crate::spatial::haversine_m;

    fn detector() -> PatternDetector {
        PatternDetector::new(PatternConfig::default(), 42)
    }

    #[test]
    fn test_empty_input() {
        let result = detector().generate_natural_spacing_variation(&[], 0.5).unwrap();
        assert!(result.adjusted.is_empty());
        assert_eq!(result.naturalness_score, 1.0);
        assert!(result.message.contains("no locations"));
    }

    #[test]
    fn test_jitter_bounded_by_density() {
        let locations: Vec<Location> = (0..4).map(|i| Location::new(45.0 + i as f64 * 0.01, 7.0)).collect();

        let full = detector().generate_natural_spacing_variation(&locations, 1.0).unwrap();
        for (before, after) in locations.iter().zip(&full.adjusted) {
            assert!(haversine_m(before, after) < 1e-6);
        }

        let sparse = detector().generate_natural_spacing_variation(&locations, 0.0).unwrap();
        assert_eq!(sparse.adjusted.len(), 4);
        for (before, after) in locations.iter().zip(&sparse.adjusted) {
            assert!(haversine_m(before, after) <= 300.0 * std::f64::consts::SQRT_2 + 1.0);
        }
        assert!((0.0..=1.0).contains(&sparse.naturalness_score));
    }

    #[test]
    fn test_reports_adjusted_count() {
        let line: Vec<Location> = (0..4).map(|i| Location::new(45.0 + i as f64 * 0.001, 7.0)).collect();
        let result = detector().generate_natural_spacing_variation(&line, 0.0).unwrap();
        assert!(result.naturalness_score >= 0.0);
        assert!(result.message.contains("4 locations"));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = detector()
            .generate_natural_spacing_variation(&[Location::new(f64::NAN, 0.0)], 0.5)
            .unwrap_err();
        assert!(format!("{err:#}").contains("location 0"));
    }
}
