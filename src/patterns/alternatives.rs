//! Pattern-breaking alternative coordinates.
//!
//! Each strategy perturbs the proposed site just enough to leave the pattern:
//! - grid: uniform jitter on both axes
//! - linear: sideways step off the line
//! - radial: stretch or shrink the distance to the centre, keeping the bearing
//! - cluster: push away from the cluster centroid

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::PatternConfig;
use crate::spatial::{bearing_deg, destination, haversine_m, offset_m};
use crate::types::{AlternativeLocation, GeometricPattern, Location, PatternKind};

/// Below this the proposed site sits on the reference point and has no bearing.
const COINCIDENT_M: f64 = 1.0;

/// Up to `max_alternatives` alternatives, one per pattern involving
/// `proposed`, strongest patterns first.
pub(crate) fn generate(
    patterns: &[GeometricPattern],
    proposed: &Location,
    config: &PatternConfig,
    rng: &mut StdRng,
) -> Vec<AlternativeLocation> {
    let mut ranked: Vec<&GeometricPattern> = patterns
        .iter()
        .filter(|p| p.locations.iter().any(|l| l.same_point(proposed)))
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.severity.cmp(&a.severity))
    });

    ranked
        .into_iter()
        .take(config.max_alternatives)
        .map(|pattern| {
            let (moved, reason) = perturb(pattern, proposed, config, rng);
            let distance = haversine_m(proposed, &moved);
            AlternativeLocation {
                lat: moved.lat,
                lng: moved.lng,
                distance_from_original_m: distance,
                improvement_score: (pattern.confidence * 0.8).min(0.9),
                reasons: vec![
                    format!(
                        "Breaks {} pattern (confidence {:.2})",
                        pattern.kind.label(),
                        pattern.confidence
                    ),
                    reason,
                ],
                viability_score: config.alternative_viability,
                pattern: pattern.kind,
            }
        })
        .collect()
}

fn perturb(
    pattern: &GeometricPattern,
    proposed: &Location,
    config: &PatternConfig,
    rng: &mut StdRng,
) -> (Location, String) {
    match pattern.kind {
        PatternKind::Grid => {
            let j = config.grid_jitter_m.abs();
            let north = rng.gen_range(-j..=j);
            let east = rng.gen_range(-j..=j);
            (
                offset_m(proposed, north, east),
                format!("Shifted {north:.0} m north and {east:.0} m east off the grid lines"),
            )
        }
        PatternKind::Linear => {
            let (first, last) = match (pattern.locations.first(), pattern.locations.last()) {
                (Some(first), Some(last)) => (first, last),
                _ => (proposed, proposed),
            };
            let direction = bearing_deg(first, last);
            let side = if rng.gen_bool(0.5) { 90.0 } else { -90.0 };
            let distance = uniform(rng, config.linear_offset_min_m, config.linear_offset_max_m);
            (
                destination(proposed, direction + side, distance),
                format!("Stepped {distance:.0} m sideways off the line"),
            )
        }
        PatternKind::Radial => {
            let center = pattern.center.as_ref().unwrap_or(proposed);
            let radius = haversine_m(center, proposed);
            if radius < COINCIDENT_M {
                return push_random(proposed, config.cluster_push_m, rng, "away from the ring centre");
            }
            let variation = uniform(rng, config.radial_variation_min, config.radial_variation_max);
            let factor = if rng.gen_bool(0.5) { 1.0 + variation } else { 1.0 - variation };
            let bearing = bearing_deg(center, proposed);
            (
                destination(center, bearing, radius * factor),
                format!(
                    "Changed distance from the ring centre by {:+.0}%",
                    (factor - 1.0) * 100.0
                ),
            )
        }
        PatternKind::Cluster => {
            let center = pattern.center.as_ref().unwrap_or(proposed);
            if haversine_m(center, proposed) < COINCIDENT_M {
                return push_random(proposed, config.cluster_push_m, rng, "out of the cluster");
            }
            let bearing = bearing_deg(center, proposed);
            (
                destination(proposed, bearing, config.cluster_push_m),
                format!("Pushed {:.0} m away from the cluster centre", config.cluster_push_m),
            )
        }
    }
}

fn push_random(proposed: &Location, distance: f64, rng: &mut StdRng, what: &str) -> (Location, String) {
    let bearing = rng.gen_range(0.0..360.0);
    (
        destination(proposed, bearing, distance),
        format!("Moved {distance:.0} m {what}"),
    )
}

/// Uniform draw from `[a, b]` in either order.
fn uniform(rng: &mut StdRng, a: f64, b: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    rng.gen_range(lo..=hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use rand::SeedableRng;

    fn pattern(kind: PatternKind, confidence: f64, locations: Vec<Location>, center: Option<Location>) -> GeometricPattern {
        GeometricPattern {
            kind,
            confidence,
            locations,
            severity: Severity::Medium,
            description: String::new(),
            center,
        }
    }

    #[test]
    fn test_strongest_first_and_capped() {
        let proposed = Location::new(40.70, -74.00);
        let others = vec![proposed.clone(), Location::new(40.71, -74.00)];
        let patterns = vec![
            pattern(PatternKind::Grid, 0.75, others.clone(), None),
            pattern(PatternKind::Linear, 0.95, others.clone(), None),
            pattern(PatternKind::Cluster, 0.65, others.clone(), Some(Location::new(40.705, -74.0))),
            pattern(PatternKind::Radial, 0.85, others.clone(), Some(Location::new(40.71, -74.0))),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let alternatives = generate(&patterns, &proposed, &PatternConfig::default(), &mut rng);

        let kinds: Vec<PatternKind> = alternatives.iter().map(|a| a.pattern).collect();
        assert_eq!(kinds, vec![PatternKind::Linear, PatternKind::Radial, PatternKind::Grid]);
        assert!((alternatives[0].improvement_score - 0.76).abs() < 1e-9);
        assert!(alternatives.iter().all(|a| a.viability_score == 0.7));
    }

    #[test]
    fn test_only_patterns_involving_proposed() {
        let proposed = Location::new(40.70, -74.00);
        let elsewhere = vec![Location::new(41.0, -74.0), Location::new(41.1, -74.0)];
        let patterns = vec![pattern(PatternKind::Grid, 0.9, elsewhere, None)];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate(&patterns, &proposed, &PatternConfig::default(), &mut rng).is_empty());
    }

    #[test]
    fn test_perturbation_distances() {
        let config = PatternConfig::default();
        let proposed = Location::new(40.70, -74.00);
        let line = vec![Location::new(40.69, -74.00), proposed.clone(), Location::new(40.71, -74.00)];
        let ring_center = Location::new(40.71, -74.00);
        let patterns = vec![
            pattern(PatternKind::Linear, 0.9, line.clone(), None),
            pattern(PatternKind::Radial, 0.8, line.clone(), Some(ring_center.clone())),
            pattern(PatternKind::Cluster, 0.7, line, Some(Location::new(40.699, -74.00))),
        ];

        let mut rng = StdRng::seed_from_u64(9);
        let alternatives = generate(&patterns, &proposed, &config, &mut rng);
        assert_eq!(alternatives.len(), 3);

        let linear = &alternatives[0];
        assert!(linear.distance_from_original_m >= 149.0 && linear.distance_from_original_m <= 401.0);

        let radial = &alternatives[1];
        let original_radius = haversine_m(&ring_center, &proposed);
        let ratio = haversine_m(&ring_center, &radial.location()) / original_radius;
        let change = (ratio - 1.0).abs();
        assert!(change >= 0.149 && change <= 0.351, "change {change}");

        let cluster = &alternatives[2];
        assert!((cluster.distance_from_original_m - 300.0).abs() < 1.0);
    }

    #[test]
    fn test_seeded_output_is_reproducible() {
        let proposed = Location::new(40.70, -74.00);
        let patterns = vec![pattern(PatternKind::Grid, 0.9, vec![proposed.clone()], None)];
        let config = PatternConfig::default();
        let a = generate(&patterns, &proposed, &config, &mut StdRng::seed_from_u64(5));
        let b = generate(&patterns, &proposed, &config, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
        assert!(a[0].distance_from_original_m <= 250.0 * std::f64::consts::SQRT_2 + 1.0);
    }
}
