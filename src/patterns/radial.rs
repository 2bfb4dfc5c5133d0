//! Radial detection: sites at near-equal distance around a centre site.

use crate::config::PatternConfig;
use crate::spatial::{haversine_m, regularity};
use crate::types::{GeometricPattern, Location, PatternKind, Severity};

/// Fewest surrounding sites that can form a ring.
const MIN_RING: usize = 3;

pub(crate) fn detect(points: &[Location], config: &PatternConfig) -> Vec<GeometricPattern> {
    let mut patterns = Vec::new();

    for (i, center) in points.iter().enumerate() {
        let others: Vec<&Location> = points
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, p)| p)
            .collect();
        if others.len() < MIN_RING {
            continue;
        }

        let distances: Vec<f64> = others.iter().map(|p| haversine_m(center, p)).collect();
        let score = regularity(&distances);
        if score <= config.regularity_threshold {
            continue;
        }

        let severity = if score > config.high_regularity {
            Severity::High
        } else {
            Severity::Medium
        };

        let mut locations = vec![center.clone()];
        locations.extend(others.into_iter().cloned());

        patterns.push(GeometricPattern {
            kind: PatternKind::Radial,
            confidence: score,
            locations,
            severity,
            description: format!(
                "{} locations at similar distance around ({:.5}, {:.5}) (regularity {:.2})",
                points.len() - 1,
                center.lat,
                center.lng,
                score
            ),
            center: Some(center.clone()),
        });
    }

    patterns
}
