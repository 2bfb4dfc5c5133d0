//! Grid detection: evenly spaced coordinate values on both axes.

use crate::config::PatternConfig;
use crate::spatial::regularity;
use crate::types::{GeometricPattern, Location, PatternKind, Severity};

/// Values closer than this are the same grid line.
const AXIS_EPSILON: f64 = 1e-9;

/// Consecutive gaps between the distinct sorted values of one axis.
pub(crate) fn axis_spacings(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() < AXIS_EPSILON);
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

pub(crate) fn detect(points: &[Location], config: &PatternConfig) -> Option<GeometricPattern> {
    let lat_regularity = regularity(&axis_spacings(points.iter().map(|p| p.lat)));
    let lng_regularity = regularity(&axis_spacings(points.iter().map(|p| p.lng)));

    if lat_regularity <= config.regularity_threshold || lng_regularity <= config.regularity_threshold {
        return None;
    }

    let severity = if lat_regularity > config.high_regularity && lng_regularity > config.high_regularity {
        Severity::High
    } else {
        Severity::Medium
    };

    Some(GeometricPattern {
        kind: PatternKind::Grid,
        confidence: (lat_regularity + lng_regularity) / 2.0,
        locations: points.to_vec(),
        severity,
        description: format!(
            "Grid arrangement of {} locations (latitude regularity {:.2}, longitude regularity {:.2})",
            points.len(),
            lat_regularity,
            lng_regularity
        ),
        center: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice(n: usize, step: f64) -> Vec<Location> {
        let mut points = Vec::new();
        for i in 0..n {
            for j in 0..n {
                points.push(Location::new(40.69 + i as f64 * step, -74.01 + j as f64 * step));
            }
        }
        points
    }

    #[test]
    fn test_axis_spacings_dedup() {
        let spacings = axis_spacings([3.0, 1.0, 2.0, 1.0, 3.0].into_iter());
        assert_eq!(spacings.len(), 2);
        assert!(spacings.iter().all(|s| (s - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_lattice_is_grid() {
        let pattern = detect(&lattice(3, 0.01), &PatternConfig::default()).unwrap();
        assert_eq!(pattern.kind, PatternKind::Grid);
        assert_eq!(pattern.severity, Severity::High);
        assert!(pattern.confidence > 0.99);
    }

    #[test]
    fn test_uneven_axis_is_not_grid() {
        let points = vec![
            Location::new(40.700, -74.000),
            Location::new(40.701, -74.010),
            Location::new(40.720, -74.011),
            Location::new(40.760, -74.050),
        ];
        assert!(detect(&points, &PatternConfig::default()).is_none());
    }

    #[test]
    fn test_single_spacing_is_not_grid() {
        let points = vec![
            Location::new(40.70, -74.00),
            Location::new(40.70, -74.01),
            Location::new(40.71, -74.00),
        ];
        assert!(detect(&points, &PatternConfig::default()).is_none());
    }
}
