//! Cluster detection: tight groups of sites within a small radius.
//!
//! Single pass: each unassigned point anchors a group and absorbs every other
//! unassigned point within `cluster_radius_m` of it.

use crate::config::PatternConfig;
use crate::spatial::{centroid, haversine_m};
use crate::types::{GeometricPattern, Location, PatternKind, Severity};

const MIN_CLUSTER: usize = 3;
/// Clusters larger than this are HIGH severity.
const HIGH_CLUSTER: usize = 5;

pub(crate) fn detect(points: &[Location], config: &PatternConfig) -> Vec<GeometricPattern> {
    let mut assigned = vec![false; points.len()];
    let mut patterns = Vec::new();

    for anchor in 0..points.len() {
        if assigned[anchor] {
            continue;
        }
        assigned[anchor] = true;

        let mut group = vec![points[anchor].clone()];
        for other in (anchor + 1)..points.len() {
            if !assigned[other] && haversine_m(&points[anchor], &points[other]) <= config.cluster_radius_m {
                assigned[other] = true;
                group.push(points[other].clone());
            }
        }

        if group.len() < MIN_CLUSTER {
            continue;
        }
        let Some(center) = centroid(&group) else {
            continue;
        };

        let compactness = compactness(&group, &center);
        if compactness <= config.compactness_threshold {
            continue;
        }

        let severity = if group.len() > HIGH_CLUSTER {
            Severity::High
        } else {
            Severity::Medium
        };

        patterns.push(GeometricPattern {
            kind: PatternKind::Cluster,
            confidence: compactness,
            description: format!(
                "Cluster of {} locations within {:.0} m (compactness {:.2})",
                group.len(),
                config.cluster_radius_m,
                compactness
            ),
            locations: group,
            severity,
            center: Some(center),
        });
    }

    patterns
}

/// `1 − mean / max` distance to the centroid; 1 when every point coincides.
pub(crate) fn compactness(group: &[Location], center: &Location) -> f64 {
    let distances: Vec<f64> = group.iter().map(|p| haversine_m(center, p)).collect();
    let max = distances.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return 1.0;
    }
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    (1.0 - mean / max).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::destination;

    #[test]
    fn test_compactness_extremes() {
        let here = Location::new(35.68, 139.69);
        assert_eq!(compactness(&[here.clone(), here.clone()], &here), 1.0);

        let ring: Vec<Location> = (0..4).map(|i| destination(&here, i as f64 * 90.0, 100.0)).collect();
        assert!(compactness(&ring, &here) < 0.01);
    }

    #[test]
    fn test_dense_core_with_outlier_is_cluster() {
        let here = Location::new(35.68, 139.69);
        let mut points = vec![here.clone(); 4];
        points.push(destination(&here, 45.0, 5.0));
        points.push(destination(&here, 90.0, 400.0));

        let patterns = detect(&points, &PatternConfig::default());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].locations.len(), 6);
        assert_eq!(patterns[0].severity, Severity::High);
        assert!(patterns[0].confidence > 0.6);
        assert!(patterns[0].center.is_some());
    }

    #[test]
    fn test_spread_points_are_not_clustered() {
        let here = Location::new(35.68, 139.69);
        let points: Vec<Location> = (0..5).map(|i| destination(&here, 0.0, i as f64 * 1_000.0)).collect();
        assert!(detect(&points, &PatternConfig::default()).is_empty());
    }
}
