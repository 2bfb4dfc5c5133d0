//! Linear detection: three or more sites strung along one path.
//!
//! Every triple is scored with [`best_linearity`]. A triple above the
//! threshold seeds a line between its two farthest members, and every other
//! point collinear with those endpoints (between or beyond them) joins it.
//! Triples already inside an emitted line are not reseeded.

use crate::config::PatternConfig;
use crate::spatial::{best_linearity, haversine_m};
use crate::types::{GeometricPattern, Location, PatternKind, Severity};

pub(crate) fn detect(points: &[Location], config: &PatternConfig) -> Vec<GeometricPattern> {
    let n = points.len();
    let mut lines: Vec<Vec<usize>> = Vec::new();
    let mut patterns = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let triple = [i, j, k];
                if lines.iter().any(|line| triple.iter().all(|t| line.contains(t))) {
                    continue;
                }

                let seed = best_linearity(&points[i], &points[j], &points[k]);
                if seed <= config.linearity_threshold {
                    continue;
                }

                let (a, b) = farthest_pair(points, triple);
                let mut members: Vec<usize> = triple.to_vec();
                for q in 0..n {
                    if members.contains(&q) {
                        continue;
                    }
                    if best_linearity(&points[a], &points[q], &points[b]) > config.linearity_threshold {
                        members.push(q);
                    }
                }

                // Order along the line, starting from endpoint `a`
                members.sort_by(|x, y| {
                    haversine_m(&points[a], &points[*x]).total_cmp(&haversine_m(&points[a], &points[*y]))
                });

                let severity = match members.len() {
                    len if len > 4 => Severity::High,
                    4 => Severity::Medium,
                    _ => Severity::Low,
                };

                patterns.push(GeometricPattern {
                    kind: PatternKind::Linear,
                    confidence: seed,
                    locations: members.iter().map(|&m| points[m].clone()).collect(),
                    severity,
                    description: format!(
                        "{} locations aligned along a line (linearity {:.2})",
                        members.len(),
                        seed
                    ),
                    center: None,
                });
                lines.push(members);
            }
        }
    }

    patterns
}

/// The two members of `triple` farthest apart.
fn farthest_pair(points: &[Location], triple: [usize; 3]) -> (usize, usize) {
    let [i, j, k] = triple;
    [(i, j), (i, k), (j, k)]
        .into_iter()
        .max_by(|x, y| {
            haversine_m(&points[x.0], &points[x.1]).total_cmp(&haversine_m(&points[y.0], &points[y.1]))
        })
        .unwrap_or((i, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collinear_points_form_one_line() {
        let points: Vec<Location> = (0..5)
            .map(|i| Location::new(40.70 + i as f64 * 0.005, -74.00))
            .collect();
        let patterns = detect(&points, &PatternConfig::default());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].locations.len(), 5);
        assert_eq!(patterns[0].severity, Severity::High);
        assert!(patterns[0].confidence > 0.99);
        // Ordered from one end to the other
        assert_eq!(patterns[0].locations[0].lat, 40.70);
        assert!((patterns[0].locations[4].lat - 40.72).abs() < 1e-9);
    }

    #[test]
    fn test_triangle_is_not_linear() {
        let points = vec![
            Location::new(40.70, -74.00),
            Location::new(40.71, -74.00),
            Location::new(40.705, -73.988),
        ];
        assert!(detect(&points, &PatternConfig::default()).is_empty());
    }

    #[test]
    fn test_three_points_low_severity() {
        let points = vec![
            Location::new(40.70, -74.00),
            Location::new(40.71, -74.00),
            Location::new(40.72, -74.00),
        ];
        let patterns = detect(&points, &PatternConfig::default());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].severity, Severity::Low);
    }
}
