//! Normalisation and dispersion statistics.

use crate::types::Location;

use super::haversine_m;

/// Map `value` from `[min, max]` onto `[0, 1]`, clamping outside values.
///
/// A degenerate range (`min == max`) maps everything to 0.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 || !span.is_finite() || !value.is_finite() {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance.
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Standard deviation over mean. `None` when empty or the mean is not positive.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    Some(variance(values)?.sqrt() / m)
}

/// `1 − CV` clamped to [0, 1]; 0 with fewer than two values.
///
/// Higher means more uniform spacing, i.e. a more artificial arrangement.
pub fn regularity(spacings: &[f64]) -> f64 {
    if spacings.len() < 2 {
        return 0.0;
    }
    coefficient_of_variation(spacings)
        .map(|cv| (1.0 - cv).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// Triangle-inequality slack of `p1 → p2 → p3` with `p2` as the middle point.
///
/// 1 when `p2` lies on the segment `p1..p3`, falling as the detour grows.
pub fn linearity(p1: &Location, p2: &Location, p3: &Location) -> f64 {
    let path = haversine_m(p1, p2) + haversine_m(p2, p3);
    if path <= 0.0 {
        return 0.0;
    }
    (1.0 - (haversine_m(p1, p3) - path).abs() / path).clamp(0.0, 1.0)
}

/// Linearity of an unordered triple: the best of the three middle choices.
pub fn best_linearity(a: &Location, b: &Location, c: &Location) -> f64 {
    linearity(a, b, c)
        .max(linearity(b, a, c))
        .max(linearity(a, c, b))
}
