//! Fixed mitigation catalogue keyed by risk level.

use crate::types::RiskLevel;

const HIGH: &[&str] = &[
    "Relocate the site further from the most affected outlets",
    "Differentiate the format or product range from nearby outlets",
    "Target a different customer segment than the existing outlets serve",
];

const MEDIUM: &[&str] = &[
    "Coordinate marketing and promotions with nearby outlets",
    "Consider a smaller or complementary store format",
];

const LOW: &[&str] = &["Proceed with the site and monitor nearby outlet performance after opening"];

const FALLBACK: &[&str] = &[
    "Outlet data was unavailable; verify nearby outlet performance manually",
    "Coordinate marketing and promotions with nearby outlets",
];

pub fn mitigations_for(risk: RiskLevel) -> Vec<String> {
    let catalogue = match risk {
        RiskLevel::High => HIGH,
        RiskLevel::Medium => MEDIUM,
        RiskLevel::Low => LOW,
    };
    catalogue.iter().map(|s| s.to_string()).collect()
}

/// Generic advice attached when the assessment could not run.
pub fn fallback_mitigations() -> Vec<String> {
    FALLBACK.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_sizes() {
        assert_eq!(mitigations_for(RiskLevel::High).len(), 3);
        assert_eq!(mitigations_for(RiskLevel::Medium).len(), 2);
        assert_eq!(mitigations_for(RiskLevel::Low).len(), 1);
        assert!(!fallback_mitigations().is_empty());
    }
}
