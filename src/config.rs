//! Configuration loading from sitescout.toml.
//!
//! Search order mirrors common Rust/Python tooling:
//! 1. `sitescout.toml` in the given directory
//! 2. Walk up parent directories for `sitescout.toml`
//! 3. Built-in defaults
//!
//! Every key is optional; missing keys keep their defaults.
//!
//! ## Example
//!
//! ```toml
//! seed = 7
//!
//! [scoring]
//! population-cap = 250000
//! competition-weight = 0.3
//!
//! [cannibalization]
//! radius-m = 4000
//!
//! [patterns]
//! cluster-radius-m = 750
//!
//! [cache]
//! ttl-secs = 600
//! capacity = 10000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SiteError;

/// File name searched for by [`EngineConfig::load`].
pub const CONFIG_FILE: &str = "sitescout.toml";

/// Gravity scorer weights and constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScoringConfig {
    /// Population at which the demand term saturates.
    pub population_cap: f64,
    pub population_weight: f64,
    pub footfall_weight: f64,
    pub income_weight: f64,
    /// Supply penalty when a store already sits on the candidate.
    pub max_supply_penalty: f64,
    /// Distance below which supply counts as saturated.
    pub supply_reference_distance_m: f64,
    pub competition_weight: f64,
    /// Maps signal variance onto confidence; 2/9 variance reaches the floor.
    pub confidence_variance_factor: f64,
    /// Confidence taken off modelled (non-live) candidates.
    pub modeled_confidence_discount: f64,
    pub default_limit: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            population_cap: 200_000.0,
            population_weight: 0.5,
            footfall_weight: 0.3,
            income_weight: 0.2,
            max_supply_penalty: 0.3,
            supply_reference_distance_m: 500.0,
            competition_weight: 0.25,
            confidence_variance_factor: 2.925,
            modeled_confidence_discount: 0.05,
            default_limit: 50,
        }
    }
}

/// Cannibalization model thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CannibalizationConfig {
    /// Outlets beyond this distance are ignored.
    pub radius_m: f64,
    pub decay_floor: f64,
    /// Cap on the modelled loss of any single outlet.
    pub max_outlet_impact: f64,
    /// Impact above which an outlet is reported as affected.
    pub affected_threshold: f64,
    pub high_single_impact: f64,
    pub high_aggregate_impact: f64,
    pub medium_aggregate_impact: f64,
    /// More affected outlets than this is at least MEDIUM.
    pub medium_affected_count: usize,
    /// Turnover that maps to performance 1.0.
    pub reference_turnover: f64,
}

impl Default for CannibalizationConfig {
    fn default() -> Self {
        Self {
            radius_m: 5_000.0,
            decay_floor: 0.1,
            max_outlet_impact: 0.3,
            affected_threshold: 0.05,
            high_single_impact: 0.15,
            high_aggregate_impact: 0.3,
            medium_aggregate_impact: 0.15,
            medium_affected_count: 2,
            reference_turnover: 1_000_000.0,
        }
    }
}

/// Pattern detection thresholds and perturbation bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PatternConfig {
    pub min_locations: usize,
    pub analysis_radius_m: f64,
    pub regularity_threshold: f64,
    pub high_regularity: f64,
    pub linearity_threshold: f64,
    pub cluster_radius_m: f64,
    pub compactness_threshold: f64,
    pub max_alternatives: usize,
    pub grid_jitter_m: f64,
    pub linear_offset_min_m: f64,
    pub linear_offset_max_m: f64,
    pub radial_variation_min: f64,
    pub radial_variation_max: f64,
    pub cluster_push_m: f64,
    /// Placeholder viability until alternatives are re-scored.
    pub alternative_viability: f64,
    pub barrier_influence_threshold: f64,
    pub max_barrier_offset_m: f64,
    /// Jitter applied at target density 0.
    pub spacing_jitter_m: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_locations: 3,
            analysis_radius_m: 5_000.0,
            regularity_threshold: 0.7,
            high_regularity: 0.9,
            linearity_threshold: 0.8,
            cluster_radius_m: 500.0,
            compactness_threshold: 0.6,
            max_alternatives: 3,
            grid_jitter_m: 250.0,
            linear_offset_min_m: 150.0,
            linear_offset_max_m: 400.0,
            radial_variation_min: 0.15,
            radial_variation_max: 0.35,
            cluster_push_m: 300.0,
            alternative_viability: 0.7,
            barrier_influence_threshold: 0.7,
            max_barrier_offset_m: 400.0,
            spacing_jitter_m: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3_600,
            capacity: None,
        }
    }
}

/// sitescout configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Source file for this config (for display).
    pub source: Option<PathBuf>,
    /// Seed for every randomised step.
    pub seed: u64,
    pub scoring: ScoringConfig,
    pub cannibalization: CannibalizationConfig,
    pub patterns: PatternConfig,
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source: None,
            seed: 42,
            scoring: ScoringConfig::default(),
            cannibalization: CannibalizationConfig::default(),
            patterns: PatternConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Raw config as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    seed: Option<u64>,
    scoring: Option<ScoringConfig>,
    cannibalization: Option<CannibalizationConfig>,
    patterns: Option<PatternConfig>,
    cache: Option<CacheConfig>,
}

impl EngineConfig {
    /// Load configuration for the given directory.
    ///
    /// Unreadable or malformed files are logged and skipped.
    pub fn load(directory: &Path) -> Self {
        let mut current = Some(directory);
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                match Self::from_file(&candidate) {
                    Ok(config) => return config,
                    Err(e) => warn!("ignoring {}: {}", candidate.display(), e),
                }
            }
            current = dir.parent();
        }

        Self::default()
    }

    /// Load an explicit config file. Unlike [`load`](Self::load), failures
    /// are returned.
    pub fn from_file(path: &Path) -> Result<Self, SiteError> {
        let config_error = |message: String| SiteError::Config {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let raw: RawConfig = toml::from_str(&content).map_err(|e| config_error(e.to_string()))?;
        Ok(Self::from_raw(raw, path.to_path_buf()))
    }

    fn from_raw(raw: RawConfig, source: PathBuf) -> Self {
        let defaults = Self::default();
        Self {
            source: Some(source),
            seed: raw.seed.unwrap_or(defaults.seed),
            scoring: raw.scoring.unwrap_or(defaults.scoring),
            cannibalization: raw.cannibalization.unwrap_or(defaults.cannibalization),
            patterns: raw.patterns.unwrap_or(defaults.patterns),
            cache: raw.cache.unwrap_or(defaults.cache),
        }
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        if let Some(ref source) = self.source {
            lines.push(format!("   Config: {}", source.display()));
        } else {
            lines.push("   Config: (defaults)".to_string());
        }

        lines.push(format!("   Seed: {}", self.seed));
        lines.push(format!(
            "   Demand weights: population {:.2}, footfall {:.2}, income {:.2}",
            self.scoring.population_weight, self.scoring.footfall_weight, self.scoring.income_weight
        ));
        lines.push(format!(
            "   Cannibalization radius: {:.0} m",
            self.cannibalization.radius_m
        ));
        lines.push(format!(
            "   Pattern radius: {:.0} m (cluster {:.0} m)",
            self.patterns.analysis_radius_m, self.patterns.cluster_radius_m
        ));

        let capacity = self
            .cache
            .capacity
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        lines.push(format!("   Cache: ttl {}s, {}", self.cache.ttl_secs, capacity));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_weights_sum_to_one() {
        let config = ScoringConfig::default();
        let sum = config.population_weight + config.footfall_weight + config.income_weight;
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(config.population_weight > config.footfall_weight);
        assert!(config.population_weight > config.income_weight);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "seed = 7\n[scoring]\ncompetition-weight = 0.4\n[cache]\nttl-secs = 5\n",
        )
        .unwrap();

        let config = EngineConfig::load(dir.path());
        assert_eq!(config.seed, 7);
        assert_eq!(config.scoring.competition_weight, 0.4);
        assert_eq!(config.scoring.population_cap, 200_000.0);
        assert_eq!(config.cache.ttl_secs, 5);
        assert_eq!(config.cannibalization, CannibalizationConfig::default());
        assert!(config.source.is_some());
    }

    #[test]
    fn test_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[patterns]\ncluster-radius-m = 900\n").unwrap();

        let config = EngineConfig::load(&nested);
        assert_eq!(config.patterns.cluster_radius_m, 900.0);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "seed = \"not a number\"").unwrap();

        let config = EngineConfig::load(dir.path());
        assert_eq!(config.seed, EngineConfig::default().seed);
        assert!(matches!(
            EngineConfig::from_file(&path),
            Err(SiteError::Config { .. })
        ));
    }

    #[test]
    fn test_display_summary() {
        let summary = EngineConfig::default().display_summary();
        assert!(summary.contains("(defaults)"));
        assert!(summary.contains("unbounded"));
    }
}
