//! Environmental signal providers.
//!
//! Urban density, natural barriers and commercial feature counts come from a
//! [`GeoSignalProvider`]. Two variants exist:
//!
//! - [`SimulatedSignals`]: placeholder values derived from the coordinates and
//!   a seed. Deterministic for a given seed, but not real geography.
//! - [`TabulatedSignals`]: served from supplied data (survey extracts, GIS
//!   exports), queried by distance.
//!
//! Consumers can tell them apart through [`GeoSignalProvider::is_simulated`];
//! enhanced suggestions carry that flag so placeholder data is never mistaken
//! for measured data.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::spatial::{destination, haversine_m};
use crate::types::Location;

/// Kind of obstacle separating catchment areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarrierKind {
    River,
    Highway,
    Railway,
    Park,
}

impl BarrierKind {
    const ALL: [BarrierKind; 4] = [
        BarrierKind::River,
        BarrierKind::Highway,
        BarrierKind::Railway,
        BarrierKind::Park,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BarrierKind::River => "river",
            BarrierKind::Highway => "highway",
            BarrierKind::Railway => "railway",
            BarrierKind::Park => "park",
        }
    }
}

/// A barrier near a location. `location` is the barrier's closest point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Barrier {
    pub kind: BarrierKind,
    pub location: Location,
    /// How strongly the barrier separates catchments, in [0, 1].
    pub influence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommercialFeatures {
    pub retail_count: u32,
    pub transit_stops: u32,
    pub anchor_stores: u32,
}

/// Source of environmental signals around a coordinate.
pub trait GeoSignalProvider: Send + Sync {
    /// Urban density in [0, 1].
    fn urban_density(&self, location: &Location) -> f64;

    /// Barriers within `radius_m` of `location`.
    fn barriers(&self, location: &Location, radius_m: f64) -> Vec<Barrier>;

    /// Commercial feature counts within `radius_m` of `location`.
    fn commercial_features(&self, location: &Location, radius_m: f64) -> CommercialFeatures;

    /// True when values are placeholders rather than measured data.
    fn is_simulated(&self) -> bool;
}

/// Placeholder provider: pseudo-random values keyed on rounded coordinates.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedSignals {
    seed: u64,
}

impl SimulatedSignals {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// RNG seeded from the location (rounded to ~10 m) and a purpose salt,
    /// so repeated queries for the same place agree.
    fn rng_for(&self, location: &Location, salt: u64) -> StdRng {
        let lat = (location.lat * 10_000.0).round() as i64 as u64;
        let lng = (location.lng * 10_000.0).round() as i64 as u64;
        let mixed = splitmix(self.seed ^ splitmix(lat ^ splitmix(lng ^ salt)));
        StdRng::seed_from_u64(mixed)
    }
}

impl Default for SimulatedSignals {
    fn default() -> Self {
        Self::new(42)
    }
}

impl GeoSignalProvider for SimulatedSignals {
    fn urban_density(&self, location: &Location) -> f64 {
        self.rng_for(location, 1).gen_range(0.2..0.9)
    }

    fn barriers(&self, location: &Location, radius_m: f64) -> Vec<Barrier> {
        if radius_m <= 0.0 {
            return Vec::new();
        }
        let mut rng = self.rng_for(location, 2);
        let count = rng.gen_range(0..=2);
        (0..count)
            .map(|_| {
                let kind = BarrierKind::ALL[rng.gen_range(0..BarrierKind::ALL.len())];
                let bearing = rng.gen_range(0.0..360.0);
                let distance = rng.gen_range(0.2..0.8) * radius_m;
                Barrier {
                    kind,
                    location: destination(location, bearing, distance),
                    influence: rng.gen_range(0.1..0.9),
                }
            })
            .collect()
    }

    fn commercial_features(&self, location: &Location, radius_m: f64) -> CommercialFeatures {
        let density = self.urban_density(location);
        let mut rng = self.rng_for(location, 3);
        // Counts scale with the searched area (per km²) and density
        let area_km2 = std::f64::consts::PI * (radius_m / 1_000.0).powi(2);
        let scale = (area_km2 * density).max(0.0);
        CommercialFeatures {
            retail_count: (scale * rng.gen_range(2.0..8.0)).round() as u32,
            transit_stops: (scale * rng.gen_range(0.5..2.0)).round() as u32,
            anchor_stores: (scale * rng.gen_range(0.0..0.3)).round() as u32,
        }
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Retail,
    Transit,
    Anchor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePoint {
    pub location: Location,
    pub kind: FeatureKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCell {
    pub location: Location,
    pub density: f64,
}

/// Provider backed by supplied data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabulatedSignals {
    #[serde(default)]
    pub barriers: Vec<Barrier>,
    #[serde(default)]
    pub density_cells: Vec<DensityCell>,
    #[serde(default)]
    pub features: Vec<FeaturePoint>,
}

impl TabulatedSignals {
    /// Density reported when no cell has been supplied.
    pub const DEFAULT_DENSITY: f64 = 0.5;
}

impl GeoSignalProvider for TabulatedSignals {
    /// Density of the nearest cell.
    fn urban_density(&self, location: &Location) -> f64 {
        self.density_cells
            .iter()
            .map(|cell| (haversine_m(location, &cell.location), cell.density))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, density)| density.clamp(0.0, 1.0))
            .unwrap_or(Self::DEFAULT_DENSITY)
    }

    fn barriers(&self, location: &Location, radius_m: f64) -> Vec<Barrier> {
        self.barriers
            .iter()
            .filter(|b| haversine_m(location, &b.location) <= radius_m)
            .cloned()
            .collect()
    }

    fn commercial_features(&self, location: &Location, radius_m: f64) -> CommercialFeatures {
        let mut counts = CommercialFeatures::default();
        for feature in &self.features {
            if haversine_m(location, &feature.location) > radius_m {
                continue;
            }
            match feature.kind {
                FeatureKind::Retail => counts.retail_count += 1,
                FeatureKind::Transit => counts.transit_stops += 1,
                FeatureKind::Anchor => counts.anchor_stores += 1,
            }
        }
        counts
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_is_deterministic() {
        let signals = SimulatedSignals::new(7);
        let here = Location::new(52.52, 13.405);
        assert_eq!(signals.urban_density(&here), signals.urban_density(&here));
        assert_eq!(signals.barriers(&here, 1_000.0), signals.barriers(&here, 1_000.0));
        assert!(signals.is_simulated());

        let density = signals.urban_density(&here);
        assert!((0.2..0.9).contains(&density));
    }

    #[test]
    fn test_simulated_barriers_within_radius() {
        let signals = SimulatedSignals::new(3);
        for i in 0..20 {
            let here = Location::new(48.0 + i as f64 * 0.01, 11.0);
            for barrier in signals.barriers(&here, 800.0) {
                assert!(haversine_m(&here, &barrier.location) <= 800.0 * 0.8 + 1.0);
                assert!((0.1..0.9).contains(&barrier.influence));
            }
        }
        assert!(signals.barriers(&Location::new(48.0, 11.0), 0.0).is_empty());
    }

    #[test]
    fn test_tabulated_queries() {
        let here = Location::new(40.0, -3.7);
        let signals = TabulatedSignals {
            barriers: vec![Barrier {
                kind: BarrierKind::River,
                location: destination(&here, 0.0, 300.0),
                influence: 0.4,
            }],
            density_cells: vec![
                DensityCell {
                    location: destination(&here, 90.0, 100.0),
                    density: 0.8,
                },
                DensityCell {
                    location: destination(&here, 90.0, 5_000.0),
                    density: 0.1,
                },
            ],
            features: vec![
                FeaturePoint {
                    location: destination(&here, 180.0, 200.0),
                    kind: FeatureKind::Retail,
                },
                FeaturePoint {
                    location: destination(&here, 180.0, 250.0),
                    kind: FeatureKind::Transit,
                },
                FeaturePoint {
                    location: destination(&here, 180.0, 9_000.0),
                    kind: FeatureKind::Retail,
                },
            ],
        };

        assert_eq!(signals.urban_density(&here), 0.8);
        assert_eq!(signals.barriers(&here, 500.0).len(), 1);
        assert!(signals.barriers(&here, 200.0).is_empty());

        let features = signals.commercial_features(&here, 1_000.0);
        assert_eq!(features.retail_count, 1);
        assert_eq!(features.transit_stops, 1);
        assert!(!signals.is_simulated());

        assert_eq!(
            TabulatedSignals::default().urban_density(&here),
            TabulatedSignals::DEFAULT_DENSITY
        );
    }
}
