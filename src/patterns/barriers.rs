//! Natural barrier adjustment.
//!
//! A river or highway between two sites separates their catchments, so sites
//! on opposite sides can sit closer than the raw distance suggests. The
//! strongest barrier near a location either already provides that separation
//! (high influence) or is too weak, in which case the location is moved away
//! from it in proportion to its influence.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PatternDetector;
use crate::signals::Barrier;
use crate::spatial::{bearing_deg, destination, haversine_m};
use crate::types::Location;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarrierAdjustment {
    pub original: Location,
    pub adjusted: Location,
    pub barriers: Vec<Barrier>,
    pub reasoning: Vec<String>,
}

impl BarrierAdjustment {
    pub fn moved(&self) -> bool {
        !self.original.same_point(&self.adjusted)
    }
}

impl PatternDetector {
    /// Adjust `location` for the natural barriers around it.
    pub fn consider_natural_barriers(
        &self,
        location: &Location,
        existing: &[Location],
        radius_m: f64,
    ) -> BarrierAdjustment {
        let barriers = self.signals().barriers(location, radius_m);
        let mut reasoning = Vec::new();
        let mut adjusted = location.clone();

        let strongest = barriers
            .iter()
            .filter(|b| b.influence.is_finite())
            .max_by(|a, b| a.influence.total_cmp(&b.influence));

        match strongest {
            None => reasoning.push(format!("No natural barriers within {radius_m:.0} m")),
            Some(barrier) => {
                let distance = haversine_m(location, &barrier.location);
                let threshold = self.config().barrier_influence_threshold;
                if barrier.influence < threshold {
                    let shift = barrier.influence.clamp(0.0, 1.0) * self.config().max_barrier_offset_m;
                    // Bearing from the barrier to the site; due north when they coincide
                    let away = if distance > 0.0 {
                        bearing_deg(&barrier.location, location)
                    } else {
                        0.0
                    };
                    adjusted = destination(location, away, shift);
                    reasoning.push(format!(
                        "Weak {} (influence {:.2}) {:.0} m away: moved {:.0} m further from it",
                        barrier.kind.label(),
                        barrier.influence,
                        distance,
                        shift
                    ));
                } else {
                    reasoning.push(format!(
                        "{} (influence {:.2}) {:.0} m away already separates catchments",
                        capitalize(barrier.kind.label()),
                        barrier.influence,
                        distance
                    ));
                }
            }
        }

        let in_radius = existing
            .iter()
            .filter(|e| e.is_finite() && haversine_m(location, e) <= radius_m)
            .count();
        reasoning.push(format!("{in_radius} existing locations within {radius_m:.0} m"));

        let nearest = existing
            .iter()
            .filter(|e| e.is_finite())
            .map(|e| haversine_m(&adjusted, e))
            .min_by(f64::total_cmp);
        match nearest {
            Some(d) => reasoning.push(format!("Nearest existing location is {d:.0} m away")),
            None => reasoning.push("No existing locations to compare against".to_string()),
        }

        debug!(
            barriers = barriers.len(),
            moved = !location.same_point(&adjusted),
            "barrier adjustment"
        );

        BarrierAdjustment {
            original: location.clone(),
            adjusted,
            barriers,
            reasoning,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
