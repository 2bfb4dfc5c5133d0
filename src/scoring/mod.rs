//! Gravity-model scoring - from raw area signals to ranked candidates.
//!
//! The scorer combines:
//! - Demand: population (dominant), footfall and income
//! - Supply penalty: proximity of the nearest existing store
//! - Competition penalty: competitor presence
//! - Confidence: agreement between the demand signals

mod gravity;

pub use gravity::{GravityScorer, ScoreBreakdown};
