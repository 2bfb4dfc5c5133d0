//! Cannibalization risk: how much revenue a new site would take from the
//! outlets already trading around it.
//!
//! ```text
//! decay(d)   = max(floor, 1 / (1 + (3d / R)²))        R = radius (5 km)
//! impact     = min(cap, decay(d) · (0.5 + 0.5·performance))
//! aggregate  = Σ impact of affected outlets (impact > threshold)
//! ```
//!
//! Strong outlets lose more in absolute terms, so performance scales the
//! impact up. Outlets beyond `R` are ignored outright.
//!
//! ## Failure behaviour
//!
//! The assessor never returns an error:
//! - bad outlet rows are logged and skipped
//! - an invalid new location yields a LOW fallback
//! - a failing outlet query ([`CannibalizationAssessor::assess_in_store`])
//!   yields a MEDIUM fallback
//!
//! Fallback results carry `is_fallback = true`.

mod assessor;
mod mitigation;

pub use assessor::CannibalizationAssessor;
pub use mitigation::{fallback_mitigations, mitigations_for};
