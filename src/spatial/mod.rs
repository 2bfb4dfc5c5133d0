//! Geo utilities shared by every scoring component.
//!
//! - `distance`: great-circle distance, bearing, destination, centroid
//! - `measures`: normalisation, dispersion and regularity statistics
//!
//! Distances are metres on a spherical Earth (haversine). The scale of the
//! problem (sites a few kilometres apart) makes the ellipsoid correction
//! irrelevant next to the uncertainty in the input signals.

mod distance;
mod measures;

pub use distance::{
    bearing_deg, centroid, destination, haversine_m, metres_to_degrees, offset_m, to_point,
};
pub use measures::{
    best_linearity, coefficient_of_variation, linearity, mean, normalize, regularity, variance,
};
