//! Geometric pattern detection and spacing adjustment.
//!
//! A network of sites that sits on a lattice, a straight road, a ring or a
//! tight knot looks planned by formula rather than by market. This module
//! finds those arrangements and proposes coordinates that break them.
//!
//! ## Detectors
//!
//! | Pattern | Signal | Emitted when |
//! |---|---|---|
//! | grid | `1 − CV` of consecutive axis spacings | both axes > 0.7 |
//! | linear | triangle-inequality slack of triples | linearity > 0.8 |
//! | radial | `1 − CV` of distances from a centre site | > 0.7 with ≥ 3 others |
//! | cluster | `1 − mean/max` distance to centroid | compactness > 0.6, ≥ 3 sites |
//!
//! The overall score is the severity-weighted mean of pattern confidences
//! (HIGH 3, MEDIUM 2, LOW 1).
//!
//! ## Error contract
//!
//! Unlike the scorer and the assessor, which degrade to fallbacks, the
//! detector returns `anyhow::Error` on malformed input (non-finite
//! coordinates). Too few points is not an error: it yields an empty analysis
//! with an explanatory recommendation.
//!
//! ## Randomness
//!
//! Alternatives and spacing jitter draw from a `StdRng` seeded at
//! construction, so a detector built with the same seed reproduces its
//! output.

mod alternatives;
mod barriers;
mod cluster;
mod detector;
mod grid;
mod linear;
mod radial;
mod spacing;

pub use barriers::BarrierAdjustment;
pub use detector::{aggregate_score, PatternDetector, INSUFFICIENT_DATA};
pub use spacing::SpacingVariation;

pub(crate) use detector::ensure_finite;
