//! Terminal rendering for selection reports.
//!
//! - `colors`: badges and semantic coloring (owo-colors), with a plain mode
//! - `report`: the per-suggestion text report printed by the CLI

mod colors;
mod report;

pub use colors::{Badge, Colorizer};
pub use report::ReportRenderer;
