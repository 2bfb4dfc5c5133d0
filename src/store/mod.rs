//! Storage collaborator boundary.
//!
//! The engine reads outlets by bounding box and candidates by scope, and
//! writes derived scores back during recompute. Anything that can answer
//! those three queries can back the engine; [`MemoryStore`] is the
//! in-process implementation used by the CLI and tests.

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{BoundingBox, Candidate, OutletRecord, Scope};

pub trait SiteStore: Send + Sync {
    /// Outlet records whose coordinates fall inside `bounds`.
    fn outlets_in(&self, bounds: &BoundingBox) -> Result<Vec<OutletRecord>>;

    /// Candidates belonging to `scope`, or every candidate without one.
    fn candidates_in(&self, scope: Option<&Scope>) -> Result<Vec<Candidate>>;

    /// Persist the derived fields of a scored candidate.
    fn save_scores(&self, candidate: &Candidate) -> Result<()>;
}
