//! In-memory TTL cache shared by the scoring components.
//!
//! Keyed by string, payloads cloned out on hit. Stale entries are evicted
//! lazily on access; an optional capacity bound evicts the oldest entry.
//! Concurrent misses on one key compute once.

mod clock;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheEntry, CacheStats, TtlCache};
