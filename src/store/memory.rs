//! In-memory store with an R-tree over outlet coordinates.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use tracing::warn;

use super::SiteStore;
use crate::error::Result;
use crate::types::{BoundingBox, Candidate, OutletRecord, Scope};

/// R-tree entry: `[lng, lat]` plus the index into `outlets`.
type IndexedOutlet = GeomWithData<[f64; 2], usize>;

pub struct MemoryStore {
    outlets: Vec<OutletRecord>,
    index: RTree<IndexedOutlet>,
    candidates: Mutex<BTreeMap<String, Candidate>>,
}

impl MemoryStore {
    /// Build a store; outlets with non-finite coordinates are not indexed.
    pub fn new(outlets: Vec<OutletRecord>, candidates: Vec<Candidate>) -> Self {
        let entries: Vec<IndexedOutlet> = outlets
            .iter()
            .enumerate()
            .filter_map(|(i, outlet)| {
                if !outlet.location.is_finite() {
                    warn!(outlet = outlet.id.as_str(), "not indexing outlet with invalid coordinates");
                    return None;
                }
                Some(GeomWithData::new([outlet.location.lng, outlet.location.lat], i))
            })
            .collect();

        let candidates = candidates.into_iter().map(|c| (c.id.clone(), c)).collect();

        Self {
            outlets,
            index: RTree::bulk_load(entries),
            candidates: Mutex::new(candidates),
        }
    }

    /// Current stored state of a candidate.
    pub fn candidate(&self, id: &str) -> Option<Candidate> {
        self.candidates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn outlet_count(&self) -> usize {
        self.outlets.len()
    }
}

impl SiteStore for MemoryStore {
    fn outlets_in(&self, bounds: &BoundingBox) -> Result<Vec<OutletRecord>> {
        let envelope = AABB::from_corners(
            [bounds.min_lng, bounds.min_lat],
            [bounds.max_lng, bounds.max_lat],
        );
        let mut found: Vec<usize> = self
            .index
            .locate_in_envelope(&envelope)
            .map(|entry| entry.data)
            .collect();
        // Stable output order regardless of tree layout
        found.sort_unstable();
        Ok(found.into_iter().map(|i| self.outlets[i].clone()).collect())
    }

    fn candidates_in(&self, scope: Option<&Scope>) -> Result<Vec<Candidate>> {
        let candidates = self.candidates.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(candidates
            .values()
            .filter(|c| scope.map_or(true, |s| s.matches(c)))
            .cloned()
            .collect())
    }

    fn save_scores(&self, candidate: &Candidate) -> Result<()> {
        let mut candidates = self.candidates.lock().unwrap_or_else(PoisonError::into_inner);
        candidates.insert(candidate.id.clone(), candidate.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn record(id: &str, lat: f64, lng: f64) -> OutletRecord {
        OutletRecord {
            id: id.into(),
            location: Location::new(lat, lng),
            turnover: None,
            status: None,
            opened_on: None,
        }
    }

    #[test]
    fn test_outlets_in_bounds() {
        let store = MemoryStore::new(
            vec![
                record("a", 40.71, -74.00),
                record("b", 40.72, -74.01),
                record("far", 34.05, -118.24),
                record("bad", f64::NAN, -74.0),
            ],
            vec![],
        );
        let bounds = BoundingBox {
            min_lat: 40.7,
            min_lng: -74.05,
            max_lat: 40.8,
            max_lng: -73.95,
        };
        let ids: Vec<String> = store.outlets_in(&bounds).unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.outlet_count(), 4);
    }

    #[test]
    fn test_candidates_in_scope_and_save() {
        let mut c1 = Candidate::new("c1", Location::new(51.5, -0.1));
        c1.country = Some("GB".into());
        let mut c2 = Candidate::new("c2", Location::new(48.8, 2.3));
        c2.country = Some("FR".into());
        let store = MemoryStore::new(vec![], vec![c1.clone(), c2]);

        let found = store.candidates_in(Some(&Scope::country("GB"))).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c1");
        assert_eq!(store.candidates_in(None).unwrap().len(), 2);

        c1.final_score = 0.8;
        store.save_scores(&c1).unwrap();
        assert_eq!(store.candidate("c1").unwrap().final_score, 0.8);
    }
}
