//! Immutable registry snapshots
//!
//! A [`Snapshot`] is one committed image of the whole registry. The live
//! registry holds the current snapshot behind an atomic pointer; commits
//! clone the map, mutate the clone and swap the pointer. Cloning is cheap
//! relative to registry size: each entry clone is a handful of refcount
//! bumps, never a deep value copy.
//!
//! Keys iterate in ref-id order, which makes change delivery and test
//! output deterministic.

use crate::cell::CellState;
use atomref_core::RefId;
use std::collections::BTreeMap;

/// One immutable image of the ref registry
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    cells: BTreeMap<RefId, CellState>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Snapshot::default()
    }

    /// Look up a ref's state
    pub fn get(&self, id: RefId) -> Option<&CellState> {
        self.cells.get(&id)
    }

    /// Check whether a ref is present
    pub fn contains(&self, id: RefId) -> bool {
        self.cells.contains_key(&id)
    }

    /// Install or replace a ref's state
    pub fn insert(&mut self, id: RefId, state: CellState) {
        self.cells.insert(id, state);
    }

    /// Remove a ref's state, returning it if present
    pub fn remove(&mut self, id: RefId) -> Option<CellState> {
        self.cells.remove(&id)
    }

    /// Number of live refs in this image
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check whether the image holds no refs
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate entries in ref-id order
    pub fn iter(&self) -> impl Iterator<Item = (RefId, &CellState)> {
        self.cells.iter().map(|(id, state)| (*id, state))
    }
}
