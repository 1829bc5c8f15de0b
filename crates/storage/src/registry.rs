//! The live ref registry
//!
//! [`Registry`] owns the current [`Snapshot`] behind an [`ArcSwap`] pointer.
//! All mutation funnels through [`Registry::try_swap`]: load the current
//! snapshot, build a candidate from it, then compare-and-swap the pointer.
//! A pointer race (another swap won in between) transparently re-runs the
//! builder against the fresh snapshot; a builder error cancels the swap and
//! propagates.
//!
//! Reads never lock: [`Registry::current`] and [`Registry::snapshot`] load
//! the pointer and work on whatever committed image it names. Any two
//! readers observe states from one linear sequence of committed snapshots.
//!
//! Construct one `Registry` per isolated memory domain; nothing here is a
//! process-wide static.

use crate::cell::CellState;
use crate::snapshot::Snapshot;
use arc_swap::ArcSwap;
use atomref_core::RefId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-local versioned store mapping ref ids to their current state
pub struct Registry {
    snap: ArcSwap<Snapshot>,
    /// Successful pointer swaps. Read-only transactions never bump this,
    /// which makes no-op idempotence directly observable.
    swaps: AtomicU64,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Registry {
            snap: ArcSwap::from_pointee(Snapshot::new()),
            swaps: AtomicU64::new(0),
        }
    }

    /// The current committed snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snap.load_full()
    }

    /// A ref's state as of the latest successful swap
    pub fn current(&self, id: RefId) -> Option<CellState> {
        self.snap.load().get(id).cloned()
    }

    /// Number of live refs
    pub fn len(&self) -> usize {
        self.snap.load().len()
    }

    /// Check whether the registry holds no refs
    pub fn is_empty(&self) -> bool {
        self.snap.load().is_empty()
    }

    /// Count of successful snapshot swaps since construction
    pub fn swap_count(&self) -> u64 {
        self.swaps.load(Ordering::Relaxed)
    }

    /// Install a new ref at version 0, returning its id
    ///
    /// Allocation never conflicts with concurrent operations on other refs;
    /// it only re-runs its own insert if the pointer raced.
    pub fn allocate(&self, state: CellState) -> RefId {
        let id = RefId::allocate();
        let installed: Result<_, std::convert::Infallible> = self.try_swap(|snap| {
            let mut next = snap.clone();
            next.insert(id, state.clone());
            Ok(next)
        });
        match installed {
            Ok(_) => {
                tracing::debug!(ref_id = %id, "allocated ref");
                id
            }
            Err(never) => match never {},
        }
    }

    /// Remove a ref's entry
    ///
    /// Safe to call while other code still holds the id; a missing entry is
    /// a no-op and does not count as a swap.
    pub fn finalize(&self, id: RefId) {
        let removed: Result<_, ()> = self.try_swap(|snap| {
            if !snap.contains(id) {
                return Err(());
            }
            let mut next = snap.clone();
            next.remove(id);
            Ok(next)
        });
        if removed.is_ok() {
            tracing::debug!(ref_id = %id, "finalized ref");
        }
    }

    /// Atomically replace the registry with the result of a pure builder
    ///
    /// The builder receives the current snapshot and returns a candidate.
    /// If another swap lands between the load and the compare-and-swap, the
    /// builder is re-run against the new current snapshot, so it must be
    /// free of effects other than constructing its result. Returning `Err`
    /// cancels the attempt without installing anything; nothing partial is
    /// ever visible.
    ///
    /// On success, returns the snapshot that was installed.
    pub fn try_swap<E>(
        &self,
        mut build: impl FnMut(&Snapshot) -> Result<Snapshot, E>,
    ) -> Result<Arc<Snapshot>, E> {
        loop {
            let cur = self.snap.load_full();
            let next = Arc::new(build(&cur)?);
            let prev = self.snap.compare_and_swap(&cur, next.clone());
            if Arc::ptr_eq(&prev, &cur) {
                self.swaps.fetch_add(1, Ordering::Relaxed);
                return Ok(next);
            }
            tracing::trace!("registry swap raced, rebuilding candidate");
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("refs", &self.len())
            .field("swaps", &self.swap_count())
            .finish()
    }
}
