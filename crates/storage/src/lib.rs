//! Versioned ref storage for the atomref STM engine
//!
//! This crate implements the shared side of the engine:
//! - [`CellState`]: one ref's committed value, version, validator and
//!   change hook
//! - [`Snapshot`]: an immutable registry image, cloned copy-on-write
//! - [`Registry`]: the live snapshot pointer, replaced atomically via
//!   compare-and-swap
//!
//! The registry swap is the single serialization point of the whole engine;
//! all cross-ref atomicity derives from it. Readers never take a lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod registry;
pub mod snapshot;

pub use cell::{CellState, ChangeHook, Validator};
pub use registry::Registry;
pub use snapshot::Snapshot;
