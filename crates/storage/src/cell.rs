//! Per-ref state record
//!
//! A [`CellState`] is the unit stored in the registry: the committed value,
//! a version counter, an optional validator and an optional change hook.
//!
//! Versioning invariant: the version is non-decreasing for a given ref and
//! advances by exactly one per committed write or commute application. Local
//! transaction buffers use [`CellState::replaced`] (same version, new value)
//! so the base version survives until commit compares it against the live
//! registry; the commit path uses [`CellState::advanced`].

use atomref_core::DynValue;
use std::sync::Arc;

/// Commit-time invariant check for a ref
///
/// Runs against the candidate value before it is installed. Returning
/// `false` fails the whole transaction with `ValidationFailed`; the engine
/// never retries a validator rejection. Validators must be pure: they may
/// run on any attempt, including attempts that later conflict.
pub type Validator = Arc<dyn Fn(&DynValue) -> bool + Send + Sync>;

/// Post-commit observer for a ref
///
/// Invoked with the newly committed value after a successful commit, outside
/// any atomic section. Hooks never block commits and never observe partial
/// state.
pub type ChangeHook = Arc<dyn Fn(&DynValue) + Send + Sync>;

/// Committed state of a single ref
#[derive(Clone)]
pub struct CellState {
    value: DynValue,
    version: u64,
    validator: Option<Validator>,
    on_change: Option<ChangeHook>,
}

impl CellState {
    /// Create the initial state for a new ref, at version 0
    pub fn new(value: DynValue) -> Self {
        CellState {
            value,
            version: 0,
            validator: None,
            on_change: None,
        }
    }

    /// Create the initial state with a validator attached
    ///
    /// The initial value is installed as-is; validators gate commits, not
    /// allocation.
    pub fn guarded(value: DynValue, validator: Validator) -> Self {
        CellState {
            value,
            version: 0,
            validator: Some(validator),
            on_change: None,
        }
    }

    /// The committed value as of [`CellState::version`]
    pub fn value(&self) -> &DynValue {
        &self.value
    }

    /// Version counter; +1 per committed mutation of this ref
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The change hook, if one is installed
    pub fn hook(&self) -> Option<&ChangeHook> {
        self.on_change.as_ref()
    }

    /// Run the validator against a candidate value
    ///
    /// A ref without a validator accepts everything.
    pub fn validate(&self, candidate: &DynValue) -> bool {
        match &self.validator {
            Some(check) => check(candidate),
            None => true,
        }
    }

    /// Successor state: new value, version advanced by one
    ///
    /// Validator and hook carry over unchanged. Used only on the commit
    /// path.
    pub fn advanced(&self, value: DynValue) -> Self {
        CellState {
            value,
            version: self.version + 1,
            validator: self.validator.clone(),
            on_change: self.on_change.clone(),
        }
    }

    /// Same-version replacement: new value, version untouched
    ///
    /// Used by transaction-local buffers, which must keep the snapshot
    /// version intact for commit-time comparison.
    pub fn replaced(&self, value: DynValue) -> Self {
        CellState {
            value,
            version: self.version,
            validator: self.validator.clone(),
            on_change: self.on_change.clone(),
        }
    }

    /// Copy of this state with the change hook installed or replaced
    pub fn with_hook(&self, hook: ChangeHook) -> Self {
        CellState {
            value: self.value.clone(),
            version: self.version,
            validator: self.validator.clone(),
            on_change: Some(hook),
        }
    }
}

impl std::fmt::Debug for CellState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellState")
            .field("value", &self.value)
            .field("version", &self.version)
            .field("validator", &self.validator.is_some())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}
