//! Type-erased cell values
//!
//! The registry stores refs of heterogeneous value types behind a single
//! record type. [`DynValue`] erases the concrete type behind
//! `Arc<dyn Any + Send + Sync>` and offers a typed accessor that fails fast
//! with [`StmError::WrongType`] on mismatch, so no unchecked casts exist
//! anywhere in the engine.
//!
//! Cloning a `DynValue` bumps a refcount; the underlying value is immutable
//! and shared. New values are produced by constructing a fresh `DynValue`,
//! never by mutating in place.

use crate::error::{Result, StmError};
use std::any::Any;
use std::sync::Arc;

/// A shareable, immutable, type-erased value
#[derive(Clone)]
pub struct DynValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl DynValue {
    /// Erase a concrete value
    pub fn new<A: Any + Send + Sync>(value: A) -> Self {
        DynValue {
            value: Arc::new(value),
            type_name: std::any::type_name::<A>(),
        }
    }

    /// Name of the stored concrete type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether the stored value is of type `A`
    pub fn is<A: Any>(&self) -> bool {
        self.value.is::<A>()
    }

    /// Borrow the stored value as `A`, if the types match
    pub fn downcast_ref<A: Any>(&self) -> Option<&A> {
        self.value.downcast_ref::<A>()
    }

    /// Clone the stored value out as `A`
    ///
    /// Fails with [`StmError::WrongType`] if the stored type is not `A`.
    pub fn extract<A: Any + Clone>(&self) -> Result<A> {
        self.downcast_ref::<A>()
            .cloned()
            .ok_or(StmError::WrongType {
                expected: std::any::type_name::<A>(),
                actual: self.type_name,
            })
    }
}

impl std::fmt::Debug for DynValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynValue")
            .field("type", &self.type_name)
            .finish()
    }
}
