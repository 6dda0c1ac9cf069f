//! Reversible change contracts.
//!
//! # Responsibility
//! - Define the boundary between the history engine and the mutated dataset.
//! - Keep concrete change content (column transforms, row edits) outside core.
//!
//! # Invariants
//! - `apply` followed by `revert` must leave the target observably unchanged.
//! - The engine only ever reaches the dataset through `ChangeTarget`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ChangeResult<T> = Result<T, ChangeError>;

/// Failure reported by one change record or by the target applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeError {
    /// Stable machine-readable code, e.g. `column_missing`.
    pub code: String,
    pub message: String,
}

impl ChangeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Display for ChangeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error for ChangeError {}

/// One reversible mutation of a target dataset.
///
/// Records have no identity of their own; `History` wraps each one in a
/// `HistoryEntry` when it is committed.
pub trait ChangeRecord<T: ?Sized>: Send + Sync {
    fn apply(&self, target: &mut T) -> ChangeResult<()>;
    fn revert(&self, target: &mut T) -> ChangeResult<()>;

    /// Stable tag used in logs and persisted journal rows.
    fn kind(&self) -> &str {
        "change"
    }
}

/// Data-model side of the engine boundary.
///
/// The defaults delegate straight to the record. Targets override them when
/// they keep derived state (indexes, caches) that must follow every change.
pub trait ChangeTarget {
    fn apply_change(&mut self, record: &dyn ChangeRecord<Self>) -> ChangeResult<()> {
        record.apply(self)
    }

    fn revert_change(&mut self, record: &dyn ChangeRecord<Self>) -> ChangeResult<()> {
        record.revert(self)
    }
}
