//! History entry model.
//!
//! # Responsibility
//! - Wrap one committed `ChangeRecord` with identity and descriptive metadata.
//! - Expose a serializable metadata view for status and journal boundaries.
//!
//! # Invariants
//! - `EntryId` values are assigned by `History` and never reused.
//! - Entries are immutable once created.

use crate::model::change::ChangeRecord;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of one history entry.
///
/// `EntryId::INITIAL` (0) is the cursor value meaning "nothing applied".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl EntryId {
    pub const INITIAL: EntryId = EntryId(0);

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntryId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Serializable metadata of one entry, without its change payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub id: EntryId,
    pub description: String,
    /// Tag reported by `ChangeRecord::kind`.
    pub kind: String,
    /// Unix epoch milliseconds.
    pub created_at_ms: i64,
}

/// One committed change plus its metadata.
pub struct HistoryEntry<T: ?Sized> {
    id: EntryId,
    description: String,
    created_at_ms: i64,
    change: Box<dyn ChangeRecord<T>>,
}

impl<T: ?Sized> HistoryEntry<T> {
    pub(crate) fn new(
        id: EntryId,
        description: impl Into<String>,
        created_at_ms: i64,
        change: Box<dyn ChangeRecord<T>>,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            created_at_ms,
            change,
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    pub fn change(&self) -> &dyn ChangeRecord<T> {
        self.change.as_ref()
    }

    pub fn meta(&self) -> EntryMeta {
        EntryMeta {
            id: self.id,
            description: self.description.clone(),
            kind: self.change.kind().to_string(),
            created_at_ms: self.created_at_ms,
        }
    }
}

impl<T: ?Sized> Debug for HistoryEntry<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("kind", &self.change.kind())
            .field("created_at_ms", &self.created_at_ms)
            .finish()
    }
}

/// Current wall-clock time in unix epoch milliseconds.
///
/// Clocks set before the epoch collapse to 0.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
