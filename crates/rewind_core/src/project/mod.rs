//! Project: one dataset plus the history that mutates it.
//!
//! # Responsibility
//! - Own exactly one dataset and its `History` for their shared lifetime.
//! - Serialize every history mutation behind a single per-project lock.
//!
//! # Invariants
//! - Readers never observe a cursor with a partially applied span.
//! - A panic while the lock is held marks the history corrupted.

use crate::history::{History, HistoryResult, MoveOutcome};
use crate::model::change::{ChangeRecord, ChangeTarget};
use crate::model::entry::{EntryId, EntryMeta};
use log::warn;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Stable identifier of one project.
pub type ProjectId = Uuid;

/// Serializable snapshot of a project's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryView {
    pub project_id: ProjectId,
    pub cursor: EntryId,
    pub done: Vec<EntryMeta>,
    pub pending: Vec<EntryMeta>,
    pub corrupted: bool,
}

struct ProjectState<T: ChangeTarget> {
    data: T,
    history: History<T>,
}

/// Dataset owner with a linear undo/redo history.
pub struct Project<T: ChangeTarget> {
    id: ProjectId,
    name: String,
    state: Mutex<ProjectState<T>>,
}

impl<T: ChangeTarget> Project<T> {
    /// Creates a project with a generated id and an empty history.
    pub fn new(name: impl Into<String>, data: T) -> Self {
        Self::with_id(Uuid::new_v4(), name, data)
    }

    /// Creates a project with a caller-provided id.
    ///
    /// Used when the id already exists in a persisted journal.
    pub fn with_id(id: ProjectId, name: impl Into<String>, data: T) -> Self {
        Self {
            id,
            name: name.into(),
            state: Mutex::new(ProjectState {
                data,
                history: History::new(),
            }),
        }
    }

    /// Convenience constructor for sharing with processes.
    pub fn shared(name: impl Into<String>, data: T) -> Arc<Self> {
        Arc::new(Self::new(name, data))
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies and records a new change. See `History::commit`.
    pub fn commit(
        &self,
        description: impl Into<String>,
        change: Box<dyn ChangeRecord<T>>,
    ) -> HistoryResult<EntryMeta> {
        let mut state = self.lock();
        let ProjectState { data, history } = &mut *state;
        history.commit(data, description, change)
    }

    /// Moves the history cursor. See `History::move_to`.
    pub fn move_history_to(&self, target_id: EntryId) -> HistoryResult<MoveOutcome> {
        let mut state = self.lock();
        let ProjectState { data, history } = &mut *state;
        history.move_to(data, target_id)
    }

    pub fn undo(&self) -> HistoryResult<MoveOutcome> {
        let mut state = self.lock();
        let ProjectState { data, history } = &mut *state;
        history.undo(data)
    }

    pub fn redo(&self) -> HistoryResult<MoveOutcome> {
        let mut state = self.lock();
        let ProjectState { data, history } = &mut *state;
        history.redo(data)
    }

    pub fn cursor(&self) -> EntryId {
        self.lock().history.cursor()
    }

    pub fn is_corrupted(&self) -> bool {
        self.lock().history.is_corrupted()
    }

    pub fn entry_meta(&self, id: EntryId) -> Option<EntryMeta> {
        self.lock().history.entry(id).map(|entry| entry.meta())
    }

    /// Consistent snapshot of cursor, done and pending entries.
    pub fn history_view(&self) -> HistoryView {
        let state = self.lock();
        HistoryView {
            project_id: self.id,
            cursor: state.history.cursor(),
            done: state.history.done_entries(),
            pending: state.history.pending_entries(),
            corrupted: state.history.is_corrupted(),
        }
    }

    /// Runs `read` against the dataset while holding the project lock.
    pub fn read_data<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        let state = self.lock();
        read(&state.data)
    }

    fn lock(&self) -> MutexGuard<'_, ProjectState<T>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            let mut state = poisoned.into_inner();
            if !state.history.is_corrupted() {
                warn!(
                    "event=project_lock module=project status=error project_id={} error_code=lock_poisoned",
                    self.id
                );
                state.history.mark_corrupted();
            }
            state
        })
    }
}
