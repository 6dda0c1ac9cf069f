//! History use-case service.
//!
//! # Responsibility
//! - Provide commit and undo/redo entry points for core callers.
//! - Mirror every accepted history mutation into the journal.
//!
//! # Invariants
//! - The journal is written only after the project accepted the mutation.
//! - Undo/redo always runs as an immediate process through the coordinator.
//! - Corrupted projects are never reconciled into the journal.

use crate::coordinator::{CoordinatorError, ProcessCoordinator, Submission};
use crate::history::HistoryError;
use crate::model::change::{ChangeRecord, ChangeTarget};
use crate::model::entry::{EntryId, EntryMeta};
use crate::process::compute_change::ComputeChangeTask;
use crate::process::undo_redo::HistoryUndoRedoProcess;
use crate::process::{
    ProcessError, ProcessId, ProcessMode, ProcessResult, StatusDescription, TaskContext,
};
use crate::project::{Project, ProjectId};
use crate::repo::journal_repo::{HistoryJournal, JournalError, JournalSnapshot};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ServiceResult<T> = Result<T, HistoryServiceError>;

/// Service error for history use-cases.
#[derive(Debug)]
pub enum HistoryServiceError {
    History(HistoryError),
    Coordinator(CoordinatorError),
    Journal(JournalError),
    /// Project must be reloaded before its journal can be touched again.
    ProjectCorrupted(ProjectId),
}

impl HistoryServiceError {
    /// Whether this maps to a rejected-request response rather than a fault.
    pub fn is_rejected_request(&self) -> bool {
        match self {
            Self::History(err) => err.is_recoverable(),
            Self::Coordinator(CoordinatorError::Process(err)) => err.is_recoverable(),
            Self::Coordinator(CoordinatorError::TargetBusy(_)) => true,
            _ => false,
        }
    }
}

impl Display for HistoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::History(err) => write!(f, "{err}"),
            Self::Coordinator(err) => write!(f, "{err}"),
            Self::Journal(err) => write!(f, "{err}"),
            Self::ProjectCorrupted(id) => write!(f, "project {id} is corrupted; reload required"),
        }
    }
}

impl Error for HistoryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::History(err) => Some(err),
            Self::Coordinator(err) => Some(err),
            Self::Journal(err) => Some(err),
            Self::ProjectCorrupted(_) => None,
        }
    }
}

impl From<HistoryError> for HistoryServiceError {
    fn from(value: HistoryError) -> Self {
        Self::History(value)
    }
}

impl From<CoordinatorError> for HistoryServiceError {
    fn from(value: CoordinatorError) -> Self {
        Self::Coordinator(value)
    }
}

impl From<ProcessError> for HistoryServiceError {
    fn from(value: ProcessError) -> Self {
        Self::Coordinator(CoordinatorError::Process(value))
    }
}

impl From<JournalError> for HistoryServiceError {
    fn from(value: JournalError) -> Self {
        Self::Journal(value)
    }
}

/// Use-case service wrapping a history journal.
pub struct HistoryService<J: HistoryJournal> {
    journal: J,
}

impl<J: HistoryJournal> HistoryService<J> {
    pub fn new(journal: J) -> Self {
        Self { journal }
    }

    pub fn journal(&self) -> &J {
        &self.journal
    }

    /// Applies a change to `project` and journals the new entry.
    pub fn commit<T: ChangeTarget>(
        &self,
        project: &Project<T>,
        description: impl Into<String>,
        change: Box<dyn ChangeRecord<T>>,
    ) -> ServiceResult<EntryMeta> {
        let meta = project.commit(description, change)?;
        self.journal.record_commit(project.id(), &meta)?;
        Ok(meta)
    }

    /// Moves `project` to `last_done_id` through an immediate
    /// `HistoryUndoRedoProcess` and journals the new cursor.
    ///
    /// # Errors
    /// - `UnknownEntry` (as a recoverable process error) for missing ids.
    /// - `TargetBusy` while asynchronous work on `project` is in flight.
    pub fn undo_redo<T: ChangeTarget + Send + 'static>(
        &self,
        coordinator: &ProcessCoordinator,
        project: &Arc<Project<T>>,
        last_done_id: EntryId,
    ) -> ServiceResult<StatusDescription> {
        let process = HistoryUndoRedoProcess::new(project, last_done_id)?.into_process();
        let status = match coordinator.queue(process)? {
            Submission::Completed { status, .. } => status,
            Submission::Queued(id) => {
                // Undo/redo is immediate by construction.
                warn!(
                    "event=history_undo_redo module=service status=error process_id={} error_code=unexpected_queue",
                    id
                );
                return Err(ProcessError::InvalidMode {
                    operation: "undo_redo",
                    mode: ProcessMode::Asynchronous,
                }
                .into());
            }
        };
        self.journal.record_cursor(project.id(), project.cursor())?;
        Ok(status)
    }

    /// Reverts every entry of `project`.
    pub fn undo_all<T: ChangeTarget + Send + 'static>(
        &self,
        coordinator: &ProcessCoordinator,
        project: &Arc<Project<T>>,
    ) -> ServiceResult<StatusDescription> {
        self.undo_redo(coordinator, project, EntryId::INITIAL)
    }

    /// Queues an asynchronous process that computes and commits a change.
    ///
    /// The resulting entry reaches the journal on the next `reconcile`.
    pub fn submit_change<T, F>(
        &self,
        coordinator: &ProcessCoordinator,
        project: &Arc<Project<T>>,
        description: impl Into<String>,
        builder: F,
    ) -> ServiceResult<ProcessId>
    where
        T: ChangeTarget + Send + 'static,
        F: FnOnce(&TaskContext) -> ProcessResult<Box<dyn ChangeRecord<T>>> + Send + 'static,
    {
        let process = ComputeChangeTask::new(project, description, builder).into_process();
        Ok(coordinator.submit(process)?)
    }

    /// Brings the journal in line with the in-memory history of `project`.
    ///
    /// Returns the number of entries written.
    pub fn reconcile<T: ChangeTarget>(&self, project: &Project<T>) -> ServiceResult<usize> {
        let view = project.history_view();
        if view.corrupted {
            return Err(HistoryServiceError::ProjectCorrupted(project.id()));
        }
        let stored = self.journal.load(project.id())?;

        let mut previous = EntryId::INITIAL;
        let mut written = 0;
        for entry in view.done.iter().chain(view.pending.iter()) {
            if !stored.entries.iter().any(|known| known.id == entry.id) {
                self.journal.record_cursor(project.id(), previous)?;
                self.journal.record_commit(project.id(), entry)?;
                written += 1;
            }
            previous = entry.id;
        }
        self.journal.record_cursor(project.id(), view.cursor)?;

        if written > 0 {
            info!(
                "event=journal_reconcile module=service status=ok project_id={} written={}",
                project.id(),
                written
            );
        }
        Ok(written)
    }

    pub fn journal_snapshot(&self, project_id: ProjectId) -> ServiceResult<JournalSnapshot> {
        Ok(self.journal.load(project_id)?)
    }
}
