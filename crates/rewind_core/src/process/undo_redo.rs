//! Immediate process that rewinds or replays a project's history.

use crate::model::change::ChangeTarget;
use crate::model::entry::{EntryId, EntryMeta};
use crate::process::{ImmediateTask, Process, ProcessError, ProcessResult};
use crate::project::{Project, ProjectId};
use log::info;
use std::sync::{Arc, Weak};

/// Moves a project's history cursor to one entry.
///
/// Holds a weak reference: the process must not keep a closed project alive.
pub struct HistoryUndoRedoProcess<T: ChangeTarget + Send + 'static> {
    project: Weak<Project<T>>,
    project_id: ProjectId,
    last_done_id: EntryId,
    description: String,
    executed: bool,
}

impl<T: ChangeTarget + Send + 'static> HistoryUndoRedoProcess<T> {
    /// Binds a process to `project` and the entry that should end up last
    /// applied. `EntryId::INITIAL` undoes everything.
    ///
    /// # Errors
    /// - `UnknownEntry` when `last_done_id` is not in the project history.
    pub fn new(project: &Arc<Project<T>>, last_done_id: EntryId) -> ProcessResult<Self> {
        let description = if last_done_id.is_initial() {
            "Undo all".to_string()
        } else {
            let entry = project
                .entry_meta(last_done_id)
                .ok_or(ProcessError::UnknownEntry(last_done_id))?;
            format!("Undo/redo until after {}", entry.description)
        };

        Ok(Self {
            project: Arc::downgrade(project),
            project_id: project.id(),
            last_done_id,
            description,
            executed: false,
        })
    }

    pub fn last_done_id(&self) -> EntryId {
        self.last_done_id
    }

    pub fn into_process(self) -> Process {
        Process::immediate(self)
    }
}

impl<T: ChangeTarget + Send + 'static> ImmediateTask for HistoryUndoRedoProcess<T> {
    fn description(&self) -> &str {
        &self.description
    }

    fn target(&self) -> Option<ProjectId> {
        Some(self.project_id)
    }

    /// Single-shot even when called directly, outside `ImmediateProcess`.
    fn perform(&mut self) -> ProcessResult<Option<EntryMeta>> {
        if self.executed {
            return Err(ProcessError::AlreadyExecuted);
        }
        self.executed = true;
        let project = self.project.upgrade().ok_or(ProcessError::TargetDropped)?;
        let outcome = project.move_history_to(self.last_done_id)?;
        info!(
            "event=history_undo_redo module=process status=ok project_id={} direction={} to={}",
            self.project_id,
            outcome.direction.as_str(),
            outcome.to
        );
        Ok(None)
    }
}
