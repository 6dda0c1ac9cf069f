//! Long-running process that computes a change off-thread, then commits it.
//!
//! Expensive operations (reconciliation, clustering, re-fetching columns)
//! build their `ChangeRecord` on a worker and only take the project lock for
//! the final commit.

use crate::model::change::{ChangeRecord, ChangeTarget};
use crate::model::entry::EntryMeta;
use crate::process::{LongRunningTask, Process, ProcessError, ProcessResult, TaskContext};
use crate::project::{Project, ProjectId};
use log::info;
use std::sync::{Arc, Weak};

type ChangeBuilder<T> =
    Box<dyn FnOnce(&TaskContext) -> ProcessResult<Box<dyn ChangeRecord<T>>> + Send>;

/// Computes one change and commits it to a project.
pub struct ComputeChangeTask<T: ChangeTarget + Send + 'static> {
    project: Weak<Project<T>>,
    project_id: ProjectId,
    description: String,
    builder: Option<ChangeBuilder<T>>,
}

impl<T: ChangeTarget + Send + 'static> ComputeChangeTask<T> {
    /// `builder` runs on the worker thread and may report progress.
    pub fn new<F>(project: &Arc<Project<T>>, description: impl Into<String>, builder: F) -> Self
    where
        F: FnOnce(&TaskContext) -> ProcessResult<Box<dyn ChangeRecord<T>>> + Send + 'static,
    {
        Self {
            project: Arc::downgrade(project),
            project_id: project.id(),
            description: description.into(),
            builder: Some(Box::new(builder)),
        }
    }

    pub fn into_process(self) -> Process {
        Process::asynchronous(self)
    }
}

impl<T: ChangeTarget + Send + 'static> LongRunningTask for ComputeChangeTask<T> {
    fn description(&self) -> &str {
        &self.description
    }

    fn target(&self) -> Option<ProjectId> {
        Some(self.project_id)
    }

    fn run(&mut self, ctx: &TaskContext) -> ProcessResult<Option<EntryMeta>> {
        let builder = self.builder.take().ok_or(ProcessError::AlreadyExecuted)?;
        let change = builder(ctx)?;
        let project = self.project.upgrade().ok_or(ProcessError::TargetDropped)?;
        // Cancellation either wins here or is refused for the rest of the run.
        if !ctx.begin_commit() {
            return Ok(None);
        }
        let meta = project.commit(self.description.clone(), change)?;
        ctx.report_progress(100);
        info!(
            "event=compute_change module=process status=ok project_id={} entry_id={}",
            self.project_id, meta.id
        );
        Ok(Some(meta))
    }
}
