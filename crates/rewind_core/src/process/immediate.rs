//! Immediate-mode processes.

use crate::model::entry::EntryMeta;
use crate::process::{ProcessError, ProcessResult, ProcessStatus, StatusDescription};
use crate::project::ProjectId;
use log::{error, info};

/// Work that completes inside the caller's current turn.
pub trait ImmediateTask: Send {
    fn description(&self) -> &str;

    /// Project the task mutates, used for coordinator admission checks.
    fn target(&self) -> Option<ProjectId>;

    fn perform(&mut self) -> ProcessResult<Option<EntryMeta>>;
}

/// Single-shot wrapper enforcing the immediate contract.
pub struct ImmediateProcess {
    task: Box<dyn ImmediateTask>,
    executed: bool,
    done: bool,
}

impl ImmediateProcess {
    pub fn new(task: Box<dyn ImmediateTask>) -> Self {
        Self {
            task,
            executed: false,
            done: false,
        }
    }

    pub fn target(&self) -> Option<ProjectId> {
        self.task.target()
    }

    /// Runs the task. Every call after the first fails with
    /// `AlreadyExecuted`, including after a failed first call.
    pub fn perform(&mut self) -> ProcessResult<Option<EntryMeta>> {
        if self.executed {
            error!(
                "event=process_perform module=process status=error mode=immediate error_code=already_executed"
            );
            return Err(ProcessError::AlreadyExecuted);
        }
        self.executed = true;

        match self.task.perform() {
            Ok(produced) => {
                self.done = true;
                info!(
                    "event=process_perform module=process status=ok mode=immediate produced_entry={}",
                    produced.is_some()
                );
                Ok(produced)
            }
            Err(err) => {
                error!(
                    "event=process_perform module=process status=error mode=immediate error={}",
                    err
                );
                Err(err)
            }
        }
    }

    pub fn describe(&self) -> StatusDescription {
        StatusDescription {
            id: None,
            description: self.task.description().to_string(),
            immediate: true,
            status: if self.done {
                ProcessStatus::Done
            } else {
                ProcessStatus::Pending
            },
            progress: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ImmediateProcess, ImmediateTask};
    use crate::model::entry::EntryMeta;
    use crate::process::{ProcessError, ProcessResult, ProcessStatus};
    use crate::project::ProjectId;

    struct FailOnce;

    impl ImmediateTask for FailOnce {
        fn description(&self) -> &str {
            "fails"
        }

        fn target(&self) -> Option<ProjectId> {
            None
        }

        fn perform(&mut self) -> ProcessResult<Option<EntryMeta>> {
            Err(ProcessError::Task("boom".to_string()))
        }
    }

    #[test]
    fn failed_first_call_still_blocks_reexecution() {
        let mut process = ImmediateProcess::new(Box::new(FailOnce));
        assert_eq!(
            process.perform(),
            Err(ProcessError::Task("boom".to_string()))
        );
        assert_eq!(process.describe().status, ProcessStatus::Pending);
        assert_eq!(process.perform(), Err(ProcessError::AlreadyExecuted));
    }
}
