//! Process abstraction over immediate and asynchronous work.
//!
//! # Responsibility
//! - Give every user-initiated operation one status/polling contract.
//! - Fail fast with typed errors when a caller uses the wrong mode.
//!
//! # Invariants
//! - A process's mode is fixed at construction.
//! - Immediate processes execute at most once and never touch the
//!   coordinator registry.
//! - Asynchronous processes only run once the coordinator admitted them.
//! - `describe` never mutates process state.
//!
//! # See also
//! - `coordinator` for admission of asynchronous processes.

pub mod compute_change;
pub mod immediate;
pub mod long_running;
pub mod undo_redo;

use crate::coordinator::{CoordinatorError, CoordinatorResult, ProcessCoordinator};
use crate::history::HistoryError;
use crate::model::entry::{EntryId, EntryMeta};
use crate::project::ProjectId;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub use immediate::{ImmediateProcess, ImmediateTask};
pub use long_running::{AsyncProcess, LongRunningTask, TaskContext};

/// Identifier assigned to asynchronous processes.
pub type ProcessId = Uuid;

pub type ProcessResult<T> = Result<T, ProcessError>;

/// Execution mode declared by a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessMode {
    Immediate,
    Asynchronous,
}

impl ProcessMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Asynchronous => "asynchronous",
        }
    }
}

/// Reported lifecycle status.
///
/// Immediate processes only ever report `Pending` or `Done`; `Running`,
/// `Failed` and `Cancelled` exist for asynchronous processes only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Pending,
    Running,
    Done,
    Failed,
    Cancelled,
}

impl ProcessStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// Plain status snapshot handed to any status-reporting boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDescription {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ProcessId>,
    pub description: String,
    pub immediate: bool,
    pub status: ProcessStatus,
    /// Percent complete, asynchronous processes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Process contract violations and execution failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Operation belongs to the other execution mode.
    InvalidMode {
        operation: &'static str,
        mode: ProcessMode,
    },
    /// Immediate process performed twice, or async process started twice.
    AlreadyExecuted,
    /// Status/cancel query not offered by this mode.
    UnsupportedOperation {
        operation: &'static str,
        mode: ProcessMode,
    },
    /// Cancel requested after the process reached a terminal state.
    AlreadyCompleted,
    /// Undo/redo target is not in the history.
    UnknownEntry(EntryId),
    /// History transition failed part way; the dataset needs a reload.
    HistoryCorruption(HistoryError),
    /// Any other history failure, e.g. a rejected change.
    History(HistoryError),
    /// The project the process was bound to no longer exists.
    TargetDropped,
    /// Task-specific failure.
    Task(String),
}

impl ProcessError {
    /// Returns whether the caller may surface this as a rejected request.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UnknownEntry(_) => true,
            Self::History(err) => err.is_recoverable(),
            _ => false,
        }
    }
}

impl Display for ProcessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMode { operation, mode } => {
                write!(f, "`{operation}` is invalid for {} processes", mode.as_str())
            }
            Self::AlreadyExecuted => write!(f, "process has already been executed"),
            Self::UnsupportedOperation { operation, mode } => {
                write!(f, "`{operation}` is unsupported for {} processes", mode.as_str())
            }
            Self::AlreadyCompleted => write!(f, "process has already completed"),
            Self::UnknownEntry(id) => write!(f, "history entry not found: {id}"),
            Self::HistoryCorruption(err) => write!(f, "{err}"),
            Self::History(err) => write!(f, "{err}"),
            Self::TargetDropped => write!(f, "process target no longer exists"),
            Self::Task(message) => write!(f, "process task failed: {message}"),
        }
    }
}

impl Error for ProcessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::HistoryCorruption(err) | Self::History(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HistoryError> for ProcessError {
    fn from(value: HistoryError) -> Self {
        match value {
            HistoryError::UnknownEntry(id) => Self::UnknownEntry(id),
            HistoryError::HistoryCorruption { .. } | HistoryError::Corrupted { .. } => {
                Self::HistoryCorruption(value)
            }
            HistoryError::ChangeRejected { .. } => Self::History(value),
        }
    }
}

/// One unit of work in either execution mode.
pub enum Process {
    Immediate(ImmediateProcess),
    Asynchronous(AsyncProcess),
}

impl Process {
    pub fn immediate(task: impl ImmediateTask + 'static) -> Self {
        Self::Immediate(ImmediateProcess::new(Box::new(task)))
    }

    pub fn asynchronous(task: impl LongRunningTask) -> Self {
        Self::Asynchronous(AsyncProcess::new(Box::new(task)))
    }

    pub fn mode(&self) -> ProcessMode {
        match self {
            Self::Immediate(_) => ProcessMode::Immediate,
            Self::Asynchronous(_) => ProcessMode::Asynchronous,
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.mode() == ProcessMode::Immediate
    }

    /// Coordinator id; immediate processes have none.
    pub fn id(&self) -> Option<ProcessId> {
        match self {
            Self::Immediate(_) => None,
            Self::Asynchronous(process) => Some(process.id()),
        }
    }

    /// Project this process mutates, if any.
    pub fn target(&self) -> Option<ProjectId> {
        match self {
            Self::Immediate(process) => process.target(),
            Self::Asynchronous(process) => process.target(),
        }
    }

    /// Runs an immediate process to completion.
    ///
    /// # Errors
    /// - `InvalidMode` for asynchronous processes.
    /// - `AlreadyExecuted` on any call after the first.
    pub fn perform_immediate(&mut self) -> ProcessResult<Option<EntryMeta>> {
        match self {
            Self::Immediate(process) => process.perform(),
            Self::Asynchronous(_) => Err(ProcessError::InvalidMode {
                operation: "perform_immediate",
                mode: ProcessMode::Asynchronous,
            }),
        }
    }

    /// Registers an asynchronous process with `coordinator` and returns at
    /// once. The coordinator starts it when its admission policy allows;
    /// use the returned id to poll or cancel.
    ///
    /// # Errors
    /// - `Process(InvalidMode)` for immediate processes.
    pub fn start_performing(
        self,
        coordinator: &ProcessCoordinator,
    ) -> CoordinatorResult<ProcessId> {
        if self.is_immediate() {
            return Err(CoordinatorError::Process(ProcessError::InvalidMode {
                operation: "start_performing",
                mode: ProcessMode::Immediate,
            }));
        }
        coordinator.submit(self)
    }

    /// Requests abandonment of an asynchronous process.
    ///
    /// # Errors
    /// - `UnsupportedOperation` for immediate processes.
    /// - `AlreadyCompleted` once the process is terminal.
    pub fn cancel(&mut self) -> ProcessResult<()> {
        match self {
            Self::Immediate(_) => Err(unsupported("cancel")),
            Self::Asynchronous(process) => process.cancel(),
        }
    }

    pub fn is_done(&self) -> ProcessResult<bool> {
        match self {
            Self::Immediate(_) => Err(unsupported("is_done")),
            Self::Asynchronous(process) => Ok(process.is_done()),
        }
    }

    pub fn is_running(&self) -> ProcessResult<bool> {
        match self {
            Self::Immediate(_) => Err(unsupported("is_running")),
            Self::Asynchronous(process) => Ok(process.is_running()),
        }
    }

    pub fn describe(&self) -> StatusDescription {
        match self {
            Self::Immediate(process) => process.describe(),
            Self::Asynchronous(process) => process.describe(),
        }
    }
}

fn unsupported(operation: &'static str) -> ProcessError {
    ProcessError::UnsupportedOperation {
        operation,
        mode: ProcessMode::Immediate,
    }
}
