//! Undo/redo history core for tabular data projects.
//! This crate owns the history invariants; data models plug in through
//! `ChangeTarget` and `ChangeRecord`.

pub mod config;
pub mod coordinator;
pub mod db;
pub mod history;
pub mod logging;
pub mod model;
pub mod process;
pub mod project;
pub mod repo;
pub mod service;

pub use config::{AdmissionPolicy, ConfigError, CoordinatorConfig, CoreConfig};
pub use coordinator::{
    CoordinatorError, CoordinatorResult, FailedProcess, IdleReport, ProcessCoordinator, Submission,
};
pub use history::{History, HistoryError, HistoryResult, MoveDirection, MoveOutcome};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::change::{ChangeError, ChangeRecord, ChangeResult, ChangeTarget};
pub use model::entry::{EntryId, EntryMeta, HistoryEntry};
pub use process::compute_change::ComputeChangeTask;
pub use process::undo_redo::HistoryUndoRedoProcess;
pub use process::{
    ImmediateTask, LongRunningTask, Process, ProcessError, ProcessId, ProcessMode, ProcessResult,
    ProcessStatus, StatusDescription, TaskContext,
};
pub use project::{HistoryView, Project, ProjectId};
pub use repo::journal_repo::{
    HistoryJournal, JournalError, JournalResult, JournalSnapshot, SqliteHistoryJournal,
};
pub use service::history_service::{HistoryService, HistoryServiceError, ServiceResult};

/// Minimal health-check API for embedding hosts.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
