//! Asynchronous processes executed on coordinator-owned worker threads.
//!
//! # Invariants
//! - Phases only move forward:
//!   queued -> running -> (committing ->) done | failed | cancelled.
//! - A terminal phase is never overwritten by a late worker result.
//! - Cancellation is cooperative; the task observes it via `TaskContext`.
//! - Once a task enters `committing`, cancel fails with `AlreadyCompleted`
//!   and the task's own result decides the terminal phase.

use crate::coordinator::ProcessCoordinator;
use crate::model::entry::EntryMeta;
use crate::process::{ProcessError, ProcessId, ProcessResult, ProcessStatus, StatusDescription};
use crate::project::ProjectId;
use log::{error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// Work that runs to completion on a worker thread.
pub trait LongRunningTask: Send + 'static {
    fn description(&self) -> &str;

    /// Project the task mutates; the coordinator never runs two processes
    /// against the same project at once.
    fn target(&self) -> Option<ProjectId>;

    fn run(&mut self, ctx: &TaskContext) -> ProcessResult<Option<EntryMeta>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Queued,
    Running,
    /// Past the point of no return; reported as running.
    Committing,
    Done,
    Failed,
    Cancelled,
}

impl Phase {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Committing)
    }

    fn status(self) -> ProcessStatus {
        match self {
            Self::Queued => ProcessStatus::Pending,
            Self::Running | Self::Committing => ProcessStatus::Running,
            Self::Done => ProcessStatus::Done,
            Self::Failed => ProcessStatus::Failed,
            Self::Cancelled => ProcessStatus::Cancelled,
        }
    }
}

#[derive(Debug)]
struct AsyncState {
    phase: Phase,
    progress: u8,
    error: Option<String>,
    produced: Option<EntryMeta>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<AsyncState>,
    cancelled: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, AsyncState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle given to a running task for progress and cancellation checks.
pub struct TaskContext {
    shared: Arc<Shared>,
}

impl TaskContext {
    /// Records progress in percent; values above 100 are clamped.
    pub fn report_progress(&self, percent: u8) {
        let mut state = self.shared.lock();
        if state.phase.is_active() {
            state.progress = percent.min(100);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Claims the right to publish the task's result.
    ///
    /// Returns `false` when cancellation already won. On `true`, every later
    /// cancel fails with `AlreadyCompleted`; the check and the transition
    /// happen under the same lock `cancel` takes.
    pub fn begin_commit(&self) -> bool {
        let mut state = self.shared.lock();
        if state.phase != Phase::Running || self.is_cancelled() {
            return false;
        }
        state.phase = Phase::Committing;
        true
    }
}

/// Asynchronous process state machine around one `LongRunningTask`.
pub struct AsyncProcess {
    id: ProcessId,
    description: String,
    target: Option<ProjectId>,
    task: Option<Box<dyn LongRunningTask>>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncProcess {
    pub fn new(task: Box<dyn LongRunningTask>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: task.description().to_string(),
            target: task.target(),
            task: Some(task),
            shared: Arc::new(Shared {
                state: Mutex::new(AsyncState {
                    phase: Phase::Queued,
                    progress: 0,
                    error: None,
                    produced: None,
                }),
                cancelled: AtomicBool::new(false),
            }),
            worker: None,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn target(&self) -> Option<ProjectId> {
        self.target
    }

    /// Spawns the worker thread; completion is signalled to `coordinator`.
    ///
    /// Only the coordinator's admission step calls this, so every running
    /// process is registered.
    pub(crate) fn start(&mut self, coordinator: &ProcessCoordinator) -> ProcessResult<()> {
        let mut task = {
            let mut state = self.shared.lock();
            if state.phase.is_terminal() {
                return Err(ProcessError::AlreadyCompleted);
            }
            let Some(task) = self.task.take() else {
                return Err(ProcessError::AlreadyExecuted);
            };
            state.phase = Phase::Running;
            task
        };

        let shared = Arc::clone(&self.shared);
        let signal = coordinator.completion_signal();
        let id = self.id;
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", coordinator.config().worker_name, short_id(id)))
            .spawn(move || {
                let ctx = TaskContext {
                    shared: Arc::clone(&shared),
                };
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run(&ctx)))
                    .unwrap_or_else(|_| Err(ProcessError::Task("task panicked".to_string())));
                finish(&shared, id, outcome);
                signal.notify();
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                info!(
                    "event=process_start module=process status=ok mode=asynchronous process_id={}",
                    id
                );
                Ok(())
            }
            Err(err) => {
                let message = format!("failed to spawn worker: {err}");
                let mut state = self.shared.lock();
                state.phase = Phase::Failed;
                state.error = Some(message.clone());
                error!(
                    "event=process_start module=process status=error mode=asynchronous process_id={} error_code=spawn_failed error={}",
                    id, err
                );
                Err(ProcessError::Task(message))
            }
        }
    }

    /// Requests cancellation.
    ///
    /// A queued process is cancelled at once; a running one is flagged and
    /// its worker stops at the task's next cancellation check.
    ///
    /// # Errors
    /// - `AlreadyCompleted` once terminal or committing.
    pub fn cancel(&mut self) -> ProcessResult<()> {
        let mut state = self.shared.lock();
        if state.phase.is_terminal() || state.phase == Phase::Committing {
            return Err(ProcessError::AlreadyCompleted);
        }
        self.shared.cancelled.store(true, Ordering::Release);
        state.phase = Phase::Cancelled;
        drop(state);
        self.task = None;
        info!(
            "event=process_cancel module=process status=ok process_id={}",
            self.id
        );
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.shared.lock().phase.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().phase.is_active()
    }

    pub fn status(&self) -> ProcessStatus {
        self.shared.lock().phase.status()
    }

    /// Entry produced by a successful run.
    pub fn produced(&self) -> Option<EntryMeta> {
        self.shared.lock().produced.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.shared.lock().error.clone()
    }

    pub fn describe(&self) -> StatusDescription {
        let state = self.shared.lock();
        StatusDescription {
            id: Some(self.id),
            description: self.description.clone(),
            immediate: false,
            status: state.phase.status(),
            progress: Some(state.progress),
            error: state.error.clone(),
        }
    }

    /// Whether the worker thread has exited (or never started).
    pub(crate) fn worker_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub(crate) fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!(
                    "event=process_join module=process status=error process_id={} error_code=worker_panicked",
                    self.id
                );
            }
        }
    }
}

impl Drop for AsyncProcess {
    fn drop(&mut self) {
        // Detached workers must still see the request to stop.
        if self.worker.is_some() {
            self.shared.cancelled.store(true, Ordering::Release);
        }
    }
}

fn finish(shared: &Shared, id: ProcessId, outcome: ProcessResult<Option<EntryMeta>>) {
    let mut state = shared.lock();
    if state.phase.is_terminal() {
        return;
    }
    if state.phase != Phase::Committing && shared.cancelled.load(Ordering::Acquire) {
        state.phase = Phase::Cancelled;
        return;
    }
    match outcome {
        Ok(produced) => {
            state.phase = Phase::Done;
            state.progress = 100;
            state.produced = produced;
            info!(
                "event=process_finish module=process status=ok process_id={}",
                id
            );
        }
        Err(err) => {
            state.phase = Phase::Failed;
            state.error = Some(err.to_string());
            error!(
                "event=process_finish module=process status=error process_id={} error={}",
                id, err
            );
        }
    }
}

fn short_id(id: ProcessId) -> String {
    id.simple().to_string().chars().take(8).collect()
}
