//! Process coordinator: admission and lifecycle of asynchronous processes.
//!
//! # Responsibility
//! - Keep the registry of queued and running asynchronous processes.
//! - Admit queued work according to `AdmissionPolicy`.
//! - Report status snapshots and retire finished processes.
//!
//! # Invariants
//! - No two processes against the same project ever run at once, whatever
//!   the policy; a cancelled worker keeps its project busy until it exits.
//! - Immediate processes run inline and are never registered.
//! - One coordinator instance per enclosing system; dropping it cancels and
//!   joins every worker.

mod signal;

use crate::config::{AdmissionPolicy, CoordinatorConfig};
use crate::model::entry::{now_epoch_ms, EntryMeta};
use crate::process::{
    AsyncProcess, Process, ProcessError, ProcessId, ProcessMode, StatusDescription,
};
use crate::project::ProjectId;
use log::{error, info, warn};
use std::collections::{BTreeSet, VecDeque};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub(crate) use signal::CompletionSignal;

const WAIT_SLICE: Duration = Duration::from_millis(25);

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    UnknownProcess(ProcessId),
    /// An asynchronous process on this project is queued or running.
    TargetBusy(ProjectId),
    Process(ProcessError),
}

impl Display for CoordinatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProcess(id) => write!(f, "process not found: {id}"),
            Self::TargetBusy(id) => write!(f, "project {id} has a process in flight"),
            Self::Process(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoordinatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Process(err) => Some(err),
            Self::UnknownProcess(_) | Self::TargetBusy(_) => None,
        }
    }
}

impl From<ProcessError> for CoordinatorError {
    fn from(value: ProcessError) -> Self {
        Self::Process(value)
    }
}

/// Result of `ProcessCoordinator::queue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Immediate process finished inline.
    Completed {
        status: StatusDescription,
        produced: Option<EntryMeta>,
    },
    /// Asynchronous process registered under this id.
    Queued(ProcessId),
}

/// Failure kept for diagnostics after a process was retired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedProcess {
    pub id: ProcessId,
    pub description: String,
    pub error: String,
    pub retired_at_ms: i64,
}

/// Outcome of `ProcessCoordinator::wait_idle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleReport {
    pub idle: bool,
    /// Terminal statuses of processes retired while waiting.
    pub retired: Vec<StatusDescription>,
}

#[derive(Default)]
struct Registry {
    /// Submission order; queued and running processes.
    slots: Vec<AsyncProcess>,
    /// Cancelled processes whose worker has not exited yet.
    draining: Vec<AsyncProcess>,
    /// Projects an immediate process is mutating right now.
    claimed: BTreeSet<ProjectId>,
    failures: VecDeque<FailedProcess>,
}

impl Registry {
    /// Projects with a live worker thread or an immediate process in flight.
    fn busy_targets(&self) -> BTreeSet<ProjectId> {
        self.slots
            .iter()
            .chain(self.draining.iter())
            .filter(|process| !process.worker_finished())
            .filter_map(AsyncProcess::target)
            .chain(self.claimed.iter().copied())
            .collect()
    }

    /// Whether an immediate process on `target` must be refused.
    fn refuses_immediate(&self, target: ProjectId) -> bool {
        self.busy_targets().contains(&target)
            || self
                .slots
                .iter()
                .any(|queued| !queued.is_done() && queued.target() == Some(target))
    }

    fn active_workers(&self) -> usize {
        self.slots
            .iter()
            .chain(self.draining.iter())
            .filter(|process| !process.worker_finished())
            .count()
    }

    fn position(&self, id: ProcessId) -> Option<usize> {
        self.slots.iter().position(|process| process.id() == id)
    }
}

/// Registry of in-flight asynchronous processes.
pub struct ProcessCoordinator {
    config: CoordinatorConfig,
    registry: Mutex<Registry>,
    signal: Arc<CompletionSignal>,
}

impl Default for ProcessCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl ProcessCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        info!(
            "event=coordinator_init module=coordinator status=ok policy={:?}",
            config.policy
        );
        Self {
            config,
            registry: Mutex::new(Registry::default()),
            signal: Arc::new(CompletionSignal::default()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub(crate) fn completion_signal(&self) -> Arc<CompletionSignal> {
        Arc::clone(&self.signal)
    }

    /// Runs an immediate process inline or registers an asynchronous one.
    ///
    /// The registry stays unlocked while an immediate process runs; its
    /// project is claimed instead, so status queries are not blocked.
    ///
    /// # Errors
    /// - `TargetBusy` when an immediate process targets a project with
    ///   asynchronous work queued or running, or another immediate process
    ///   in flight.
    /// - `Process` for failures of the immediate process itself.
    pub fn queue(&self, process: Process) -> CoordinatorResult<Submission> {
        if !process.is_immediate() {
            return self.submit(process).map(Submission::Queued);
        }

        let mut process = process;
        let _claim = self.claim(process.target())?;
        let produced = process.perform_immediate()?;
        Ok(Submission::Completed {
            status: process.describe(),
            produced,
        })
    }

    /// Marks `target` busy for the duration of an immediate process, so the
    /// registry lock is not held while it runs.
    fn claim(&self, target: Option<ProjectId>) -> CoordinatorResult<TargetClaim<'_>> {
        if let Some(target) = target {
            let mut registry = self.lock_registry();
            if registry.refuses_immediate(target) {
                warn!(
                    "event=process_queue module=coordinator status=rejected mode=immediate project_id={} error_code=target_busy",
                    target
                );
                return Err(CoordinatorError::TargetBusy(target));
            }
            registry.claimed.insert(target);
        }
        Ok(TargetClaim {
            coordinator: self,
            target,
        })
    }

    /// Registers an asynchronous process and admits it when allowed.
    ///
    /// # Errors
    /// - `Process(InvalidMode)` for immediate processes.
    pub fn submit(&self, process: Process) -> CoordinatorResult<ProcessId> {
        let process = match process {
            Process::Asynchronous(process) => process,
            Process::Immediate(_) => {
                return Err(CoordinatorError::Process(ProcessError::InvalidMode {
                    operation: "submit",
                    mode: ProcessMode::Immediate,
                }));
            }
        };

        let id = process.id();
        let mut registry = self.lock_registry();
        info!(
            "event=process_submit module=coordinator status=ok process_id={} queued={}",
            id,
            registry.slots.len()
        );
        registry.slots.push(process);
        self.admit(&mut registry);
        Ok(id)
    }

    /// Retires finished processes, admits queued ones and reports status.
    ///
    /// Terminal statuses are reported exactly once, in the poll that
    /// retires them.
    pub fn poll(&self) -> Vec<StatusDescription> {
        let mut registry = self.lock_registry();
        let mut reported = self.retire(&mut registry);
        self.admit(&mut registry);
        reported.extend(registry.slots.iter().map(AsyncProcess::describe));
        reported
    }

    /// Cancels one registered process and removes it.
    ///
    /// # Errors
    /// - `UnknownProcess` when `id` is not registered.
    /// - `Process(AlreadyCompleted)` when it already finished; it stays
    ///   registered until the next `poll` reports it.
    pub fn cancel(&self, id: ProcessId) -> CoordinatorResult<()> {
        let mut registry = self.lock_registry();
        let index = registry
            .position(id)
            .ok_or(CoordinatorError::UnknownProcess(id))?;
        registry.slots[index].cancel()?;

        let process = registry.slots.remove(index);
        if !process.worker_finished() {
            registry.draining.push(process);
        }
        self.admit(&mut registry);
        Ok(())
    }

    /// Cancels every unfinished process and returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut registry = self.lock_registry();
        let mut cancelled = 0;
        let mut kept = Vec::with_capacity(registry.slots.len());
        for mut process in std::mem::take(&mut registry.slots) {
            if process.cancel().is_err() {
                kept.push(process);
                continue;
            }
            cancelled += 1;
            if !process.worker_finished() {
                registry.draining.push(process);
            }
        }
        registry.slots = kept;
        if cancelled > 0 {
            info!(
                "event=process_cancel_all module=coordinator status=ok cancelled={}",
                cancelled
            );
        }
        cancelled
    }

    /// Whether any process is registered (not yet retired) or draining.
    pub fn has_pending(&self) -> bool {
        let registry = self.lock_registry();
        !registry.slots.is_empty() || !registry.draining.is_empty()
    }

    /// Number of registered (not yet retired) processes.
    pub fn len(&self) -> usize {
        self.lock_registry().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status(&self, id: ProcessId) -> Option<StatusDescription> {
        let registry = self.lock_registry();
        registry
            .position(id)
            .map(|index| registry.slots[index].describe())
    }

    /// Most recent failures, oldest first.
    pub fn recent_failures(&self) -> Vec<FailedProcess> {
        self.lock_registry().failures.iter().cloned().collect()
    }

    /// Polls until nothing is pending or `timeout` elapses.
    pub fn wait_idle(&self, timeout: Duration) -> IdleReport {
        let deadline = Instant::now() + timeout;
        let mut retired = Vec::new();
        loop {
            let seen = self.signal.generation();
            retired.extend(
                self.poll()
                    .into_iter()
                    .filter(|status| status.status.is_terminal()),
            );
            if !self.has_pending() {
                return IdleReport {
                    idle: true,
                    retired,
                };
            }
            let now = Instant::now();
            if now >= deadline {
                return IdleReport {
                    idle: false,
                    retired,
                };
            }
            // Workers exit right after signalling, so re-check in short slices.
            self.signal.wait_past(seen, (deadline - now).min(WAIT_SLICE));
        }
    }

    /// Cancels everything and joins every worker thread.
    pub fn shutdown(&self) {
        self.cancel_all();
        let mut guard = self.lock_registry();
        let registry = &mut *guard;
        for process in registry.slots.iter_mut().chain(registry.draining.iter_mut()) {
            process.join_worker();
        }
        registry.draining.clear();
        info!("event=coordinator_shutdown module=coordinator status=ok");
    }

    fn retire(&self, registry: &mut Registry) -> Vec<StatusDescription> {
        registry.draining.retain_mut(|process| {
            if process.worker_finished() {
                process.join_worker();
                return false;
            }
            true
        });

        let mut retired = Vec::new();
        let mut kept = Vec::with_capacity(registry.slots.len());
        for mut process in std::mem::take(&mut registry.slots) {
            if !(process.is_done() && process.worker_finished()) {
                kept.push(process);
                continue;
            }
            process.join_worker();
            let status = process.describe();
            if let Some(error) = status.error.clone() {
                error!(
                    "event=process_retire module=coordinator status=error process_id={} error={}",
                    process.id(),
                    error
                );
                registry.failures.push_back(FailedProcess {
                    id: process.id(),
                    description: status.description.clone(),
                    error,
                    retired_at_ms: now_epoch_ms(),
                });
                while registry.failures.len() > self.config.max_recorded_failures {
                    registry.failures.pop_front();
                }
            } else {
                info!(
                    "event=process_retire module=coordinator status=ok process_id={}",
                    process.id()
                );
            }
            retired.push(status);
        }
        registry.slots = kept;
        retired
    }

    fn admit(&self, registry: &mut Registry) {
        let mut busy = registry.busy_targets();
        let mut active = registry.active_workers();
        for process in registry.slots.iter_mut() {
            if process.is_done() || process.is_running() {
                continue;
            }
            if self.config.policy == AdmissionPolicy::Serial && active > 0 {
                break;
            }
            if let Some(target) = process.target() {
                if busy.contains(&target) {
                    continue;
                }
            }
            // A failed start leaves the process terminal; `poll` retires it.
            if process.start(self).is_ok() {
                active += 1;
                if let Some(target) = process.target() {
                    busy.insert(target);
                }
            }
        }
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases an immediate process's project and admits work it held back.
struct TargetClaim<'a> {
    coordinator: &'a ProcessCoordinator,
    target: Option<ProjectId>,
}

impl Drop for TargetClaim<'_> {
    fn drop(&mut self) {
        if let Some(target) = self.target {
            let mut registry = self.coordinator.lock_registry();
            registry.claimed.remove(&target);
            self.coordinator.admit(&mut registry);
        }
    }
}

impl Drop for ProcessCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
