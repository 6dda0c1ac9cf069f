//! Completion signal shared between the coordinator and its workers.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Generation counter bumped every time a worker finishes.
#[derive(Debug, Default)]
pub(crate) struct CompletionSignal {
    generation: Mutex<u64>,
    cvar: Condvar,
}

impl CompletionSignal {
    pub(crate) fn notify(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        *generation = generation.wrapping_add(1);
        self.cvar.notify_all();
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Blocks until the generation moves past `seen` or `timeout` elapses.
    pub(crate) fn wait_past(&self, seen: u64, timeout: Duration) {
        let guard = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        let _ = self
            .cvar
            .wait_timeout_while(guard, timeout, |generation| *generation == seen)
            .unwrap_or_else(|e| e.into_inner());
    }
}
