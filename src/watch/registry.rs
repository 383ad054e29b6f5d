// src/watch/registry.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tracing::info;

/// Process-wide table of last-known modification times, shared by every
/// `FileExec` instance created from the same registry.
///
/// The table is never consulted during a scan. Instances take a snapshot copy
/// when they are constructed and replace the whole table when they start, so
/// an instance created later can never mutate the state of one that is
/// already running.
#[derive(Debug, Clone, Default)]
pub struct ModTimeRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    generation: u64,
    mod_times: HashMap<PathBuf, SystemTime>,
}

impl ModTimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current table.
    pub fn snapshot(&self) -> HashMap<PathBuf, SystemTime> {
        self.lock().mod_times.clone()
    }

    /// Replace the whole table and start a new generation.
    ///
    /// Returns the new generation number.
    pub fn replace(&self, mod_times: HashMap<PathBuf, SystemTime>) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        state.mod_times = mod_times;
        info!(
            generation = state.generation,
            paths = state.mod_times.len(),
            "modification time registry reset"
        );
        state.generation
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn len(&self) -> usize {
        self.lock().mod_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
