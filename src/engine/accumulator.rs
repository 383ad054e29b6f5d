// src/engine/accumulator.rs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::error;

use crate::errors::FileExecError;
use crate::metric::Metric;

/// Sink for everything the pipeline produces.
///
/// Errors are reported here and processing always continues.
pub trait Accumulator: Send + Sync {
    fn add_metric(&self, metric: Metric);
    fn add_error(&self, error: FileExecError);
}

/// In-memory accumulator that buffers metrics and errors until drained.
///
/// Cloning shares the buffer, so a clone can be handed to the pipeline while
/// the original is drained by the owner.
#[derive(Debug, Clone, Default)]
pub struct MetricBuffer {
    inner: Arc<Mutex<Buffered>>,
}

#[derive(Debug, Default)]
struct Buffered {
    metrics: Vec<Metric>,
    errors: Vec<FileExecError>,
}

impl MetricBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buffered> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take everything buffered so far.
    pub fn drain(&self) -> (Vec<Metric>, Vec<FileExecError>) {
        let mut buf = self.lock();
        (
            std::mem::take(&mut buf.metrics),
            std::mem::take(&mut buf.errors),
        )
    }

    pub fn metric_count(&self) -> usize {
        self.lock().metrics.len()
    }

    pub fn error_count(&self) -> usize {
        self.lock().errors.len()
    }
}

impl Accumulator for MetricBuffer {
    fn add_metric(&self, metric: Metric) {
        self.lock().metrics.push(metric);
    }

    fn add_error(&self, err: FileExecError) {
        error!(error = %err, "pipeline error");
        self.lock().errors.push(err);
    }
}
