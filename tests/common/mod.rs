#![allow(dead_code)]

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use fileexec::engine::{Accumulator, MetricBuffer};
use fileexec::metric::Metric;

pub type TestResult = Result<(), Box<dyn Error>>;

/// A fresh buffer plus the trait-object handle the pipeline takes.
pub fn accumulator() -> (MetricBuffer, Arc<dyn Accumulator>) {
    let buffer = MetricBuffer::new();
    let acc: Arc<dyn Accumulator> = Arc::new(buffer.clone());
    (buffer, acc)
}

/// Move a real file's modification time `secs` seconds past its current one.
///
/// Filesystems with coarse timestamps make a plain rewrite unreliable, so
/// tests set the time explicitly.
pub fn bump_mtime(path: &Path, secs: u64) -> std::io::Result<()> {
    let current = std::fs::metadata(path)?.modified()?;
    set_mtime(path, current + Duration::from_secs(secs))
}

pub fn set_mtime(path: &Path, time: SystemTime) -> std::io::Result<()> {
    filetime::set_file_mtime(path, FileTime::from_system_time(time))
}

pub fn names(metrics: &[Metric]) -> Vec<&str> {
    metrics.iter().map(|m| m.name.as_str()).collect()
}
