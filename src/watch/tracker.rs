// src/watch/tracker.rs

//! Per-instance modification-time state.
//!
//! The tracker is synchronous and owns no locks; the `FileExec` input wraps it
//! in its own mutex so one scan never overlaps another for the same instance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, error, info, warn};

use crate::errors::FileExecError;
use crate::fs::FileSystem;
use crate::watch::patterns::GlobPattern;

/// A glob pattern naming zero or more files to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget(String);

impl WatchTarget {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn pattern(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WatchTarget {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WatchTarget {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// State kept for every path a watch target has matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub last_modified: SystemTime,
    /// True once a baseline modification time has been recorded.
    pub tracked: bool,
}

/// Classification of one matched path in one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub triggered: bool,
}

/// Result of a scan: every matched path in target order, plus the errors that
/// were surfaced along the way (bad patterns, vanished files).
#[derive(Debug, Default)]
pub struct ScanReport {
    pub entries: Vec<ScanEntry>,
    pub errors: Vec<FileExecError>,
}

impl ScanReport {
    /// Paths that need a dispatch, in scan order.
    pub fn triggered(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|e| e.triggered)
            .map(|e| e.path.as_path())
    }
}

#[derive(Debug)]
pub struct FileStateTracker {
    fs: Arc<dyn FileSystem>,
    records: HashMap<PathBuf, FileRecord>,
}

impl FileStateTracker {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            records: HashMap::new(),
        }
    }

    /// Build a tracker whose records start out as a copy of `seed`.
    pub fn seeded(fs: Arc<dyn FileSystem>, seed: HashMap<PathBuf, SystemTime>) -> Self {
        let records = seed
            .into_iter()
            .map(|(path, last_modified)| {
                let record = FileRecord {
                    path: path.clone(),
                    last_modified,
                    tracked: true,
                };
                (path, record)
            })
            .collect();
        Self { fs, records }
    }

    pub fn record(&self, path: &Path) -> Option<&FileRecord> {
        self.records.get(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Forget every record.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Current path -> modification time table.
    pub fn mod_times(&self) -> HashMap<PathBuf, SystemTime> {
        self.records
            .iter()
            .map(|(path, record)| (path.clone(), record.last_modified))
            .collect()
    }

    /// Expand every target, stat every match and classify it.
    ///
    /// - unseen path, `observe_from_start == false`: record a baseline, no
    ///   trigger (the file existed before we started looking).
    /// - unseen path, `observe_from_start == true`: record and trigger.
    /// - known path: trigger iff its mtime is strictly after the stored one.
    ///
    /// The stored time is updated as part of classification, before the caller
    /// dispatches anything, so a command that touches its own input file does
    /// not re-trigger within this scan.
    pub fn scan(&mut self, targets: &[WatchTarget], observe_from_start: bool) -> ScanReport {
        let mut report = ScanReport::default();

        for target in targets {
            let pattern = match GlobPattern::compile(target.pattern()) {
                Ok(p) => p,
                Err(err) => {
                    error!(pattern = %target.pattern(), error = %err, "watch pattern failed to compile");
                    report.errors.push(err);
                    continue;
                }
            };

            for path in pattern.expand(self.fs.as_ref()) {
                let modified = match self.fs.modified(&path) {
                    Ok(t) => t,
                    Err(err) => {
                        warn!(path = ?path, error = %err, "unable to stat watched file; skipping");
                        report.errors.push(FileExecError::Stat {
                            path,
                            reason: format!("{err:#}"),
                        });
                        continue;
                    }
                };

                let triggered = self.classify(&path, modified, observe_from_start);
                report.entries.push(ScanEntry { path, triggered });
            }
        }

        report
    }

    fn classify(&mut self, path: &Path, modified: SystemTime, observe_from_start: bool) -> bool {
        match self.records.get_mut(path) {
            Some(record) => {
                debug!(path = ?path, previous = ?record.last_modified, current = ?modified, "known file");
                if modified > record.last_modified {
                    info!(path = ?path, "changed file");
                    record.last_modified = modified;
                    record.tracked = true;
                    true
                } else {
                    false
                }
            }
            None => {
                info!(path = ?path, observe_from_start, "new file");
                self.records.insert(
                    path.to_path_buf(),
                    FileRecord {
                        path: path.to_path_buf(),
                        last_modified: modified,
                        tracked: true,
                    },
                );
                observe_from_start
            }
        }
    }
}
