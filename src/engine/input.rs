// src/engine/input.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::FileExecConfig;
use crate::errors::Result;
use crate::exec::{CommandExpander, CommandRunner, ProcessRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::parse::OutputParser;
use crate::watch::{FileStateTracker, ModTimeRegistry, ScanReport, WatchTarget};

use super::accumulator::Accumulator;
use super::dispatcher::ChangeDispatcher;

/// What one `start` or `gather` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherSummary {
    /// Files that triggered, in dispatch order.
    pub changed: Vec<PathBuf>,
    /// Total number of commands run across all changed files.
    pub commands: usize,
    /// Paths matched by the watch targets in this scan.
    pub matched: usize,
}

/// One configured `[[inputs.fileexec]]` instance.
///
/// The caller drives it: `start` once to record a baseline, then `gather` on
/// every tick. Each call holds this instance's lock for its whole duration,
/// dispatch included, so scans of the same instance never overlap.
#[derive(Debug)]
pub struct FileExec {
    targets: Vec<WatchTarget>,
    templates: Vec<String>,
    observe_from_start: bool,
    registry: ModTimeRegistry,
    tracker: Mutex<FileStateTracker>,
    dispatcher: ChangeDispatcher,
}

impl FileExec {
    /// Build an input that runs real processes against the real filesystem.
    pub fn new(config: &FileExecConfig, registry: ModTimeRegistry) -> Result<Self> {
        Self::with_backends(
            config,
            registry,
            Arc::new(RealFileSystem),
            Arc::new(ProcessRunner::new()),
        )
    }

    /// Build an input with explicit filesystem and runner implementations.
    ///
    /// The tracker starts from a snapshot of `registry`; later changes to the
    /// registry do not affect this instance.
    pub fn with_backends(
        config: &FileExecConfig,
        registry: ModTimeRegistry,
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let timeout = config.timeout()?;
        let tracker = FileStateTracker::seeded(Arc::clone(&fs), registry.snapshot());
        let dispatcher = ChangeDispatcher::new(
            CommandExpander::new(fs),
            runner,
            OutputParser::new(config.decoder()),
            timeout,
        );

        Ok(Self {
            targets: config.watch_targets(),
            templates: config.effective_commands(),
            observe_from_start: config.observe_from_start,
            registry,
            tracker: Mutex::new(tracker),
            dispatcher,
        })
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Forget all state, record a baseline for every file that exists now
    /// and publish that baseline as the registry's new generation.
    ///
    /// Nothing is dispatched: files present at start are never treated as
    /// changed.
    pub async fn start(&self, acc: &Arc<dyn Accumulator>) -> GatherSummary {
        let mut tracker = self.tracker.lock().await;
        tracker.reset();

        let report = tracker.scan(&self.targets, false);
        let matched = report.entries.len();
        report_errors(report, acc);

        let generation = self.registry.replace(tracker.mod_times());
        info!(files = matched, generation, "fileexec input started");

        GatherSummary {
            matched,
            ..GatherSummary::default()
        }
    }

    /// Scan with the configured `observe_from_start` and dispatch every
    /// changed file.
    pub async fn gather(&self, acc: &Arc<dyn Accumulator>) -> GatherSummary {
        self.gather_with(acc, self.observe_from_start).await
    }

    /// Scan, then dispatch each changed file in turn. A file's commands are
    /// all joined before the next file is dispatched.
    pub async fn gather_with(
        &self,
        acc: &Arc<dyn Accumulator>,
        observe_from_start: bool,
    ) -> GatherSummary {
        let mut tracker = self.tracker.lock().await;
        debug!(targets = self.targets.len(), observe_from_start, "gather");

        let report = tracker.scan(&self.targets, observe_from_start);
        let matched = report.entries.len();
        let changed: Vec<PathBuf> = report.triggered().map(Path::to_path_buf).collect();
        report_errors(report, acc);

        let mut commands = 0;
        for path in &changed {
            commands += self.dispatcher.dispatch(path, &self.templates, acc).await;
        }

        GatherSummary {
            changed,
            commands,
            matched,
        }
    }

    /// Stored modification time for `path`, if it is being tracked.
    pub async fn last_modified(&self, path: &Path) -> Option<SystemTime> {
        self.tracker
            .lock()
            .await
            .record(path)
            .map(|record| record.last_modified)
    }
}

fn report_errors(report: ScanReport, acc: &Arc<dyn Accumulator>) {
    for err in report.errors {
        acc.add_error(err);
    }
}
