// src/engine/dispatcher.rs

//! Fan-out of one changed file to all of its commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::errors::FileExecError;
use crate::exec::{CommandExpander, CommandRunner};
use crate::parse::nagios;
use crate::parse::OutputParser;

use super::accumulator::Accumulator;

/// Runs every expanded command for a changed file concurrently and feeds
/// each result through the parser into the accumulator.
///
/// A dispatch is `expand -> fan out -> join all`: it returns only after every
/// command has finished, failed or timed out. Each command succeeds or fails
/// on its own; siblings are never cancelled.
pub struct ChangeDispatcher {
    expander: CommandExpander,
    runner: Arc<dyn CommandRunner>,
    parser: Arc<OutputParser>,
    timeout: Duration,
}

impl std::fmt::Debug for ChangeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeDispatcher")
            .field("format", &self.parser.format())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ChangeDispatcher {
    pub fn new(
        expander: CommandExpander,
        runner: Arc<dyn CommandRunner>,
        parser: OutputParser,
        timeout: Duration,
    ) -> Self {
        Self {
            expander,
            runner,
            parser: Arc::new(parser),
            timeout,
        }
    }

    /// Handle one changed file. Returns the number of commands that ran.
    pub async fn dispatch(
        &self,
        changed_path: &Path,
        templates: &[String],
        acc: &Arc<dyn Accumulator>,
    ) -> usize {
        let expansion = self.expander.expand(templates, changed_path);
        for err in expansion.errors {
            acc.add_error(err);
        }

        let count = expansion.commands.len();
        info!(path = ?changed_path, commands = count, "dispatching commands for changed file");

        let mut tasks = JoinSet::new();
        for command in expansion.commands {
            let runner = Arc::clone(&self.runner);
            let parser = Arc::clone(&self.parser);
            let acc = Arc::clone(acc);
            let timeout = self.timeout;
            tasks.spawn(async move {
                process_command(runner.as_ref(), &parser, &command, timeout, acc.as_ref()).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                acc.add_error(FileExecError::Other(anyhow!("command task failed: {err}")));
            }
        }

        debug!(path = ?changed_path, "dispatch finished");
        count
    }
}

/// Run one command and push its metrics (or its error) to `acc`.
async fn process_command(
    runner: &dyn CommandRunner,
    parser: &OutputParser,
    command: &str,
    timeout: Duration,
    acc: &dyn Accumulator,
) {
    info!(cmd = %command, "processing command");

    let output = runner.run(command, timeout).await;
    let health_check = parser.is_health_check();

    // Health checks keep going: the failure becomes their `state` field.
    let run_error = match output.error {
        Some(err) if !health_check => {
            acc.add_error(err);
            return;
        }
        other => other,
    };

    let mut metrics = match parser.parse(command, &output.stdout) {
        Ok(metrics) => metrics,
        Err(err) => {
            acc.add_error(err);
            return;
        }
    };

    if health_check {
        nagios::add_state(run_error.as_ref(), &mut metrics);
    }

    debug!(cmd = %command, metrics = metrics.len(), "command produced metrics");
    for metric in metrics {
        acc.add_metric(metric);
    }
}
