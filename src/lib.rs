// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod metric;
pub mod output;
pub mod parse;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{Accumulator, FileExec, MetricBuffer};
use crate::output::{LineProtocolOutput, Output};
use crate::watch::ModTimeRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one [`FileExec`] per `[[inputs.fileexec]]`, sharing one registry
/// - the stdout line-protocol output
/// - the gather interval and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let interval = cfg.agent().interval()?;
    let registry = ModTimeRegistry::new();
    let inputs = cfg
        .inputs()
        .iter()
        .map(|input| FileExec::new(input, registry.clone()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let stdout_cfg = cfg.outputs().stdout.clone().unwrap_or_default();
    let mut output = LineProtocolOutput::stdout(stdout_cfg.table);
    output.connect()?;

    let buffer = MetricBuffer::new();
    let acc: Arc<dyn Accumulator> = Arc::new(buffer.clone());

    for input in &inputs {
        input.start(&acc).await;
    }
    flush(&buffer, &mut output)?;
    info!(inputs = inputs.len(), ?interval, "baseline recorded");

    if args.once {
        gather_all(&inputs, &acc).await;
        flush(&buffer, &mut output)?;
        output.close()?;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the baseline already covers it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                gather_all(&inputs, &acc).await;
                flush(&buffer, &mut output)?;
            }
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!("shutdown requested");
                break;
            }
        }
    }

    output.close()?;
    Ok(())
}

async fn gather_all(inputs: &[FileExec], acc: &Arc<dyn Accumulator>) {
    for (index, input) in inputs.iter().enumerate() {
        let summary = input.gather(acc).await;
        debug!(
            input = index,
            matched = summary.matched,
            changed = summary.changed.len(),
            commands = summary.commands,
            "gather finished"
        );
    }
}

/// Write everything buffered so far. Errors were already logged when they
/// were reported, so only the count is kept here.
fn flush(buffer: &MetricBuffer, output: &mut dyn Output) -> Result<()> {
    let (metrics, errors) = buffer.drain();
    if !errors.is_empty() {
        debug!(errors = errors.len(), "errors reported during gather");
    }
    output.write(&metrics)?;
    Ok(())
}

/// Print the resolved inputs without running anything.
fn print_dry_run(cfg: &ConfigFile) {
    println!("fileexec dry-run");
    println!("  agent.interval = {:?}", cfg.agent().interval);
    if let Some(stdout) = &cfg.outputs().stdout {
        println!("  outputs.stdout.table = {:?}", stdout.table);
    }
    println!();

    println!("inputs ({}):", cfg.inputs().len());
    for (index, input) in cfg.inputs().iter().enumerate() {
        println!("  - [{index}] data_format = {}", input.data_format);
        println!("      files: {:?}", input.files);
        for command in input.effective_commands() {
            println!("      command: {command}");
        }
        println!("      timeout: {}", input.timeout);
        println!("      observe_from_start: {}", input.observe_from_start);
        if input.data_format != types::DataFormat::Influx {
            println!("      metric_name: {}", input.metric_name);
        }
    }

    debug!("dry-run complete (no execution)");
}
