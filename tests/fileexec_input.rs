mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{TestResult, accumulator};
use fileexec::engine::FileExec;
use fileexec::exec::CapturedOutput;
use fileexec::fs::mock::MockFileSystem;
use fileexec::watch::ModTimeRegistry;
use fileexec_test_utils::{FakeRunner, FileExecConfigBuilder, init_tracing, with_timeout};

fn input(fs: &MockFileSystem, runner: &FakeRunner, registry: &ModTimeRegistry, observe: bool) -> FileExec {
    let config = FileExecConfigBuilder::new()
        .watch("logs/*.log")
        .command("collect {filepath}")
        .observe_from_start(observe)
        .build();
    FileExec::with_backends(
        &config,
        registry.clone(),
        Arc::new(fs.clone()),
        Arc::new(runner.clone()),
    )
    .expect("valid input")
}

#[tokio::test]
async fn start_records_baseline_without_dispatching() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("logs/a.log");
    fs.add_file("logs/b.log");
    let runner = FakeRunner::new();
    let registry = ModTimeRegistry::new();
    let (_buffer, acc) = accumulator();
    let exec = input(&fs, &runner, &registry, true);

    let summary = exec.start(&acc).await;
    assert_eq!(summary.matched, 2);
    assert!(summary.changed.is_empty());
    assert!(runner.calls().is_empty());
    assert_eq!(registry.generation(), 1);
    assert_eq!(registry.len(), 2);

    let summary = exec.gather(&acc).await;
    assert!(summary.changed.is_empty());
    assert!(runner.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn touched_file_runs_its_commands_once() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("logs/a.log");
    fs.add_file("logs/b.log");
    let runner = FakeRunner::new().with_stdout("collect logs/a.log", "lines count=3i\n");
    let registry = ModTimeRegistry::new();
    let (buffer, acc) = accumulator();
    let exec = input(&fs, &runner, &registry, true);
    exec.start(&acc).await;

    let touched_at = fs.touch("logs/a.log");
    let summary = with_timeout(exec.gather(&acc)).await;

    assert_eq!(summary.changed, vec![PathBuf::from("logs/a.log")]);
    assert_eq!(summary.commands, 1);
    assert_eq!(runner.calls(), vec!["collect logs/a.log"]);
    assert_eq!(exec.last_modified(Path::new("logs/a.log")).await, Some(touched_at));
    let (metrics, errors) = buffer.drain();
    assert_eq!(metrics.len(), 1);
    assert!(errors.is_empty());

    runner.clear_calls();
    let summary = exec.gather(&acc).await;
    assert!(summary.changed.is_empty());
    assert!(runner.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn new_file_triggers_only_when_observing_from_start() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("logs/a.log");
    let runner = FakeRunner::new();
    let registry = ModTimeRegistry::new();
    let (_buffer, acc) = accumulator();

    let observing = input(&fs, &runner, &registry, true);
    let ignoring = input(&fs, &runner, &registry, false);
    observing.start(&acc).await;
    ignoring.start(&acc).await;

    fs.add_file("logs/new.log");

    let summary = observing.gather(&acc).await;
    assert_eq!(summary.changed, vec![PathBuf::from("logs/new.log")]);
    let summary = ignoring.gather(&acc).await;
    assert!(summary.changed.is_empty());

    // Explicit override of the configured behaviour.
    fs.add_file("logs/newer.log");
    let summary = ignoring.gather_with(&acc, true).await;
    assert_eq!(summary.changed, vec![PathBuf::from("logs/newer.log")]);
    Ok(())
}

#[tokio::test]
async fn several_changed_files_are_dispatched_in_scan_order() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("logs/a.log");
    fs.add_file("logs/b.log");
    fs.add_file("logs/c.log");
    let runner = FakeRunner::new();
    let registry = ModTimeRegistry::new();
    let (_buffer, acc) = accumulator();
    let exec = input(&fs, &runner, &registry, true);
    exec.start(&acc).await;

    fs.touch("logs/c.log");
    fs.touch("logs/a.log");
    let summary = exec.gather(&acc).await;

    assert_eq!(
        summary.changed,
        vec![PathBuf::from("logs/a.log"), PathBuf::from("logs/c.log")]
    );
    // One file's commands finish before the next file is dispatched.
    assert_eq!(runner.calls(), vec!["collect logs/a.log", "collect logs/c.log"]);
    Ok(())
}

#[tokio::test]
async fn command_touching_its_input_retriggers_on_the_next_scan() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("logs/a.log");
    let touch_fs = fs.clone();
    let runner = FakeRunner::new().with_fallback(move |_, _| {
        touch_fs.touch("logs/a.log");
        CapturedOutput::success(Vec::new())
    });
    let registry = ModTimeRegistry::new();
    let (_buffer, acc) = accumulator();
    let exec = input(&fs, &runner, &registry, true);
    exec.start(&acc).await;

    fs.touch("logs/a.log");
    assert_eq!(exec.gather(&acc).await.changed.len(), 1);
    // The stored time was taken before the command ran, so its own write
    // counts as a new change.
    assert_eq!(exec.gather(&acc).await.changed.len(), 1);
    Ok(())
}

#[tokio::test]
async fn later_instances_are_seeded_from_the_registry() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("logs/a.log");
    let runner = FakeRunner::new();
    let registry = ModTimeRegistry::new();
    let (_buffer, acc) = accumulator();

    let first = input(&fs, &runner, &registry, true);
    first.start(&acc).await;

    // Built after the first instance published its baseline, never started.
    let second = input(&fs, &runner, &registry, true);
    let summary = second.gather(&acc).await;
    assert!(summary.changed.is_empty(), "seeded path must not look new");

    // A fresh registry has nothing to seed from.
    let isolated = input(&fs, &runner, &ModTimeRegistry::new(), true);
    let summary = isolated.gather(&acc).await;
    assert_eq!(summary.changed, vec![PathBuf::from("logs/a.log")]);
    Ok(())
}

#[tokio::test]
async fn starting_another_instance_does_not_disturb_a_running_one() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("logs/a.log");
    let runner = FakeRunner::new();
    let registry = ModTimeRegistry::new();
    let (_buffer, acc) = accumulator();

    let first = input(&fs, &runner, &registry, true);
    first.start(&acc).await;
    fs.touch("logs/a.log");

    let second = input(&fs, &runner, &registry, true);
    second.start(&acc).await;
    assert_eq!(registry.generation(), 2);

    // The first instance still sees the change it has not scanned yet.
    let summary = first.gather(&acc).await;
    assert_eq!(summary.changed, vec![PathBuf::from("logs/a.log")]);
    Ok(())
}

#[tokio::test]
async fn concurrent_gathers_of_one_instance_dispatch_a_change_once() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("logs/a.log");
    let runner = FakeRunner::new();
    let registry = ModTimeRegistry::new();
    let (_buffer, acc) = accumulator();
    let exec = Arc::new(input(&fs, &runner, &registry, true));
    exec.start(&acc).await;

    fs.touch("logs/a.log");
    let (one, two) = tokio::join!(
        {
            let exec = Arc::clone(&exec);
            let acc = Arc::clone(&acc);
            async move { exec.gather(&acc).await }
        },
        {
            let exec = Arc::clone(&exec);
            let acc = Arc::clone(&acc);
            async move { exec.gather(&acc).await }
        }
    );

    assert_eq!(one.changed.len() + two.changed.len(), 1);
    assert_eq!(runner.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn legacy_command_is_run_after_commands() -> TestResult {
    let fs = MockFileSystem::new();
    let runner = FakeRunner::new();
    let config = FileExecConfigBuilder::new()
        .watch("logs/*.log")
        .command("first {filepath}")
        .legacy_command("legacy {filepath}")
        .build();
    let exec = FileExec::with_backends(
        &config,
        ModTimeRegistry::new(),
        Arc::new(fs.clone()),
        Arc::new(runner.clone()),
    )?;
    assert_eq!(exec.templates(), ["first {filepath}", "legacy {filepath}"]);

    let (_buffer, acc) = accumulator();
    exec.start(&acc).await;
    fs.add_file("logs/x.log");
    exec.gather(&acc).await;
    assert_eq!(runner.sorted_calls(), vec!["first logs/x.log", "legacy logs/x.log"]);
    Ok(())
}
