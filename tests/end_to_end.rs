#![cfg(unix)]

mod common;

use std::fs;

use common::{TestResult, accumulator, bump_mtime};
use fileexec::engine::FileExec;
use fileexec::errors::FileExecError;
use fileexec::metric::FieldValue;
use fileexec::parse::nagios::{STATE_METRIC, STATE_UNKNOWN};
use fileexec::types::DataFormat;
use fileexec::watch::ModTimeRegistry;
use fileexec_test_utils::{FileExecConfigBuilder, init_tracing, with_timeout};

#[tokio::test]
async fn modified_file_is_reported_through_a_real_command() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("app.log");
    fs::write(&log, "started\n")?;
    fs::write(dir.path().join("other.txt"), "ignored\n")?;

    let config = FileExecConfigBuilder::new()
        .watch(format!("{}/*.log", dir.path().display()))
        .command("/bin/echo file,path={filepath} seen=1i")
        .build();
    let exec = FileExec::new(&config, ModTimeRegistry::new())?;
    let (buffer, acc) = accumulator();

    exec.start(&acc).await;
    assert_eq!(exec.gather(&acc).await.commands, 0);

    bump_mtime(&log, 5)?;
    let summary = with_timeout(exec.gather(&acc)).await;
    assert_eq!(summary.changed, vec![log.clone()]);

    let (metrics, errors) = buffer.drain();
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].name, "file");
    assert_eq!(metrics[0].tag("path"), log.to_str());
    assert_eq!(metrics[0].field("seen"), Some(&FieldValue::Integer(1)));
    Ok(())
}

#[tokio::test]
async fn timed_out_command_is_an_error_without_metrics() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("a.log");
    fs::write(&log, "x")?;

    let config = FileExecConfigBuilder::new()
        .watch(log.display().to_string())
        .command("/bin/sleep 5")
        .timeout("200ms")
        .build();
    let exec = FileExec::new(&config, ModTimeRegistry::new())?;
    let (buffer, acc) = accumulator();
    exec.start(&acc).await;

    bump_mtime(&log, 5)?;
    with_timeout(exec.gather(&acc)).await;

    let (metrics, errors) = buffer.drain();
    assert!(metrics.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], FileExecError::ProcessTimeout { .. }));
    Ok(())
}

#[tokio::test]
async fn timed_out_health_check_reports_unknown_state() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("a.log");
    fs::write(&log, "x")?;

    let config = FileExecConfigBuilder::new()
        .watch(log.display().to_string())
        .command("/bin/sleep 5")
        .timeout("200ms")
        .data_format(DataFormat::Nagios)
        .build();
    let exec = FileExec::new(&config, ModTimeRegistry::new())?;
    let (buffer, acc) = accumulator();
    exec.start(&acc).await;

    bump_mtime(&log, 5)?;
    with_timeout(exec.gather(&acc)).await;

    let (metrics, errors) = buffer.drain();
    assert!(errors.is_empty(), "{errors:?}");
    let state = metrics.iter().find(|m| m.name == STATE_METRIC).expect("state metric");
    assert_eq!(state.field("state"), Some(&FieldValue::Integer(STATE_UNKNOWN)));
    Ok(())
}

#[tokio::test]
async fn unmatched_executable_glob_is_run_as_written() -> TestResult {
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("a.log");
    fs::write(&log, "x")?;

    let config = FileExecConfigBuilder::new()
        .watch(log.display().to_string())
        .command("/nonexistent/*.sh {filepath}")
        .build();
    let exec = FileExec::new(&config, ModTimeRegistry::new())?;
    let (buffer, acc) = accumulator();
    exec.start(&acc).await;

    bump_mtime(&log, 5)?;
    with_timeout(exec.gather(&acc)).await;

    let (_metrics, errors) = buffer.drain();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        FileExecError::ProcessIo { command, .. } => {
            assert_eq!(command, &format!("/nonexistent/*.sh {}", log.display()));
        }
        other => panic!("expected ProcessIo, got {other:?}"),
    }
    Ok(())
}
