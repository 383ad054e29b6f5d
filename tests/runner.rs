#![cfg(unix)]

use std::time::{Duration, Instant};

use fileexec::errors::FileExecError;
use fileexec::exec::{CommandRunner, ProcessRunner};
use fileexec_test_utils::{init_tracing, with_timeout};

const LIMIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn captures_stdout_of_successful_command() {
    init_tracing();
    let out = with_timeout(ProcessRunner::new().run("/bin/echo hello world", LIMIT)).await;

    assert!(out.is_success(), "unexpected error: {:?}", out.error);
    assert_eq!(out.stdout, b"hello world\n");
    assert!(out.stderr.is_empty());
}

#[tokio::test]
async fn arguments_are_split_with_shell_quoting() {
    let out = with_timeout(ProcessRunner::new().run(r#"/bin/echo "a  b"   'c d'"#, LIMIT)).await;
    assert_eq!(String::from_utf8_lossy(&out.stdout), "a  b c d\n");
}

#[tokio::test]
async fn non_zero_exit_reports_code_and_stderr() {
    init_tracing();
    let out = with_timeout(
        ProcessRunner::new().run(r#"/bin/sh -c "echo partial; echo oops >&2; exit 3""#, LIMIT),
    )
    .await;

    assert_eq!(out.stdout, b"partial\n");
    match out.error {
        Some(FileExecError::ProcessExit { code, stderr, .. }) => {
            assert_eq!(code, Some(3));
            assert_eq!(stderr, "oops");
        }
        other => panic!("expected ProcessExit, got {other:?}"),
    }
}

#[tokio::test]
async fn multi_line_stderr_is_cut_to_first_line() {
    let out = with_timeout(
        ProcessRunner::new().run(r#"/bin/sh -c "printf 'first\nsecond\n' >&2; exit 1""#, LIMIT),
    )
    .await;

    assert_eq!(out.stderr_lossy(), "first...");
    let err = out.error.expect("error");
    assert!(err.to_string().contains("first..."), "{err}");
}

#[tokio::test]
async fn slow_command_is_killed_at_the_timeout() {
    init_tracing();
    let started = Instant::now();
    let out = with_timeout(
        ProcessRunner::new().run("/bin/sleep 5", Duration::from_millis(200)),
    )
    .await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(
        out.error,
        Some(FileExecError::ProcessTimeout { timeout, .. }) if timeout == Duration::from_millis(200)
    ));
}

#[tokio::test]
async fn timed_out_command_keeps_output_written_before_the_kill() {
    let out = with_timeout(ProcessRunner::new().run(
        r#"/bin/sh -c "echo early; exec /bin/sleep 5""#,
        Duration::from_millis(800),
    ))
    .await;

    assert!(matches!(out.error, Some(FileExecError::ProcessTimeout { .. })));
    assert_eq!(out.stdout, b"early\n");
}

#[tokio::test]
async fn background_process_holding_the_pipes_cannot_outlive_the_timeout() {
    init_tracing();
    let started = Instant::now();
    let out = with_timeout(ProcessRunner::new().run(
        "/bin/sh -c 'sleep 3 & echo hi'",
        Duration::from_millis(200),
    ))
    .await;

    let elapsed = started.elapsed();
    assert!(
        elapsed < Duration::from_millis(1500),
        "run took {elapsed:?} with a 200ms timeout"
    );
    assert!(
        matches!(out.error, Some(FileExecError::ProcessTimeout { .. })),
        "expected ProcessTimeout, got {:?}",
        out.error
    );
    assert_eq!(out.stdout, b"hi\n");
}

#[tokio::test]
async fn unbalanced_quote_is_a_parse_error() {
    let out = ProcessRunner::new().run(r#"/bin/echo "unterminated"#, LIMIT).await;
    assert!(matches!(out.error, Some(FileExecError::CommandParse { .. })));
    assert!(out.stdout.is_empty());
}

#[tokio::test]
async fn blank_command_is_a_parse_error() {
    let out = ProcessRunner::new().run("   ", LIMIT).await;
    assert!(matches!(out.error, Some(FileExecError::CommandParse { .. })));
}

#[tokio::test]
async fn missing_executable_is_a_process_io_error() {
    let out = ProcessRunner::new()
        .run("/nonexistent/definitely-not-here.sh a.log", LIMIT)
        .await;
    assert!(matches!(out.error, Some(FileExecError::ProcessIo { .. })));
}
