// src/exec/runner.rs

//! Real process runner built on `tokio::process`.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::FileExecError;

use super::backend::{CommandRunner, RunFuture};
use super::capture::{sanitize, truncate_stderr, CapturedOutput};

/// How long to keep draining pipes after a timed-out process was killed.
///
/// Grandchildren that inherited the pipes can keep them open indefinitely, so
/// the readers are abandoned after this grace period.
const KILL_GRACE: Duration = Duration::from_millis(250);

/// Runs commands directly (no shell), tokenized with shell-style quoting.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run<'a>(&'a self, command: &'a str, timeout: Duration) -> RunFuture<'a> {
        Box::pin(run_command(command, timeout))
    }
}

/// Outcome of waiting on the child, before stderr is known.
enum Waited {
    Exited(ExitStatus),
    TimedOut,
    Failed(std::io::Error),
}

async fn run_command(command: &str, timeout: Duration) -> CapturedOutput {
    let argv = match shlex::split(command) {
        Some(argv) if !argv.is_empty() => argv,
        Some(_) => {
            return CapturedOutput::failed(FileExecError::CommandParse {
                command: command.to_string(),
                reason: "empty command".to_string(),
            });
        }
        None => {
            return CapturedOutput::failed(FileExecError::CommandParse {
                command: command.to_string(),
                reason: "unbalanced quotes or trailing escape".to_string(),
            });
        }
    };

    info!(cmd = %command, timeout = ?timeout, "starting command");

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            return CapturedOutput::failed(FileExecError::ProcessIo {
                command: command.to_string(),
                source,
            });
        }
    };

    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, Arc::clone(&stdout_buf)));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, Arc::clone(&stderr_buf)));
    }

    let deadline = Instant::now() + timeout;
    let mut waited = match tokio::time::timeout_at(deadline, child.wait()).await {
        Ok(Ok(status)) => Waited::Exited(status),
        Ok(Err(err)) => Waited::Failed(err),
        Err(_elapsed) => {
            warn!(cmd = %command, timeout = ?timeout, "command timed out; killing process");
            if let Err(err) = child.kill().await {
                warn!(cmd = %command, error = %err, "failed to kill timed out process");
            }
            Waited::TimedOut
        }
    };

    // A descendant holding the pipes open is bounded by the same deadline as
    // the child itself.
    let drain_deadline = match waited {
        Waited::Exited(_) => deadline,
        _ => Instant::now() + KILL_GRACE,
    };
    let mut abandoned = false;
    for reader in readers {
        abandoned |= !drain_reader(reader, drain_deadline).await;
    }
    if abandoned && matches!(waited, Waited::Exited(_)) {
        warn!(cmd = %command, timeout = ?timeout, "command output still open at the timeout");
        waited = Waited::TimedOut;
    }

    let stdout = sanitize(take_buffer(&stdout_buf));
    let mut stderr = sanitize(take_buffer(&stderr_buf));
    if !stderr.is_empty() {
        stderr = truncate_stderr(stderr);
    }
    let stderr_text = String::from_utf8_lossy(&stderr).into_owned();

    let error = match waited {
        Waited::Exited(status) if status.success() => None,
        Waited::Exited(status) => Some(FileExecError::ProcessExit {
            command: command.to_string(),
            code: status.code(),
            status: status.to_string(),
            stderr: stderr_text,
        }),
        Waited::TimedOut => Some(FileExecError::ProcessTimeout {
            command: command.to_string(),
            timeout,
            stderr: stderr_text,
        }),
        Waited::Failed(source) => Some(FileExecError::ProcessIo {
            command: command.to_string(),
            source,
        }),
    };

    debug!(
        cmd = %command,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        success = error.is_none(),
        "command finished"
    );

    CapturedOutput {
        stdout,
        stderr,
        error,
    }
}

/// Copy everything from `reader` into `buf` until EOF or a read error.
///
/// Bytes land in the shared buffer as they arrive so that output read before
/// a kill is kept even if the reader has to be abandoned.
fn spawn_reader<R>(mut reader: R, buf: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => buf
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]),
                Err(err) => {
                    debug!(error = %err, "pipe read error");
                    break;
                }
            }
        }
    })
}

/// Wait for `reader` to reach EOF, giving up at `deadline`. Returns false
/// when the reader had to be abandoned.
async fn drain_reader(mut reader: JoinHandle<()>, deadline: Instant) -> bool {
    match tokio::time::timeout_at(deadline, &mut reader).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(error = %err, "pipe reader task failed");
            true
        }
        Err(_elapsed) => {
            debug!("abandoning pipe reader held open by a descendant process");
            reader.abort();
            false
        }
    }
}

fn take_buffer(buf: &Arc<Mutex<Vec<u8>>>) -> Vec<u8> {
    std::mem::take(&mut *buf.lock().unwrap_or_else(PoisonError::into_inner))
}
