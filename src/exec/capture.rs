// src/exec/capture.rs

//! Captured process output and the sanitizing applied to it.

use crate::errors::FileExecError;

/// Maximum number of stderr bytes kept from a single command.
pub const MAX_STDERR_BYTES: usize = 512;

/// Appended to stderr whenever it was cut short.
pub const TRUNCATION_MARKER: &[u8] = b"...";

/// What one command invocation produced.
///
/// `error` is `None` only when the process ran and exited successfully.
#[derive(Debug, Default)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub error: Option<FileExecError>,
}

impl CapturedOutput {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// A run that failed before producing any output.
    pub fn failed(error: FileExecError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Cut stderr down to a single, bounded line.
///
/// The buffer is capped at [`MAX_STDERR_BYTES`], then cut at the first
/// newline. [`TRUNCATION_MARKER`] is appended if anything was dropped; a
/// single trailing newline on its own does not count as truncation.
pub fn truncate_stderr(mut buf: Vec<u8>) -> Vec<u8> {
    let mut did_truncate = false;
    if buf.len() > MAX_STDERR_BYTES {
        buf.truncate(MAX_STDERR_BYTES);
        did_truncate = true;
    }
    if let Some(i) = buf.iter().position(|&b| b == b'\n') {
        if i > 0 {
            if i < buf.len() - 1 {
                did_truncate = true;
            }
            buf.truncate(i);
        }
    }
    if did_truncate {
        buf.extend_from_slice(TRUNCATION_MARKER);
    }
    buf
}

/// Remove every carriage return from `buf`.
pub fn strip_carriage_returns(buf: &[u8]) -> Vec<u8> {
    buf.iter().copied().filter(|&b| b != b'\r').collect()
}

/// Platform line-ending cleanup applied to both stdout and stderr.
///
/// Only Windows commands emit `\r\n`; elsewhere the buffer is untouched.
pub fn sanitize(buf: Vec<u8>) -> Vec<u8> {
    if cfg!(windows) {
        strip_carriage_returns(&buf)
    } else {
        buf
    }
}
