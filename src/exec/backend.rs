// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The dispatcher talks to a `CommandRunner` instead of spawning processes
//! itself. Production code uses [`ProcessRunner`](super::ProcessRunner);
//! tests provide a fake that returns scripted output without touching the
//! OS.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::capture::CapturedOutput;

/// Boxed future returned by [`CommandRunner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = CapturedOutput> + Send + 'a>>;

/// Trait abstracting how a single command line is executed.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion or until `timeout` elapses.
    ///
    /// Never fails outright: every problem (unparseable command line, spawn
    /// failure, timeout, non-zero exit) is carried in
    /// [`CapturedOutput::error`] next to whatever output was captured.
    fn run<'a>(&'a self, command: &'a str, timeout: Duration) -> RunFuture<'a>;
}
