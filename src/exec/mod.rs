// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for turning command templates into command
//! lines and actually running them, using `tokio::process::Command`.
//!
//! - [`expand`] resolves executable globs and the `{filepath}` placeholder.
//! - [`runner`] runs one command with a hard timeout.
//! - [`capture`] holds the captured output and the stderr truncation /
//!   line-ending cleanup applied to it.
//! - [`backend`] provides the `CommandRunner` trait that the dispatcher uses
//!   in production, and which tests can replace with a fake implementation.

pub mod backend;
pub mod capture;
pub mod expand;
pub mod runner;

pub use backend::{CommandRunner, RunFuture};
pub use capture::{CapturedOutput, MAX_STDERR_BYTES, TRUNCATION_MARKER};
pub use expand::{CommandExpander, Expansion, FILEPATH_PLACEHOLDER};
pub use runner::ProcessRunner;
