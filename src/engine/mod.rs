// src/engine/mod.rs

//! Orchestration engine for fileexec.
//!
//! This module ties together:
//! - the file tracker (which files changed since the last scan)
//! - the dispatcher (expand, run and parse every command of a changed file)
//! - the accumulator the results are reported to
//!
//! [`FileExec`] is the entry point an external scheduler calls into; it owns
//! no timer of its own.

pub mod accumulator;
pub mod dispatcher;
pub mod input;

pub use accumulator::{Accumulator, MetricBuffer};
pub use dispatcher::ChangeDispatcher;
pub use input::{FileExec, GatherSummary};
