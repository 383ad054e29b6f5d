// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling watch globs (including the recursive `**`) and expanding them
//!   against a [`FileSystem`](crate::fs::FileSystem).
//! - Tracking the last seen modification time of every matched file and
//!   classifying each scan result as new, unchanged or changed.
//! - The process-wide [`ModTimeRegistry`] that seeds new instances.
//!
//! It does **not** run commands; it only turns modification times into
//! per-path triggers. Polling is driven by the caller.

pub mod patterns;
pub mod registry;
pub mod tracker;

pub use patterns::GlobPattern;
pub use registry::ModTimeRegistry;
pub use tracker::{FileRecord, FileStateTracker, ScanEntry, ScanReport, WatchTarget};
