// src/errors.rs

//! Crate-wide error type.
//!
//! Every pipeline error is reported to the metric sink and processing
//! continues; nothing in here is fatal to the collector as a whole.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileExecError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A watch pattern or executable glob could not be compiled.
    #[error("glob {pattern:?} failed to compile: {source}")]
    GlobCompile {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A matched path could not be stat'ed (it usually vanished mid-scan).
    #[error("unable to stat {path:?}: {reason}")]
    Stat { path: PathBuf, reason: String },

    #[error("exec: unable to parse command '{command}': {reason}")]
    CommandParse { command: String, reason: String },

    #[error("exec: failed to run command '{command}': {source}")]
    ProcessIo {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exec: command '{command}' timed out after {timeout:?}: {stderr}")]
    ProcessTimeout {
        command: String,
        timeout: Duration,
        stderr: String,
    },

    /// The process ran to completion but did not exit successfully.
    ///
    /// `code` is `None` when the process was terminated by a signal.
    #[error("exec: {status} for command '{command}': {stderr}")]
    ProcessExit {
        command: String,
        code: Option<i32>,
        status: String,
        stderr: String,
    },

    #[error("{format} parse error: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FileExecError {
    pub(crate) fn parse(format: &'static str, message: impl Into<String>) -> Self {
        FileExecError::Parse {
            format,
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FileExecError>;
