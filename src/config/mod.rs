// src/config/mod.rs

//! Configuration loading and validation for fileexec.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate the per-input invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    AgentSection, ConfigFile, FileExecConfig, InputsSection, OutputsSection, RawConfigFile,
    StdoutOutputConfig,
};
pub use validate::validate_config;
