// src/config/validate.rs

use tracing::warn;

use crate::config::model::{ConfigFile, FileExecConfig, RawConfigFile};
use crate::errors::{FileExecError, Result};
use crate::exec::FILEPATH_PLACEHOLDER;
use crate::types::DataFormat;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::FileExecError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.agent,
            raw.inputs.fileexec,
            raw.outputs,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_inputs(cfg)?;
    validate_agent(cfg)?;
    for (index, input) in cfg.inputs.fileexec.iter().enumerate() {
        validate_input(index, input)?;
    }
    Ok(())
}

fn ensure_has_inputs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.inputs.fileexec.is_empty() {
        return Err(FileExecError::ConfigError(
            "config must contain at least one [[inputs.fileexec]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_agent(cfg: &RawConfigFile) -> Result<()> {
    if cfg.agent.interval()?.is_zero() {
        return Err(FileExecError::ConfigError(
            "[agent].interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_input(index: usize, input: &FileExecConfig) -> Result<()> {
    if input.files.iter().all(|f| f.trim().is_empty()) {
        return Err(FileExecError::ConfigError(format!(
            "inputs.fileexec[{index}] has no `files` to watch"
        )));
    }

    let commands = input.effective_commands();
    if commands.iter().all(|c| c.trim().is_empty()) {
        return Err(FileExecError::ConfigError(format!(
            "inputs.fileexec[{index}] has no `commands` to run"
        )));
    }

    if input.timeout()?.is_zero() {
        return Err(FileExecError::ConfigError(format!(
            "inputs.fileexec[{index}] timeout must be greater than zero"
        )));
    }

    if input.data_format == DataFormat::Csv {
        input.csv.validate().map_err(|e| match e {
            FileExecError::ConfigError(msg) => {
                FileExecError::ConfigError(format!("inputs.fileexec[{index}] {msg}"))
            }
            other => other,
        })?;
    }

    for command in commands
        .iter()
        .filter(|c| !c.contains(FILEPATH_PLACEHOLDER))
    {
        warn!(
            input = index,
            command = %command,
            "command does not reference {FILEPATH_PLACEHOLDER}; it will run unchanged for every file"
        );
    }

    Ok(())
}

/// Re-run the semantic checks on an already-built config, e.g. after it was
/// modified programmatically.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    let raw = RawConfigFile {
        agent: cfg.agent().clone(),
        inputs: crate::config::model::InputsSection {
            fileexec: cfg.inputs().to_vec(),
        },
        outputs: cfg.outputs().clone(),
    };
    validate_raw_config(&raw)
}
