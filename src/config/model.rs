// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::errors::{FileExecError, Result};
use crate::parse::{CsvSettings, DEFAULT_METRIC_NAME, Decoder};
use crate::types::{DataFormat, ValueType, parse_duration};
use crate::watch::WatchTarget;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [agent]
/// interval = "10s"
///
/// [[inputs.fileexec]]
/// files = ["/var/log/app/*.log"]
/// commands = ["/usr/local/bin/summarize {filepath}"]
/// timeout = "5s"
/// data_format = "influx"
///
/// [outputs.stdout]
/// table = "metrics"
/// ```
///
/// This is the unvalidated form; see [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub inputs: InputsSection,

    #[serde(default)]
    pub outputs: OutputsSection,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`
/// (or [`ConfigFile::new_unchecked`] from within the crate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    agent: AgentSection,
    inputs: Vec<FileExecConfig>,
    outputs: OutputsSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        agent: AgentSection,
        inputs: Vec<FileExecConfig>,
        outputs: OutputsSection,
    ) -> Self {
        Self {
            agent,
            inputs,
            outputs,
        }
    }

    pub fn agent(&self) -> &AgentSection {
        &self.agent
    }

    pub fn inputs(&self) -> &[FileExecConfig] {
        &self.inputs
    }

    pub fn outputs(&self) -> &OutputsSection {
        &self.outputs
    }
}

/// `[agent]` section: scheduling of the gather loop.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// How often every input is gathered.
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_interval() -> String {
    "10s".to_string()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

impl AgentSection {
    pub fn interval(&self) -> Result<Duration> {
        parse_duration(&self.interval)
            .map_err(|e| FileExecError::ConfigError(format!("[agent].interval: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InputsSection {
    /// All `[[inputs.fileexec]]` tables, in file order.
    #[serde(default)]
    pub fileexec: Vec<FileExecConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputsSection {
    /// `[outputs.stdout]`; when absent, metrics are still written to stdout
    /// with the default settings.
    #[serde(default)]
    pub stdout: Option<StdoutOutputConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StdoutOutputConfig {
    /// Prefix for every measurement name (`<table>.<name>`). Empty disables
    /// the prefix.
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "metrics".to_string()
}

impl Default for StdoutOutputConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
        }
    }
}

/// One `[[inputs.fileexec]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct FileExecConfig {
    /// Watch patterns. Glob syntax with `**` for recursive descent.
    #[serde(default)]
    pub files: Vec<String>,

    /// Command templates run for every changed file.
    #[serde(default)]
    pub commands: Vec<String>,

    /// Single-command form, appended to `commands`.
    #[serde(default)]
    pub command: Option<String>,

    /// Per-command time limit.
    #[serde(default = "default_timeout")]
    pub timeout: String,

    #[serde(default)]
    pub data_format: DataFormat,

    /// Metric name for formats that do not carry one (`csv`, `value`).
    #[serde(default = "default_metric_name")]
    pub metric_name: String,

    /// When true, a file first seen after start triggers immediately.
    #[serde(default = "default_observe_from_start")]
    pub observe_from_start: bool,

    /// Field type for `data_format = "value"`.
    #[serde(default)]
    pub data_type: ValueType,

    #[serde(flatten)]
    pub csv: CsvSettings,
}

fn default_timeout() -> String {
    "5s".to_string()
}

fn default_metric_name() -> String {
    DEFAULT_METRIC_NAME.to_string()
}

fn default_observe_from_start() -> bool {
    true
}

impl Default for FileExecConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            commands: Vec::new(),
            command: None,
            timeout: default_timeout(),
            data_format: DataFormat::default(),
            metric_name: default_metric_name(),
            observe_from_start: default_observe_from_start(),
            data_type: ValueType::default(),
            csv: CsvSettings::default(),
        }
    }
}

impl FileExecConfig {
    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(&self.timeout)
            .map_err(|e| FileExecError::ConfigError(format!("inputs.fileexec timeout: {e}")))
    }

    /// `commands` followed by the legacy `command`, if set.
    pub fn effective_commands(&self) -> Vec<String> {
        let mut commands = self.commands.clone();
        if let Some(command) = &self.command {
            commands.push(command.clone());
        }
        commands
    }

    pub fn watch_targets(&self) -> Vec<WatchTarget> {
        self.files.iter().map(|f| WatchTarget::new(f.as_str())).collect()
    }

    /// Fresh decoder for this input's data format.
    pub fn decoder(&self) -> Decoder {
        Decoder::new(
            self.data_format,
            &self.metric_name,
            self.data_type,
            self.csv.clone(),
        )
    }
}
