#![allow(dead_code)]

use fileexec::config::{
    AgentSection, ConfigFile, FileExecConfig, InputsSection, OutputsSection, RawConfigFile,
};
use fileexec::types::{DataFormat, ValueType};

/// Builder for a single `FileExecConfig`.
pub struct FileExecConfigBuilder {
    config: FileExecConfig,
}

impl FileExecConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: FileExecConfig::default(),
        }
    }

    pub fn watch(mut self, pattern: impl Into<String>) -> Self {
        self.config.files.push(pattern.into());
        self
    }

    pub fn command(mut self, template: impl Into<String>) -> Self {
        self.config.commands.push(template.into());
        self
    }

    pub fn legacy_command(mut self, template: impl Into<String>) -> Self {
        self.config.command = Some(template.into());
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.config.timeout = timeout.to_string();
        self
    }

    pub fn data_format(mut self, format: DataFormat) -> Self {
        self.config.data_format = format;
        self
    }

    pub fn data_type(mut self, data_type: ValueType) -> Self {
        self.config.data_type = data_type;
        self
    }

    pub fn metric_name(mut self, name: &str) -> Self {
        self.config.metric_name = name.to_string();
        self
    }

    pub fn observe_from_start(mut self, val: bool) -> Self {
        self.config.observe_from_start = val;
        self
    }

    pub fn csv_header_rows(mut self, rows: usize) -> Self {
        self.config.csv.header_row_count = rows;
        self
    }

    pub fn build(self) -> FileExecConfig {
        self.config
    }

    /// Wrap this input in a validated single-input `ConfigFile`.
    pub fn build_file(self) -> ConfigFile {
        let raw = RawConfigFile {
            agent: AgentSection::default(),
            inputs: InputsSection {
                fileexec: vec![self.config],
            },
            outputs: OutputsSection::default(),
        };
        ConfigFile::try_from(raw).expect("Failed to build valid config from builder")
    }
}

impl Default for FileExecConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
