use std::io::Write;
use std::time::Duration;

use fileexec::config::{load_and_validate, load_from_str, validate_config, ConfigFile};
use fileexec::errors::FileExecError;
use fileexec::types::{DataFormat, ValueType};
use fileexec_test_utils::FileExecConfigBuilder;
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn validate(toml: &str) -> Result<ConfigFile, FileExecError> {
    ConfigFile::try_from(load_from_str(toml)?)
}

fn expect_config_error(toml: &str, needle: &str) {
    match validate(toml) {
        Err(FileExecError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "{msg:?} does not mention {needle:?}");
        }
        Err(e) => panic!("Expected ConfigError, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn full_config_loads_with_defaults() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[agent]
interval = "30s"

[[inputs.fileexec]]
files = ["/var/mymetrics.out", "/var/log/**.log"]
commands = ["/tmp/test.sh {{filepath}}", "/tmp/collect_*.sh {{filepath}}"]
timeout = "2s"

[[inputs.fileexec]]
files = ["/data/*.csv"]
command = "cat {{filepath}}"
data_format = "csv"
metric_name = "table"
observe_from_start = false
csv_header_row_count = 1
csv_tag_columns = ["host"]
csv_delimiter = ";"

[outputs.stdout]
table = "fx"
"#
    )?;

    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.agent().interval()?, Duration::from_secs(30));
    assert_eq!(cfg.inputs().len(), 2);

    let first = &cfg.inputs()[0];
    assert_eq!(first.timeout()?, Duration::from_secs(2));
    assert_eq!(first.data_format, DataFormat::Influx);
    assert_eq!(first.metric_name, "fileexec");
    assert!(first.observe_from_start);
    assert_eq!(first.data_type, ValueType::Float);
    assert_eq!(first.effective_commands().len(), 2);

    let second = &cfg.inputs()[1];
    assert_eq!(second.data_format, DataFormat::Csv);
    assert_eq!(second.effective_commands(), vec!["cat {filepath}".to_string()]);
    assert!(!second.observe_from_start);
    assert_eq!(second.csv.header_row_count, 1);
    assert_eq!(second.csv.tag_columns, vec!["host".to_string()]);
    assert_eq!(second.csv.delimiter, ";");
    assert_eq!(second.timeout()?, Duration::from_secs(5));

    assert_eq!(cfg.outputs().stdout.as_ref().map(|s| s.table.as_str()), Some("fx"));
    Ok(())
}

#[test]
fn missing_inputs_is_a_config_error() {
    expect_config_error("[agent]\ninterval = \"1s\"\n", "[[inputs.fileexec]]");
}

#[test]
fn input_without_files_is_a_config_error() {
    expect_config_error(
        r#"
[[inputs.fileexec]]
commands = ["echo {filepath}"]
"#,
        "files",
    );
}

#[test]
fn input_without_commands_is_a_config_error() {
    expect_config_error(
        r#"
[[inputs.fileexec]]
files = ["/tmp/*.log"]
"#,
        "commands",
    );
}

#[test]
fn zero_timeout_is_a_config_error() {
    expect_config_error(
        r#"
[[inputs.fileexec]]
files = ["/tmp/*.log"]
commands = ["echo {filepath}"]
timeout = "0s"
"#,
        "timeout",
    );
}

#[test]
fn multi_character_csv_delimiter_is_a_config_error() {
    expect_config_error(
        r#"
[[inputs.fileexec]]
files = ["/data/*.csv"]
commands = ["cat {filepath}"]
data_format = "csv"
csv_delimiter = "::"
"#,
        "csv_delimiter",
    );
}

#[test]
fn multi_character_csv_comment_is_a_config_error() {
    expect_config_error(
        r#"
[[inputs.fileexec]]
files = ["/data/*.csv"]
commands = ["cat {filepath}"]
data_format = "csv"
csv_comment = "//"
"#,
        "csv_comment",
    );
}

#[test]
fn zero_interval_is_a_config_error() {
    expect_config_error(
        r#"
[agent]
interval = "0ms"

[[inputs.fileexec]]
files = ["/tmp/*.log"]
commands = ["echo {filepath}"]
"#,
        "interval",
    );
}

#[test]
fn bad_duration_is_a_config_error() {
    expect_config_error(
        r#"
[[inputs.fileexec]]
files = ["/tmp/*.log"]
commands = ["echo {filepath}"]
timeout = "5 fortnights"
"#,
        "timeout",
    );
}

#[test]
fn unknown_data_format_fails_to_deserialize() {
    let result = validate(
        r#"
[[inputs.fileexec]]
files = ["/tmp/*.log"]
commands = ["echo {filepath}"]
data_format = "xml"
"#,
    );
    assert!(matches!(result, Err(FileExecError::TomlError(_))));
}

#[test]
fn template_without_placeholder_is_allowed() -> TestResult {
    let cfg = validate(
        r#"
[[inputs.fileexec]]
files = ["/tmp/*.log"]
commands = ["uptime"]
"#,
    )?;
    assert_eq!(cfg.inputs()[0].effective_commands(), vec!["uptime".to_string()]);
    Ok(())
}

#[test]
fn builder_configs_pass_validation() -> TestResult {
    let cfg = FileExecConfigBuilder::new()
        .watch("/var/log/*.log")
        .command("wc -l {filepath}")
        .data_format(DataFormat::Value)
        .data_type(ValueType::Integer)
        .build_file();
    validate_config(&cfg)?;
    assert_eq!(cfg.inputs()[0].data_type, ValueType::Integer);
    Ok(())
}

#[test]
fn missing_config_file_is_an_io_error() {
    let result = load_and_validate("/nonexistent/fileexec.toml");
    assert!(matches!(result, Err(FileExecError::IoError(_))));
}
