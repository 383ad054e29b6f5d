use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Wire format of the metrics a triggered command prints on stdout.
///
/// - `Influx`: InfluxDB line protocol, parsed as one buffer (default).
/// - `Csv`: line-oriented; the first output of a command is parsed as a full
///   document (header rows included), later outputs line by line.
/// - `Nagios`: health-check plugin output. A failing exit status is recorded
///   as data (`nagios_state.state`) instead of being reported as an error.
/// - `Value`: a single bare value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Influx,
    Csv,
    Nagios,
    Value,
}

impl Default for DataFormat {
    fn default() -> Self {
        DataFormat::Influx
    }
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Influx => "influx",
            DataFormat::Csv => "csv",
            DataFormat::Nagios => "nagios",
            DataFormat::Value => "value",
        }
    }

    /// Whether a failing process is still parsed and its exit status turned
    /// into a metric field.
    pub fn is_health_check(&self) -> bool {
        matches!(self, DataFormat::Nagios)
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "influx" => Ok(DataFormat::Influx),
            "csv" => Ok(DataFormat::Csv),
            "nagios" => Ok(DataFormat::Nagios),
            "value" => Ok(DataFormat::Value),
            other => Err(format!(
                "invalid data_format: {other} (expected \"influx\", \"csv\", \"nagios\" or \"value\")"
            )),
        }
    }
}

/// Field type for the `value` data format (`data_type` in the config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    Float,
    Boolean,
    String,
}

impl Default for ValueType {
    fn default() -> Self {
        ValueType::Float
    }
}

/// Parse a duration string such as `"500ms"`, `"5s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
