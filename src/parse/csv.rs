// src/parse/csv.rs

//! Line-oriented CSV decoding.
//!
//! The first output of a command is parsed as a whole document: leading rows
//! are skipped, header rows are consumed and the resulting column names are
//! remembered. Later outputs of the same command are decoded line by line
//! against those remembered columns, without looking for a header again.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use ::csv::{ReaderBuilder, StringRecord};
use serde::Deserialize;

use crate::errors::{FileExecError, Result};
use crate::metric::{FieldValue, Metric};

const FORMAT: &str = "csv";

/// `csv_*` options of an input.
#[derive(Debug, Clone, Deserialize)]
pub struct CsvSettings {
    /// Number of rows at the top of the first output that hold column names.
    /// Multiple header rows are concatenated column-wise.
    #[serde(default, rename = "csv_header_row_count")]
    pub header_row_count: usize,

    /// Explicit column names; override any header rows.
    #[serde(default, rename = "csv_column_names")]
    pub column_names: Vec<String>,

    /// Columns emitted as tags instead of fields.
    #[serde(default, rename = "csv_tag_columns")]
    pub tag_columns: Vec<String>,

    #[serde(default = "default_delimiter", rename = "csv_delimiter")]
    pub delimiter: String,

    /// Lines starting with this prefix are ignored.
    #[serde(default, rename = "csv_comment")]
    pub comment: Option<String>,

    /// Rows skipped before the header in the first output.
    #[serde(default, rename = "csv_skip_rows")]
    pub skip_rows: usize,

    /// Column whose value becomes the metric name.
    #[serde(default, rename = "csv_measurement_column")]
    pub measurement_column: Option<String>,

    #[serde(default, rename = "csv_timestamp_column")]
    pub timestamp_column: Option<String>,

    /// `unix`, `unix_ms`, `unix_us`, `unix_ns`, or a chrono format string.
    #[serde(default, rename = "csv_timestamp_format")]
    pub timestamp_format: Option<String>,
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            header_row_count: 0,
            column_names: Vec::new(),
            tag_columns: Vec::new(),
            delimiter: default_delimiter(),
            comment: None,
            skip_rows: 0,
            measurement_column: None,
            timestamp_column: None,
            timestamp_format: None,
        }
    }
}

impl CsvSettings {
    /// Check the options that can be rejected before any output is seen.
    pub fn validate(&self) -> Result<()> {
        single_byte(&self.delimiter, "csv_delimiter")?;
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.is_empty()) {
            single_byte(comment, "csv_comment")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CsvParser {
    settings: CsvSettings,
    metric_name: String,
    /// Column names in effect: configured, or learned from the header.
    columns: Vec<String>,
}

impl CsvParser {
    pub fn new(settings: CsvSettings, metric_name: impl Into<String>) -> Self {
        let columns = settings.column_names.clone();
        Self {
            settings,
            metric_name: metric_name.into(),
            columns,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Decode `buf`; `first_observation` selects whole-document mode.
    pub fn parse(&mut self, buf: &[u8], first_observation: bool) -> Result<Vec<Metric>> {
        if first_observation {
            self.parse_document(buf)
        } else {
            self.parse_lines(buf)
        }
    }

    fn parse_document(&mut self, buf: &[u8]) -> Result<Vec<Metric>> {
        let records = self.read_records(buf)?;
        let mut records = records.into_iter().skip(self.settings.skip_rows);

        if self.settings.header_row_count > 0 {
            let mut header: Vec<String> = Vec::new();
            for _ in 0..self.settings.header_row_count {
                let Some(row) = records.next() else {
                    break;
                };
                for (i, cell) in row.iter().enumerate() {
                    match header.get_mut(i) {
                        Some(name) => name.push_str(cell.trim()),
                        None => header.push(cell.trim().to_string()),
                    }
                }
            }
            if self.settings.column_names.is_empty() {
                self.columns = header;
            }
        }

        let now = Utc::now();
        records.map(|row| self.record_to_metric(&row, now)).collect()
    }

    fn parse_lines(&self, buf: &[u8]) -> Result<Vec<Metric>> {
        let now = Utc::now();
        self.read_records(buf)?
            .iter()
            .map(|row| self.record_to_metric(row, now))
            .collect()
    }

    fn read_records(&self, buf: &[u8]) -> Result<Vec<StringRecord>> {
        let delimiter = single_byte(&self.settings.delimiter, "csv_delimiter")?;
        let comment = match &self.settings.comment {
            Some(c) if !c.is_empty() => Some(single_byte(c, "csv_comment")?),
            _ => None,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .comment(comment)
            .from_reader(buf);

        reader
            .records()
            .map(|r| r.map_err(|e| FileExecError::parse(FORMAT, e.to_string())))
            .filter(|r| !matches!(r, Ok(rec) if is_blank(rec)))
            .collect()
    }

    fn record_to_metric(&self, row: &StringRecord, now: DateTime<Utc>) -> Result<Metric> {
        if !self.columns.is_empty() && row.len() > self.columns.len() {
            return Err(FileExecError::parse(
                FORMAT,
                format!(
                    "row has {} values but only {} columns are known",
                    row.len(),
                    self.columns.len()
                ),
            ));
        }

        let mut metric = Metric::new(self.metric_name.clone(), now);

        for (i, raw) in row.iter().enumerate() {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            let column = match self.columns.get(i) {
                Some(name) => name.clone(),
                None => format!("column_{}", i + 1),
            };

            if self.settings.measurement_column.as_deref() == Some(column.as_str()) {
                metric.name = value.to_string();
            } else if self.settings.timestamp_column.as_deref() == Some(column.as_str()) {
                metric.timestamp = parse_timestamp(value, self.settings.timestamp_format.as_deref())?;
            } else if self.settings.tag_columns.contains(&column) {
                metric.tags.insert(column, value.to_string());
            } else {
                metric.fields.insert(column, FieldValue::infer(value));
            }
        }

        Ok(metric)
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|cell| cell.trim().is_empty())
}

fn single_byte(s: &str, option: &str) -> Result<u8> {
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => Err(FileExecError::ConfigError(format!(
            "{option} must be a single ASCII character (got {s:?})"
        ))),
    }
}

fn parse_timestamp(value: &str, format: Option<&str>) -> Result<DateTime<Utc>> {
    let invalid = || FileExecError::parse(FORMAT, format!("invalid timestamp {value:?}"));

    let parse_int = || value.parse::<i64>().map_err(|_| invalid());
    match format.unwrap_or("unix") {
        "unix" => {
            let secs: f64 = value.parse().map_err(|_| invalid())?;
            let nanos = (secs * 1e9) as i64;
            Ok(Utc.timestamp_nanos(nanos))
        }
        "unix_ms" => Utc.timestamp_millis_opt(parse_int()?).single().ok_or_else(invalid),
        "unix_us" => {
            let micros = parse_int()?;
            Ok(Utc.timestamp_nanos(micros.saturating_mul(1_000)))
        }
        "unix_ns" => Ok(Utc.timestamp_nanos(parse_int()?)),
        layout => {
            if let Ok(ts) = DateTime::parse_from_str(value, layout) {
                return Ok(ts.with_timezone(&Utc));
            }
            NaiveDateTime::parse_from_str(value, layout)
                .map(|naive| naive.and_utc())
                .map_err(|_| invalid())
        }
    }
}
