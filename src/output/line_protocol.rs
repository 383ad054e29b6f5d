// src/output/line_protocol.rs

use std::io::{self, Write};

use tracing::debug;

use crate::errors::Result;
use crate::metric::{FieldValue, Metric};

use super::Output;

/// Writes metrics as InfluxDB line protocol, one metric per line.
///
/// With a non-empty table the measurement is rendered as `<table>.<name>`.
#[derive(Debug)]
pub struct LineProtocolOutput<W: Write + Send> {
    table: String,
    writer: W,
    written: u64,
}

impl LineProtocolOutput<io::Stdout> {
    pub fn stdout(table: impl Into<String>) -> Self {
        Self::new(table, io::stdout())
    }
}

impl<W: Write + Send> LineProtocolOutput<W> {
    pub fn new(table: impl Into<String>, writer: W) -> Self {
        Self {
            table: table.into(),
            writer,
            written: 0,
        }
    }

    /// Number of metrics written since creation.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Render one metric without a trailing newline.
    pub fn render(&self, metric: &Metric) -> String {
        let mut line = String::new();
        if !self.table.is_empty() {
            line.push_str(&escape_measurement(&self.table));
            line.push('.');
        }
        line.push_str(&escape_measurement(&metric.name));

        for (key, value) in &metric.tags {
            if value.is_empty() {
                continue;
            }
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        let fields: Vec<String> = metric
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape_key(key), render_field(value)))
            .collect();
        line.push(' ');
        line.push_str(&fields.join(","));

        if let Some(nanos) = metric.timestamp.timestamp_nanos_opt() {
            line.push(' ');
            line.push_str(&nanos.to_string());
        }
        line
    }
}

impl<W: Write + Send> Output for LineProtocolOutput<W> {
    fn table(&self) -> &str {
        &self.table
    }

    fn connect(&mut self) -> Result<()> {
        debug!(table = %self.table, "line protocol output connected");
        Ok(())
    }

    fn write(&mut self, metrics: &[Metric]) -> Result<()> {
        for metric in metrics {
            // A metric without fields is not representable.
            if metric.fields.is_empty() {
                debug!(name = %metric.name, "skipping metric without fields");
                continue;
            }
            let line = self.render(metric);
            writeln!(self.writer, "{line}")?;
            self.written += 1;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        debug!(written = self.written, "line protocol output closed");
        Ok(())
    }
}

fn render_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Float(v) => v.to_string(),
        FieldValue::Integer(v) => format!("{v}i"),
        FieldValue::Unsigned(v) => format!("{v}u"),
        FieldValue::Boolean(v) => v.to_string(),
        FieldValue::String(v) => format!("\"{}\"", escape_string(v)),
    }
}

fn escape_measurement(s: &str) -> String {
    escape_chars(s, &[',', ' '])
}

/// Tag keys, tag values and field keys.
fn escape_key(s: &str) -> String {
    escape_chars(s, &[',', ' ', '='])
}

fn escape_string(s: &str) -> String {
    escape_chars(s, &['"', '\\'])
}

fn escape_chars(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
