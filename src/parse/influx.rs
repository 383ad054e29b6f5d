// src/parse/influx.rs

//! InfluxDB line protocol:
//!
//! ```text
//! measurement[,tag=value...] field=value[,field=value...] [timestamp_ns]
//! ```

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::{FileExecError, Result};
use crate::metric::{parse_bool, FieldValue, Metric};

const FORMAT: &str = "influx";

#[derive(Debug, Clone, Default)]
pub struct InfluxParser;

impl InfluxParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse every line of `buf`. Blank lines and `#` comments are skipped.
    pub fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>> {
        let text = std::str::from_utf8(buf)
            .map_err(|e| FileExecError::parse(FORMAT, format!("output is not valid UTF-8: {e}")))?;
        let now = Utc::now();

        let mut metrics = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let metric = parse_line(line, now)
                .map_err(|msg| FileExecError::parse(FORMAT, format!("line {}: {msg}", idx + 1)))?;
            metrics.push(metric);
        }
        Ok(metrics)
    }
}

fn parse_line(line: &str, now: DateTime<Utc>) -> std::result::Result<Metric, String> {
    let sections = split_unescaped(line, ' ', true);
    let mut sections = sections.into_iter().filter(|s| !s.is_empty());

    let series = sections.next().ok_or("missing measurement")?;
    let field_set = sections.next().ok_or("missing fields")?;
    let timestamp = sections.next();
    if let Some(extra) = sections.next() {
        return Err(format!("unexpected trailing data {extra:?}"));
    }

    let mut series_parts = split_unescaped(series, ',', false).into_iter();
    let name = unescape(series_parts.next().unwrap_or_default());
    if name.is_empty() {
        return Err("empty measurement name".to_string());
    }

    let timestamp = match timestamp {
        Some(raw) => {
            let nanos: i64 = raw
                .parse()
                .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))?;
            Utc.timestamp_nanos(nanos)
        }
        None => now,
    };

    let mut metric = Metric::new(name, timestamp);

    for tag in series_parts {
        let (key, value) = split_pair(tag).ok_or_else(|| format!("invalid tag {tag:?}"))?;
        metric.tags.insert(unescape(key), unescape(value));
    }

    for field in split_unescaped(field_set, ',', true) {
        let (key, raw) = split_pair(field).ok_or_else(|| format!("invalid field {field:?}"))?;
        let value = parse_field_value(raw).ok_or_else(|| format!("invalid value for field {key:?}: {raw:?}"))?;
        metric.add_field(unescape(key), value);
    }

    if metric.fields.is_empty() {
        return Err("missing fields".to_string());
    }

    Ok(metric)
}

fn parse_field_value(raw: &str) -> Option<FieldValue> {
    if let Some(inner) = raw.strip_prefix('"') {
        let inner = inner.strip_suffix('"')?;
        return Some(FieldValue::String(unescape_string(inner)));
    }
    if let Some(int) = raw.strip_suffix('i') {
        return int.parse().ok().map(FieldValue::Integer);
    }
    if let Some(uint) = raw.strip_suffix('u') {
        return uint.parse().ok().map(FieldValue::Unsigned);
    }
    if let Some(b) = parse_bool(raw) {
        return Some(FieldValue::Boolean(b));
    }
    raw.parse().ok().map(FieldValue::Float)
}

/// Split `s` on `sep` unless it is backslash-escaped (or, with
/// `respect_quotes`, inside a double-quoted string).
fn split_unescaped(s: &str, sep: char, respect_quotes: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut in_quotes = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' if respect_quotes => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Split `key=value` on the first unescaped `=`.
fn split_pair(s: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' => {
                let (key, value) = (&s[..i], &s[i + 1..]);
                return (!key.is_empty() && !value.is_empty()).then_some((key, value));
            }
            _ => {}
        }
    }
    None
}

/// Drop the backslash in front of `,`, ` `, `=` and `\`.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, ',' | ' ' | '=' | '\\') {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn unescape_string(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\\\", "\\")
}
