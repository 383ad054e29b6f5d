// src/parse/value.rs

use chrono::Utc;

use crate::errors::{FileExecError, Result};
use crate::metric::{parse_bool, FieldValue, Metric};
use crate::types::ValueType;

const FORMAT: &str = "value";

/// Single-value output, e.g. a bare `42` from `wc -l`.
///
/// When the output holds several whitespace-separated tokens the last one is
/// used, so trailing labels do not matter but leading ones do.
#[derive(Debug, Clone)]
pub struct ValueParser {
    metric_name: String,
    data_type: ValueType,
}

impl ValueParser {
    pub fn new(metric_name: impl Into<String>, data_type: ValueType) -> Self {
        Self {
            metric_name: metric_name.into(),
            data_type,
        }
    }

    pub fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>> {
        let text = String::from_utf8_lossy(buf);
        let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let value = match self.data_type {
            ValueType::String => FieldValue::String(text.to_string()),
            _ => {
                let raw = text.split_whitespace().last().unwrap_or(text);
                self.typed(raw)?
            }
        };

        Ok(vec![Metric::new(self.metric_name.clone(), Utc::now()).with_field("value", value)])
    }

    fn typed(&self, raw: &str) -> Result<FieldValue> {
        let invalid = || {
            FileExecError::parse(FORMAT, format!("{raw:?} is not a valid {:?}", self.data_type))
        };
        match self.data_type {
            ValueType::Integer => raw.parse().map(FieldValue::Integer).map_err(|_| invalid()),
            ValueType::Float => raw.parse().map(FieldValue::Float).map_err(|_| invalid()),
            ValueType::Boolean => match raw {
                "1" => Ok(FieldValue::Boolean(true)),
                "0" => Ok(FieldValue::Boolean(false)),
                other => parse_bool(other).map(FieldValue::Boolean).ok_or_else(invalid),
            },
            ValueType::String => Ok(FieldValue::String(raw.to_string())),
        }
    }
}
