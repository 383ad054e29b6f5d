// src/parse/mod.rs

//! Decoding command output into metrics.
//!
//! [`Decoder`] is the closed set of supported data formats, picked once from
//! the input configuration. [`OutputParser`] wraps a decoder and, for CSV,
//! keeps one parser state per command line so that the first output of a
//! command can be told apart from later ones.

pub mod csv;
pub mod influx;
pub mod nagios;
pub mod value;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::errors::Result;
use crate::metric::Metric;
use crate::types::{DataFormat, ValueType};

pub use self::csv::{CsvParser, CsvSettings};
pub use self::influx::InfluxParser;
pub use self::nagios::NagiosParser;
pub use self::value::ValueParser;

/// Default metric name for formats whose output carries none.
pub const DEFAULT_METRIC_NAME: &str = "fileexec";

#[derive(Debug, Clone)]
pub enum Decoder {
    Influx(InfluxParser),
    Csv(CsvParser),
    Nagios(NagiosParser),
    Value(ValueParser),
}

impl Decoder {
    pub fn new(
        format: DataFormat,
        metric_name: &str,
        data_type: ValueType,
        csv: CsvSettings,
    ) -> Self {
        match format {
            DataFormat::Influx => Decoder::Influx(InfluxParser::new()),
            DataFormat::Csv => Decoder::Csv(CsvParser::new(csv, metric_name)),
            DataFormat::Nagios => Decoder::Nagios(NagiosParser::new()),
            DataFormat::Value => Decoder::Value(ValueParser::new(metric_name, data_type)),
        }
    }

    pub fn format(&self) -> DataFormat {
        match self {
            Decoder::Influx(_) => DataFormat::Influx,
            Decoder::Csv(_) => DataFormat::Csv,
            Decoder::Nagios(_) => DataFormat::Nagios,
            Decoder::Value(_) => DataFormat::Value,
        }
    }
}

/// Thread-safe parser shared by every concurrent command of an input.
#[derive(Debug)]
pub struct OutputParser {
    prototype: Decoder,
    sources: Mutex<HashMap<String, CsvParser>>,
}

impl OutputParser {
    pub fn new(decoder: Decoder) -> Self {
        Self {
            prototype: decoder,
            sources: Mutex::new(HashMap::new()),
        }
    }

    pub fn format(&self) -> DataFormat {
        self.prototype.format()
    }

    pub fn is_health_check(&self) -> bool {
        self.format().is_health_check()
    }

    /// Decode the output of `source` (an expanded command line).
    ///
    /// Only CSV keeps per-source state: the first call for a source gets a
    /// fresh copy of the configured decoder and later calls reuse it along
    /// with the columns it learned. The other formats decode every output
    /// the same way.
    pub fn parse(&self, source: &str, output: &[u8]) -> Result<Vec<Metric>> {
        let prototype = match &self.prototype {
            Decoder::Influx(p) => return p.parse(output),
            Decoder::Nagios(p) => return p.parse(output),
            Decoder::Value(p) => return p.parse(output),
            Decoder::Csv(p) => p,
        };

        let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
        let first_observation = !sources.contains_key(source);
        let parser = sources
            .entry(source.to_string())
            .or_insert_with(|| prototype.clone());
        let result = parser.parse(output, first_observation);

        // A failed first output has not taught the parser anything (e.g. no
        // header was consumed), so the next output is treated as first again.
        if first_observation && result.is_err() {
            sources.remove(source);
        }
        result
    }

    /// Number of command lines with remembered decoder state.
    pub fn tracked_sources(&self) -> usize {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
