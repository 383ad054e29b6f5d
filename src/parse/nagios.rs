// src/parse/nagios.rs

//! Nagios plugin output (health checks).
//!
//! ```text
//! DISK OK - free space: / 3326 MB (56%); | /=2643MB;5948;5958;0;5968
//! / 15272 MB (77%);
//! /boot 68 MB (69%); | /boot=68MB;88;93;0;98
//! /home=69357MB;253404;253409;0;253414
//! ```
//!
//! The first line is the service output, optionally followed by perfdata
//! after a `|`. Following lines are long output until one contains a `|`;
//! anything after that is more perfdata.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::debug;

use crate::errors::{FileExecError, Result};
use crate::metric::Metric;

const FORMAT: &str = "nagios";

/// Metric carrying the service output and the check state.
pub const STATE_METRIC: &str = "nagios_state";
/// Metric emitted once per perfdata label.
pub const PERFDATA_METRIC: &str = "nagios";

pub const STATE_OK: i64 = 0;
pub const STATE_UNKNOWN: i64 = 3;

static PERF_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"('[^']+'|[^\s=]+)=(\S+)").expect("perfdata item regex is valid")
});

static PERF_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\d.\-+eE]+)([\w/%]*)(?:;([^;]*))?(?:;([^;]*))?(?:;([^;]*))?(?:;([^;]*))?;?$")
        .expect("perfdata value regex is valid")
});

#[derive(Debug, Clone, Default)]
pub struct NagiosParser;

impl NagiosParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>> {
        let text = String::from_utf8_lossy(buf);
        let now = Utc::now();
        let mut metrics = Vec::new();
        let mut lines = text.lines();

        let first = lines.next().unwrap_or_default();
        let mut parts = first.split('|');
        let service_output = parts.next().unwrap_or_default().trim().to_string();
        if let Some(perf) = parts.next() {
            metrics.extend(parse_perfdata(perf, now));
        }
        if parts.next().is_some() {
            return Err(FileExecError::parse(
                FORMAT,
                "illegal output format: more than one '|' on the first line",
            ));
        }

        let mut long_output: Vec<&str> = Vec::new();
        for line in lines.by_ref() {
            if let Some((text, perf)) = line.split_once('|') {
                long_output.push(text.trim());
                metrics.extend(parse_perfdata(perf, now));
                break;
            }
            long_output.push(line.trim());
        }

        // Whatever is left is additional perfdata.
        for line in lines {
            metrics.extend(parse_perfdata(line, now));
        }

        let mut state = Metric::new(STATE_METRIC, now).with_field("service_output", service_output);
        if !long_output.is_empty() {
            state.add_field("long_service_output", long_output.join("\n"));
        }
        metrics.push(state);

        Ok(metrics)
    }
}

fn parse_perfdata(perf: &str, now: chrono::DateTime<Utc>) -> Vec<Metric> {
    let mut metrics = Vec::new();

    for item in PERF_ITEM.captures_iter(perf) {
        let label = item[1].trim_matches('\'');
        let raw = &item[2];

        let Some(caps) = PERF_VALUE.captures(raw) else {
            debug!(label, value = raw, "skipping unparseable perfdata");
            continue;
        };
        let Ok(value) = caps[1].parse::<f64>() else {
            debug!(label, value = raw, "skipping non-numeric perfdata");
            continue;
        };

        let mut metric = Metric::new(PERFDATA_METRIC, now)
            .with_tag("perfdata", label)
            .with_field("value", value);

        let unit = &caps[2];
        if !unit.is_empty() {
            metric.tags.insert("unit".to_string(), unit.to_string());
        }

        for (idx, name) in [(3, "warning"), (4, "critical"), (5, "min"), (6, "max")] {
            if let Some(v) = caps.get(idx).and_then(|m| m.as_str().parse::<f64>().ok()) {
                metric.add_field(name, v);
            }
        }

        metrics.push(metric);
    }

    metrics
}

/// Nagios state for a run result: the exit code for a normal non-zero exit,
/// UNKNOWN for anything that kept the check from completing.
pub fn exit_state(error: Option<&FileExecError>) -> i64 {
    match error {
        None => STATE_OK,
        Some(FileExecError::ProcessExit { code: Some(code), .. }) => i64::from(*code),
        Some(_) => STATE_UNKNOWN,
    }
}

/// Record the run result as the `state` field of the `nagios_state` metric,
/// creating that metric if the output did not produce one.
pub fn add_state(error: Option<&FileExecError>, metrics: &mut Vec<Metric>) {
    let state = exit_state(error);

    if let Some(m) = metrics.iter_mut().find(|m| m.name == STATE_METRIC) {
        m.add_field("state", state);
        return;
    }

    let timestamp = metrics.first().map(|m| m.timestamp).unwrap_or_else(Utc::now);
    metrics.push(Metric::new(STATE_METRIC, timestamp).with_field("state", state));
}
