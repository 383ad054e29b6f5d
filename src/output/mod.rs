// src/output/mod.rs

//! Metric sinks.
//!
//! The collector loop hands every gathered batch to one [`Output`]. Only the
//! line-protocol writer ships with the crate; anything that can take a batch
//! of metrics can implement the trait.

pub mod line_protocol;

use crate::errors::Result;
use crate::metric::Metric;

pub use line_protocol::LineProtocolOutput;

pub trait Output: Send {
    /// Table (measurement prefix) metrics are written under.
    fn table(&self) -> &str;

    fn connect(&mut self) -> Result<()>;

    /// Write one batch. An empty batch is a no-op.
    fn write(&mut self, metrics: &[Metric]) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
