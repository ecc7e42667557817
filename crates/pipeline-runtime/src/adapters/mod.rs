//! Adapters: sample sources and the pump feeding them into the pipeline.

pub mod producer;
pub mod sink;

pub use producer::{MockPurchaseSource, MockTickerSource, RecordSource};
pub use sink::{pump, RecordSink};
