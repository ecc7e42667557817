//! Adapters connecting the consumers to the event bus.

pub mod bus;

pub use bus::{SharedLog, SharedView, ViewLogConsumer, ViewLogReport};
