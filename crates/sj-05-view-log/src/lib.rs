//! # SJ-05 View / Log
//!
//! Two ways to consume the same stream.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `MaterializedView`: `key -> latest event`, last arrival wins
//!   - `EventLog`: append-only, offsets in arrival order, replayable readers
//!   - `ForwardLog`: single-consumer channel, read once
//!
//! - **Ports Layer** (`ports/`)
//!   - `StreamConsumer`: common fold interface for view and log
//!
//! - **Adapters Layer** (`adapters/`)
//!   - `ViewLogConsumer`: two independent lossless bus subscriptions to the
//!     stock-ticker topic, one per model
//!
//! ## Example
//!
//! Ticks `AAPL 100` then `AAPL 101`:
//!
//! | Model | Contents |
//! |-------|----------|
//! | View | `{AAPL: 101}` |
//! | Log | `[AAPL 100, AAPL 101]` |
//!
//! The view and log are never reconciled with each other.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{SharedLog, SharedView, ViewLogConsumer, ViewLogReport};
pub use domain::{EventLog, ForwardLog, LogReader, MaterializedView, Offset};
pub use ports::StreamConsumer;
