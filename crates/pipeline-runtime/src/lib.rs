//! # StreamJoin Pipeline Runtime
//!
//! Wires the five stages into one running pipeline. The `pipeline-runtime`
//! binary in `main.rs` drives it with sample sources; this library exposes
//! the pieces for tests.
//!
//! ## Modules
//!
//! - `container/` - immutable configuration loaded from `SJ_*` variables
//! - `wiring/` - the purchase topology and the `Pipeline` lifecycle
//! - `handlers/` - ingest, join and ticker worker tasks
//! - `adapters/` - sample record sources and the pump feeding them in
//!
//! ## Data Flow
//!
//! ```text
//!                   ┌──────────────── per input partition ────────────────┐
//! purchases ──────► │ sj-01 event time ─► sj-02 mask/rekey ─► sj-03 route │
//!                   └──────────────────────────────┬──────────────────────┘
//!                                                  │ coffee / electronics
//!                                                  ▼ hashed by customer
//!                                  ┌──── per key shard ────┐
//!                                  │ sj-04 windowed join   │ ──► bus: JoinedOutput
//!                                  └───────────────────────┘
//!
//! tickers ────────► ingestion clock, key = symbol ──► bus: StockTicker
//!                                                          ├─► sj-05 view
//!                                                          └─► sj-05 log
//! ```
//!
//! ## Concurrency
//!
//! Each ingest worker owns its partition's last-known timestamp. Each join
//! worker owns both window buffers for its shard of keys, so all records of
//! a key are joined by one task in arrival order and no buffer is shared.
//! The bus and the view/log snapshots are the only shared state.

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod wiring;

pub use adapters::{pump, MockPurchaseSource, MockTickerSource, RecordSink, RecordSource};
pub use container::{ConfigError, PipelineConfig, ProducerConfig, TickerConfig};
pub use wiring::{Pipeline, PipelineError, PipelineReport, PurchaseTopology, TopologyError};
