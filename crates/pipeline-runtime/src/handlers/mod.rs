//! Worker tasks: ingest, join and ticker handlers.

pub mod ingest;
pub mod join;
pub mod views;

pub use ingest::{policy_assigner, IngestReport, IngestWorker, PolicyIngestWorker};
pub use join::{shard_for, JoinMessage, JoinWorker, JoinWorkerReport};
pub use views::{record_view_report, refresh_view_metrics, TickerReport, TickerWorker};
