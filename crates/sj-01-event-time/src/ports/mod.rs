//! Ports layer for the event-time stage.
//!
//! - Inbound (Driving) ports: API used by the ingest workers
//! - Outbound (Driven) ports: the ingestion clock

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
