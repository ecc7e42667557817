//! # Pipeline Wiring
//!
//! `topology` declares what the purchase stream does; `pipeline` owns the
//! workers that do it and their lifecycle.

pub mod pipeline;
pub mod topology;

pub use pipeline::{Pipeline, PipelineError, PipelineReport};
pub use topology::{PurchaseTopology, TopologyError};
