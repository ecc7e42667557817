//! # Pipeline Container
//!
//! Immutable configuration shared by every worker.

pub mod config;

pub use config::{ConfigError, PipelineConfig, ProducerConfig, TickerConfig};
