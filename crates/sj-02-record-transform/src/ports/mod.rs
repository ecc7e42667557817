//! Ports layer for the record-transform stage.

pub mod inbound;

pub use inbound::*;
