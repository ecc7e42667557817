//! Ports layer for the windowed join.

pub mod inbound;

pub use inbound::*;
