//! Ports layer for the view/log consumers.

pub mod inbound;

pub use inbound::*;
