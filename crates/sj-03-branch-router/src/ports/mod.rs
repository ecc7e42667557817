//! Ports layer for the branch router.

pub mod inbound;

pub use inbound::*;
