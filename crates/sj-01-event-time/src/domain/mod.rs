//! Domain layer: timestamp policies and per-partition assignment.

pub mod assigner;
pub mod policy;

pub use assigner::{AssignerStats, Assignment, EventTimeAssigner, Fallback, SequenceGenerator};
pub use policy::{
    DeclaredFieldExtractor, IngestionClockExtractor, PolicyExtractor, PolicyParseError,
    TimestampExtractor, TimestampPolicy,
};
