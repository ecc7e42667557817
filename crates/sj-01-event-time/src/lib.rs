//! # SJ-01 Event Time
//!
//! Assigns a logical event time to every source record before any windowed
//! stage sees it.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Pure logic
//!   - `TimestampExtractor`: `extract(record, previous) -> Result<EventTime, TimestampError>`
//!   - `DeclaredFieldExtractor`: reads the payload's own timestamp field
//!   - `IngestionClockExtractor`: reads the wall clock, always succeeds
//!   - `PolicyExtractor`: picks one of the above from a `TimestampPolicy`
//!   - `EventTimeAssigner`: per-partition fallback and sequence stamping
//!
//! - **Ports Layer** (`ports/`)
//!   - `EventTimeApi`: Driving port used by ingest workers
//!   - `TimeSource`: Driven port for the ingestion clock
//!
//! ## Fallback Rules
//!
//! | Declared timestamp | Partition has previous? | Assigned time |
//! |--------------------|-------------------------|---------------|
//! | valid              | any                     | declared value |
//! | malformed          | yes                     | partition maximum so far |
//! | malformed          | no                      | ingestion clock |
//!
//! The partition maximum never decreases. Valid out-of-order timestamps are
//! kept as declared; downstream windows tolerate them.
//!
//! ## Usage Example
//!
//! ```ignore
//! use sj_01_event_time::{EventTimeAssigner, PolicyExtractor, SequenceGenerator,
//!     SystemTimeSource, TimestampPolicy, EventTimeApi};
//!
//! let clock = SystemTimeSource;
//! let mut assigner = EventTimeAssigner::new(
//!     PolicyExtractor::new(TimestampPolicy::DeclaredField, clock),
//!     clock,
//!     Arc::new(SequenceGenerator::new()),
//! );
//! let assignment = assigner.assign(record);
//! ```

pub mod domain;
pub mod ports;

pub use domain::{
    AssignerStats, Assignment, DeclaredFieldExtractor, EventTimeAssigner, Fallback,
    IngestionClockExtractor, PolicyExtractor, PolicyParseError, SequenceGenerator,
    TimestampExtractor, TimestampPolicy,
};
pub use ports::{EventTimeApi, ManualTimeSource, SystemTimeSource, TimeSource};
