//! # Inbound Port - EventTimeApi
//!
//! Driving port used by an ingest worker: one call per source record, in
//! partition arrival order.

use shared_types::{EventTime, SourceRecord};

use crate::domain::{AssignerStats, Assignment};

/// Assigns event time to source records.
///
/// # Example
///
/// ```rust,ignore
/// use sj_01_event_time::ports::EventTimeApi;
///
/// fn ingest(assigner: &mut impl EventTimeApi<Purchase>, record: SourceRecord<Purchase>) {
///     let assignment = assigner.assign(record);
///     if assignment.fallback.is_some() {
///         // record kept flowing with a substituted timestamp
///     }
/// }
/// ```
pub trait EventTimeApi<P>: Send {
    /// Stamp a record with its event time and arrival sequence.
    ///
    /// Never fails: malformed declared timestamps are replaced by a fallback.
    fn assign(&mut self, record: SourceRecord<P>) -> Assignment<P>;

    /// Maximum event time assigned so far on `partition`.
    fn last_known(&self, partition: u32) -> Option<EventTime>;

    /// Counters since construction.
    fn stats(&self) -> AssignerStats;
}
