//! Per-partition event-time assignment with fallback.

use shared_types::{Event, EventTime, SourceRecord, StageId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::policy::TimestampExtractor;
use crate::ports::{EventTimeApi, TimeSource};

/// Which substitute was used for a malformed timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The partition's last-known timestamp.
    PreviousTimestamp,
    /// The ingestion clock (no previous timestamp on the partition).
    IngestionClock,
}

impl Fallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreviousTimestamp => "previous",
            Self::IngestionClock => "ingestion_clock",
        }
    }
}

/// A stamped event plus the fallback used to stamp it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment<P> {
    pub event: Event<P>,
    pub partition: u32,
    pub fallback: Option<Fallback>,
}

/// Counters for one assigner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignerStats {
    pub assigned: u64,
    pub fallback_previous: u64,
    pub fallback_clock: u64,
}

impl AssignerStats {
    pub fn fallbacks(&self) -> u64 {
        self.fallback_previous + self.fallback_clock
    }
}

/// Global arrival-order counter shared by every ingest worker.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    next: AtomicU64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of sequence values handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Stamps records with event time, tracking the maximum per partition.
///
/// A malformed declared timestamp never aborts the stream. The record gets
/// the partition's last-known timestamp, or the ingestion clock if the
/// partition has none yet. Records without a transport key get an empty key
/// until a rekey transform assigns one.
pub struct EventTimeAssigner<E, T> {
    extractor: E,
    clock: T,
    sequence: Arc<SequenceGenerator>,
    last_known: HashMap<u32, EventTime>,
    stats: AssignerStats,
}

impl<E, T: TimeSource> EventTimeAssigner<E, T> {
    pub fn new(extractor: E, clock: T, sequence: Arc<SequenceGenerator>) -> Self {
        Self {
            extractor,
            clock,
            sequence,
            last_known: HashMap::new(),
            stats: AssignerStats::default(),
        }
    }

    /// Maximum event time assigned so far on `partition`.
    pub fn last_known(&self, partition: u32) -> Option<EventTime> {
        self.last_known.get(&partition).copied()
    }

    pub fn stats(&self) -> AssignerStats {
        self.stats
    }

    fn remember(&mut self, partition: u32, time: EventTime) {
        self.last_known
            .entry(partition)
            .and_modify(|t| *t = (*t).max(time))
            .or_insert(time);
    }
}

impl<P, E, T> EventTimeApi<P> for EventTimeAssigner<E, T>
where
    E: TimestampExtractor<P>,
    T: TimeSource,
{
    fn assign(&mut self, record: SourceRecord<P>) -> Assignment<P> {
        let previous = self.last_known.get(&record.partition).copied();

        let (event_time, fallback) = match self.extractor.extract(&record, previous) {
            Ok(t) => (t, None),
            Err(err) => {
                let (t, fallback) = match previous {
                    Some(t) => (t, Fallback::PreviousTimestamp),
                    None => (self.clock.now(), Fallback::IngestionClock),
                };
                match fallback {
                    Fallback::PreviousTimestamp => self.stats.fallback_previous += 1,
                    Fallback::IngestionClock => self.stats.fallback_clock += 1,
                }
                debug!(
                    stage = %StageId::EventTime,
                    partition = record.partition,
                    offset = record.offset,
                    fallback = fallback.as_str(),
                    substituted = t,
                    error = %err,
                    "Malformed timestamp replaced"
                );
                (t, Some(fallback))
            }
        };

        self.remember(record.partition, event_time);
        self.stats.assigned += 1;

        let SourceRecord {
            partition,
            key,
            payload,
            ..
        } = record;

        Assignment {
            event: Event::new(
                key.unwrap_or_default(),
                payload,
                event_time,
                self.sequence.next(),
            ),
            partition,
            fallback,
        }
    }

    fn last_known(&self, partition: u32) -> Option<EventTime> {
        EventTimeAssigner::last_known(self, partition)
    }

    fn stats(&self) -> AssignerStats {
        EventTimeAssigner::stats(self)
    }
}
