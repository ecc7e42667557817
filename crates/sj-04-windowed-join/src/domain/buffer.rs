//! Window buffer for one side of a stream-stream join.
//!
//! ## Time-Indexed Lookups
//!
//! Entries are stored in a two-level structure:
//! - Outer: `HashMap<key, KeyIndex>` for O(1) key lookup
//! - Inner: `BTreeMap<EventTime, VecDeque<Event>>` for O(log n) range queries
//!
//! A second index, `BTreeMap<EventTime, HashSet<key>>`, lets expiry walk only
//! the timestamps that fall behind the horizon instead of scanning every key.

use shared_types::{Event, EventTime};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

use super::config::{OverflowPolicy, PerKeyBound};
use super::error::BufferError;

/// Entries for one key, ordered by timestamp then insertion.
#[derive(Debug)]
struct KeyIndex<P> {
    times: BTreeMap<EventTime, VecDeque<Event<P>>>,
    len: usize,
}

impl<P> Default for KeyIndex<P> {
    fn default() -> Self {
        Self {
            times: BTreeMap::new(),
            len: 0,
        }
    }
}

/// Statistics for monitoring one buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Entries stored (lifetime)
    pub inserted: u64,
    /// Entries removed by retention expiry (lifetime)
    pub expired: u64,
    /// Entries displaced by the per-key bound (lifetime)
    pub overflow_evicted: u64,
    /// Inserts refused by the per-key bound (lifetime)
    pub rejected: u64,
    /// Range queries recorded by the join
    pub lookups: u64,
    /// Entries returned by those range queries
    pub matches: u64,
    /// Largest number of entries held at once
    pub peak_len: usize,
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Inserted<P> {
    /// Stored without displacing anything.
    Stored,
    /// Stored after evicting the key's oldest entry.
    Displaced(Event<P>),
}

/// Time-bounded, keyed store of events for one join side.
///
/// Entries are purged once `max_timestamp_seen - t > retention`. Out-of-order
/// inserts are accepted; range queries stay correct regardless of arrival
/// order.
#[derive(Debug)]
pub struct WindowBuffer<P> {
    records: HashMap<String, KeyIndex<P>>,
    expiry_index: BTreeMap<EventTime, HashSet<String>>,
    max_timestamp_seen: Option<EventTime>,
    retention_ms: i64,
    bound: Option<PerKeyBound>,
    len: usize,
    stats: BufferStats,
}

impl<P> WindowBuffer<P> {
    pub fn new(retention_ms: i64) -> Self {
        Self::with_bound(retention_ms, None)
    }

    pub fn with_bound(retention_ms: i64, bound: Option<PerKeyBound>) -> Self {
        Self {
            records: HashMap::new(),
            expiry_index: BTreeMap::new(),
            max_timestamp_seen: None,
            retention_ms,
            bound,
            len: 0,
            stats: BufferStats::default(),
        }
    }

    /// Store an event under its key and timestamp.
    ///
    /// # Errors
    ///
    /// `BufferError::Overflow` when the key is full and the bound policy is
    /// `RejectNew`. The event is dropped and the buffer is unchanged.
    pub fn insert(&mut self, event: Event<P>) -> Result<Inserted<P>, BufferError> {
        let mut outcome = Inserted::Stored;

        if let Some(bound) = self.bound {
            let key_len = self.records.get(&event.key).map_or(0, |k| k.len);
            if key_len >= bound.max_entries {
                match bound.policy {
                    OverflowPolicy::RejectNew => {
                        self.stats.rejected += 1;
                        debug!(key = %event.key, bound = bound.max_entries, "Insert rejected");
                        return Err(BufferError::Overflow {
                            key: event.key,
                            bound: bound.max_entries,
                        });
                    }
                    OverflowPolicy::EvictOldest => {
                        if let Some(oldest) = self.pop_oldest(&event.key) {
                            self.stats.overflow_evicted += 1;
                            debug!(key = %event.key, evicted_time = oldest.event_time, "Oldest entry displaced");
                            outcome = Inserted::Displaced(oldest);
                        }
                    }
                }
            }
        }

        let t = event.event_time;
        self.expiry_index
            .entry(t)
            .or_default()
            .insert(event.key.clone());

        let index = self.records.entry(event.key.clone()).or_default();
        index.times.entry(t).or_default().push_back(event);
        index.len += 1;

        self.len += 1;
        self.stats.inserted += 1;
        self.stats.peak_len = self.stats.peak_len.max(self.len);
        self.max_timestamp_seen = Some(self.max_timestamp_seen.map_or(t, |m| m.max(t)));

        Ok(outcome)
    }

    /// Entries for `key` with `low <= t <= high`, ascending by timestamp,
    /// ties in insertion order.
    ///
    /// Lazy and side-effect free; call again to restart. An inverted range
    /// yields nothing.
    pub fn range_query<'a>(
        &'a self,
        key: &str,
        low: EventTime,
        high: EventTime,
    ) -> impl Iterator<Item = &'a Event<P>> + 'a {
        self.records
            .get(key)
            .filter(|_| low <= high)
            .into_iter()
            .flat_map(move |index| index.times.range(low..=high))
            .flat_map(|(_, entries)| entries.iter())
    }

    /// Record a probe made through `range_query`.
    pub fn record_lookup(&mut self, matches: usize) {
        self.stats.lookups += 1;
        self.stats.matches += matches as u64;
    }

    /// Remove every entry with `t < horizon`, across all keys.
    ///
    /// Returns the number of entries removed.
    pub fn evict_older_than(&mut self, horizon: EventTime) -> usize {
        let mut removed = 0;

        while let Some(entry) = self.expiry_index.first_entry() {
            if *entry.key() >= horizon {
                break;
            }
            let (t, keys) = entry.remove_entry();
            for key in keys {
                let Some(index) = self.records.get_mut(&key) else {
                    continue;
                };
                if let Some(entries) = index.times.remove(&t) {
                    index.len -= entries.len();
                    removed += entries.len();
                }
                if index.len == 0 {
                    self.records.remove(&key);
                }
            }
        }

        self.len -= removed;
        self.stats.expired += removed as u64;
        removed
    }

    /// Evict with `horizon = max_timestamp_seen - retention`.
    pub fn expire(&mut self) -> usize {
        match self.horizon() {
            Some(horizon) => self.evict_older_than(horizon),
            None => 0,
        }
    }

    /// Oldest timestamp an entry may have and survive expiry.
    pub fn horizon(&self) -> Option<EventTime> {
        self.max_timestamp_seen
            .map(|max| max.saturating_sub(self.retention_ms))
    }

    pub fn max_timestamp_seen(&self) -> Option<EventTime> {
        self.max_timestamp_seen
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }

    /// Entries currently held.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distinct keys currently held.
    pub fn key_count(&self) -> usize {
        self.records.len()
    }

    /// Entries currently held for `key`.
    pub fn len_for_key(&self, key: &str) -> usize {
        self.records.get(key).map_or(0, |k| k.len)
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    /// Drop every entry. Statistics and the timestamp high-water mark are kept.
    pub fn clear(&mut self) -> usize {
        let dropped = self.len;
        self.records.clear();
        self.expiry_index.clear();
        self.len = 0;
        dropped
    }

    fn pop_oldest(&mut self, key: &str) -> Option<Event<P>> {
        let index = self.records.get_mut(key)?;
        let mut slot = index.times.first_entry()?;
        let t = *slot.key();
        let oldest = slot.get_mut().pop_front()?;
        let slot_empty = slot.get().is_empty();
        if slot_empty {
            slot.remove();
            if let Some(keys) = self.expiry_index.get_mut(&t) {
                keys.remove(key);
                if keys.is_empty() {
                    self.expiry_index.remove(&t);
                }
            }
        }

        index.len -= 1;
        if index.len == 0 {
            self.records.remove(key);
        }
        self.len -= 1;
        Some(oldest)
    }
}
