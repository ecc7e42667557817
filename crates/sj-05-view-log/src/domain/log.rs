//! Append-only event sequences.
//!
//! `EventLog` keeps everything and can be read any number of times from any
//! offset. `ForwardLog` wraps a single-consumer channel: each event is seen
//! once and there is no going back.

use shared_types::Event;
use tokio::sync::mpsc;

/// Position of an event in an `EventLog`, assigned in arrival order.
pub type Offset = u64;

/// Replayable, uncollapsed event sequence.
#[derive(Debug, Clone)]
pub struct EventLog<V> {
    entries: Vec<Event<V>>,
}

impl<V> EventLog<V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append and return the new event's offset.
    pub fn append(&mut self, event: Event<V>) -> Offset {
        self.entries.push(event);
        (self.entries.len() - 1) as Offset
    }

    pub fn get(&self, offset: Offset) -> Option<&Event<V>> {
        usize::try_from(offset).ok().and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset the next append will receive.
    pub fn next_offset(&self) -> Offset {
        self.entries.len() as Offset
    }

    /// Read from the beginning.
    pub fn reader(&self) -> LogReader<'_, V> {
        self.reader_from(0)
    }

    /// Read from `offset`. Past the end yields nothing.
    pub fn reader_from(&self, offset: Offset) -> LogReader<'_, V> {
        LogReader {
            entries: &self.entries,
            position: usize::try_from(offset).unwrap_or(usize::MAX),
        }
    }
}

impl<V> Default for EventLog<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Independent cursor over an `EventLog`.
#[derive(Debug, Clone)]
pub struct LogReader<'a, V> {
    entries: &'a [Event<V>],
    position: usize,
}

impl<V> LogReader<'_, V> {
    /// Offset of the next event this reader will yield.
    pub fn position(&self) -> Offset {
        self.position as Offset
    }
}

impl<'a, V> Iterator for LogReader<'a, V> {
    type Item = (Offset, &'a Event<V>);

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.entries.get(self.position)?;
        let offset = self.position as Offset;
        self.position += 1;
        Some((offset, event))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

/// Non-replayable event sequence backed by an mpsc channel.
#[derive(Debug)]
pub struct ForwardLog<V> {
    receiver: mpsc::Receiver<Event<V>>,
    consumed: u64,
}

impl<V> ForwardLog<V> {
    /// Create a bounded channel and the log reading from it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Event<V>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }

    pub fn new(receiver: mpsc::Receiver<Event<V>>) -> Self {
        Self {
            receiver,
            consumed: 0,
        }
    }

    /// Next event, or `None` once every sender is gone and the channel is empty.
    pub async fn next(&mut self) -> Option<Event<V>> {
        let event = self.receiver.recv().await?;
        self.consumed += 1;
        Some(event)
    }

    /// Next event if one is already queued.
    pub fn try_next(&mut self) -> Option<Event<V>> {
        let event = self.receiver.try_recv().ok()?;
        self.consumed += 1;
        Some(event)
    }

    /// Events taken so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}
