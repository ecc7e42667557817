//! # Inbound Port - StreamConsumer
//!
//! Both consumption models accept the same events; they differ only in what
//! they keep.

use shared_types::Event;

use crate::domain::{EventLog, MaterializedView};

pub trait StreamConsumer<V>: Send {
    /// Short label for logs.
    fn kind(&self) -> &'static str;

    /// Fold one event in.
    fn consume(&mut self, event: Event<V>);

    /// Entries held: distinct keys for a view, events for a log.
    fn size(&self) -> usize;
}

impl<V: Send> StreamConsumer<V> for MaterializedView<V> {
    fn kind(&self) -> &'static str {
        "view"
    }

    fn consume(&mut self, event: Event<V>) {
        self.apply(event);
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl<V: Send> StreamConsumer<V> for EventLog<V> {
    fn kind(&self) -> &'static str {
        "log"
    }

    fn consume(&mut self, event: Event<V>) {
        self.append(event);
    }

    fn size(&self) -> usize {
        self.len()
    }
}
