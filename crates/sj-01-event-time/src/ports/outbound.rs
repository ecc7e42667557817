//! Outbound (Driven) ports for the event-time stage.

use shared_types::EventTime;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Time source for the ingestion clock.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now(&self) -> EventTime;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> EventTime {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as EventTime
    }
}

/// Manually driven clock.
///
/// Clones share the same underlying instant, so a test can hand one clone
/// to the stage under test and advance time through another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    time: Arc<AtomicI64>,
}

impl ManualTimeSource {
    pub fn new(initial: EventTime) -> Self {
        Self {
            time: Arc::new(AtomicI64::new(initial)),
        }
    }

    pub fn advance(&self, ms: EventTime) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: EventTime) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> EventTime {
        self.time.load(Ordering::SeqCst)
    }
}
