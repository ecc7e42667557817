//! Symmetric join window.

use shared_types::EventTime;

/// Pairs join when their timestamps differ by at most `size_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinWindow {
    size_ms: i64,
}

impl JoinWindow {
    pub fn symmetric(size_ms: i64) -> Self {
        Self {
            size_ms: size_ms.max(0),
        }
    }

    pub fn size_ms(&self) -> i64 {
        self.size_ms
    }

    /// Inclusive `[t - size, t + size]`, saturating at the `i64` limits.
    pub fn bounds(&self, t: EventTime) -> (EventTime, EventTime) {
        (t.saturating_sub(self.size_ms), t.saturating_add(self.size_ms))
    }

    pub fn contains(&self, a: EventTime, b: EventTime) -> bool {
        a.abs_diff(b) <= self.size_ms.unsigned_abs()
    }
}
