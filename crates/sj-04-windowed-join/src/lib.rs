//! # SJ-04 Windowed Join
//!
//! Sliding-window inner join between two keyed event streams.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`)
//!   - `WindowBuffer`: per-side keyed store, time-indexed, retention-bounded
//!   - `WindowedJoin`: probe-then-insert evaluator owning both buffers
//!   - `Joiner`: typed combine contract; `PurchaseJoiner` builds `CorrelatedPurchase`
//!   - `JoinConfig`: window, retention and optional per-key bound
//!
//! - **Ports Layer** (`ports/`)
//!   - `WindowedJoinApi`: Driving port used by join workers
//!
//! ## Algorithm
//!
//! ```text
//! event e on side S ──► bounds [e.t - w, e.t + w]
//!                          │
//!                          ▼
//!               O.range_query(e.key, low, high)
//!                          │
//!                          ▼
//!        emit combine(left, right) per match (O.t ascending)
//!                          │
//!                          ▼
//!               S.insert(e) ──► S.expire()
//! ```
//!
//! ## Invariants
//!
//! - A pair `(l, r)` with equal keys is emitted iff `|l.t - r.t| <= window`,
//!   provided neither member was expired before the other arrived.
//! - Each pair is emitted exactly once: by whichever member arrives second.
//! - After every insert a buffer holds no entry with
//!   `max_timestamp_seen - t > retention`.
//! - Joined records carry the shared key and `max(l.t, r.t)`; they are never
//!   retracted.
//!
//! ## Bounded Memory
//!
//! Retention bounds entries by time. A per-key bound caps hot keys:
//!
//! | Policy | On a full key |
//! |--------|---------------|
//! | `EvictOldest` (default) | Drop the key's oldest entry, keep the new one |
//! | `RejectNew` | Keep the buffer as is, report `BufferError::Overflow` |
//!
//! ## Usage Example
//!
//! ```ignore
//! use sj_04_windowed_join::{JoinConfig, PurchaseJoiner, WindowedJoin};
//!
//! let mut join = WindowedJoin::new(JoinConfig::new(20 * 60 * 1000), PurchaseJoiner)?;
//! join.on_left(coffee_event);
//! for joined in join.on_right(electronics_event).emitted {
//!     publish(joined);
//! }
//! ```

pub mod domain;
pub mod ports;

pub use domain::{
    BufferError, BufferStats, Inserted, JoinConfig, JoinError, JoinOutcome, JoinSide, JoinStats,
    JoinWindow, Joiner, OverflowPolicy, PerKeyBound, PurchaseJoiner, WindowBuffer, WindowedJoin,
};
pub use ports::WindowedJoinApi;
