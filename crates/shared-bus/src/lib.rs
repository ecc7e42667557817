//! # Shared Bus - Event Bus for Pipeline Outputs
//!
//! Stages publish their outputs here; downstream consumers subscribe with a
//! filter and never call back into the producing stage.
//!
//! ```text
//!  join workers ──Joined────┐     ┌─► [ broadcast ] ──► joined-record logger
//!                           ├─────┤
//!  ticker worker ─StockTick─┘     ├─► [ queue ] ──────► view consumer (StockTicker)
//!                                 └─► [ queue ] ──────► log consumer  (StockTicker)
//! ```
//!
//! ## Delivery
//!
//! - Every subscriber receives every event published after it subscribed.
//! - Subscribers filter by topic and source stage.
//! - `subscribe`: a subscriber that lags beyond the channel capacity skips the
//!   oldest events and counts them.
//! - `subscribe_lossless`: a bounded queue per subscriber; a full queue holds
//!   the publisher back instead of dropping anything.

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{EventFilter, EventTopic, StreamEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Events a subscription may fall behind before it skips (broadcast) or
/// holds publishers back (lossless).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

