//! # Subscriptions
//!
//! A `Subscription` is a filter over one of two feeds:
//!
//! - **Broadcast**: a shared `tokio::sync::broadcast` receiver. Events that
//!   do not match are skipped on the receiving side. A consumer more than the
//!   bus capacity behind skips the oldest events; the skips are logged and
//!   counted in `skipped()`.
//! - **Queue**: a bounded `mpsc` channel of its own, filled only with
//!   matching events. Nothing is ever skipped; a full queue makes `publish`
//!   wait.

use crate::events::{EventFilter, StreamEvent};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::mpsc::{self, error::TryRecvError as QueueTryRecvError};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, ReceiverStream};
use tokio_stream::Stream;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus dropped")]
    Closed,
}

/// Input side of a consumer.
pub trait EventSubscriber: Send + Sync {
    /// Best-effort subscription; a lagging consumer skips events.
    fn subscribe(&self, filter: EventFilter) -> Subscription;

    /// Subscription that sees every matching event, applying backpressure to
    /// publishers instead of skipping.
    fn subscribe_lossless(&self, filter: EventFilter) -> Subscription;
}

type Counts = Arc<RwLock<HashMap<String, usize>>>;

/// Live subscription counts, keyed by the filter's topic list.
#[derive(Debug, Clone, Default)]
pub(crate) struct SubscriberTracker {
    counts: Counts,
}

impl SubscriberTracker {
    fn key(filter: &EventFilter) -> String {
        format!("{:?}", filter.topics)
    }

    pub(crate) fn register(&self, filter: &EventFilter) -> TrackerGuard {
        let key = Self::key(filter);
        *self.counts.write().entry(key.clone()).or_default() += 1;
        TrackerGuard {
            counts: Arc::clone(&self.counts),
            key,
        }
    }

    pub(crate) fn count(&self, filter: &EventFilter) -> usize {
        self.counts.read().get(&Self::key(filter)).copied().unwrap_or_default()
    }
}

pub(crate) struct TrackerGuard {
    counts: Counts,
    key: String,
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        let mut counts = self.counts.write();
        let remaining = counts.get_mut(&self.key).map(|n| {
            *n = n.saturating_sub(1);
            *n
        });
        if remaining == Some(0) {
            counts.remove(&self.key);
        }
    }
}

enum Feed {
    Broadcast(broadcast::Receiver<StreamEvent>),
    Queue(mpsc::Receiver<StreamEvent>),
}

/// Filtered view of the bus. Unsubscribes on drop.
pub struct Subscription {
    feed: Feed,
    filter: EventFilter,
    skipped: u64,
    _guard: TrackerGuard,
}

impl Subscription {
    pub(crate) fn broadcast(
        receiver: broadcast::Receiver<StreamEvent>,
        filter: EventFilter,
        guard: TrackerGuard,
    ) -> Self {
        Self::with_feed(Feed::Broadcast(receiver), filter, guard)
    }

    pub(crate) fn queued(
        receiver: mpsc::Receiver<StreamEvent>,
        filter: EventFilter,
        guard: TrackerGuard,
    ) -> Self {
        Self::with_feed(Feed::Queue(receiver), filter, guard)
    }

    fn with_feed(feed: Feed, filter: EventFilter, guard: TrackerGuard) -> Self {
        Self {
            feed,
            filter,
            skipped: 0,
            _guard: guard,
        }
    }

    /// Next matching event, or `None` once the bus is dropped and drained.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        loop {
            let event = match &mut self.feed {
                Feed::Queue(receiver) => receiver.recv().await?,
                Feed::Broadcast(receiver) => match receiver.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        self.lagged(skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                },
            };
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Next matching event already queued. `Ok(None)` when nothing is.
    ///
    /// # Errors
    ///
    /// `SubscriptionError::Closed` once the bus is dropped and drained.
    pub fn try_recv(&mut self) -> Result<Option<StreamEvent>, SubscriptionError> {
        loop {
            let event = match &mut self.feed {
                Feed::Queue(receiver) => match receiver.try_recv() {
                    Ok(event) => event,
                    Err(QueueTryRecvError::Empty) => return Ok(None),
                    Err(QueueTryRecvError::Disconnected) => return Err(SubscriptionError::Closed),
                },
                Feed::Broadcast(receiver) => match receiver.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Lagged(skipped)) => {
                        self.lagged(skipped);
                        continue;
                    }
                    Err(TryRecvError::Empty) => return Ok(None),
                    Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
                },
            };
            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    fn lagged(&mut self, skipped: u64) {
        self.skipped += skipped;
        warn!(skipped, total = self.skipped, topics = ?self.filter.topics, "Subscription lagged");
    }

    /// Events lost to lag so far. Always zero for lossless subscriptions.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    #[must_use]
    pub fn is_lossless(&self) -> bool {
        matches!(self.feed, Feed::Queue(_))
    }

    #[must_use]
    pub fn event_filter(&self) -> &EventFilter {
        &self.filter
    }

    #[must_use]
    pub fn into_stream(self) -> EventStream {
        let inner = match self.feed {
            Feed::Broadcast(receiver) => StreamFeed::Broadcast(BroadcastStream::new(receiver)),
            Feed::Queue(receiver) => StreamFeed::Queue(ReceiverStream::new(receiver)),
        };
        EventStream {
            inner,
            filter: self.filter,
            _guard: self._guard,
        }
    }
}

enum StreamFeed {
    Broadcast(BroadcastStream<StreamEvent>),
    Queue(ReceiverStream<StreamEvent>),
}

/// `Subscription` as a `tokio_stream::Stream`.
pub struct EventStream {
    inner: StreamFeed,
    filter: EventFilter,
    _guard: TrackerGuard,
}

impl EventStream {
    #[must_use]
    pub fn event_filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let polled = match &mut self.inner {
                StreamFeed::Queue(stream) => Pin::new(stream).poll_next(cx),
                StreamFeed::Broadcast(stream) => match Pin::new(stream).poll_next(cx) {
                    Poll::Ready(Some(Ok(event))) => Poll::Ready(Some(event)),
                    Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                        debug!(skipped, "Event stream lagged");
                        continue;
                    }
                    Poll::Ready(None) => Poll::Ready(None),
                    Poll::Pending => Poll::Pending,
                },
            };
            match polled {
                Poll::Ready(Some(event)) if self.filter.matches(&event) => {
                    return Poll::Ready(Some(event))
                }
                Poll::Ready(Some(_)) => {}
                other => return other,
            }
        }
    }
}
