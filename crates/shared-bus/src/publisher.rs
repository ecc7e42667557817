//! # Publishing
//!
//! `InMemoryEventBus` fans every published event out two ways:
//!
//! - one `tokio::sync::broadcast` channel shared by all best-effort
//!   subscriptions, which filter on their own side. A broadcast never waits;
//!   a consumer more than `capacity` events behind loses the oldest ones.
//! - one bounded `mpsc` queue per lossless subscription, filtered on the
//!   publishing side. `publish` waits for room in every matching queue.

use crate::events::{EventFilter, EventTopic, StreamEvent};
use crate::subscriber::{EventStream, EventSubscriber, SubscriberTracker, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};

/// Output side of a stage.
///
/// Stages emit through this port and never learn who consumes.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Returns how many subscriptions the event was delivered to. Zero means
    /// nobody was listening and the event is gone.
    async fn publish(&self, event: StreamEvent) -> usize;

    /// Events handed to `publish` so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Publish counts per concrete topic.
#[derive(Debug, Default)]
struct TopicCounters {
    joined: AtomicU64,
    ticks: AtomicU64,
    dead_letters: AtomicU64,
}

impl TopicCounters {
    fn slot(&self, topic: EventTopic) -> Option<&AtomicU64> {
        match topic {
            EventTopic::JoinedOutput => Some(&self.joined),
            EventTopic::StockTicker => Some(&self.ticks),
            EventTopic::DeadLetterQueue => Some(&self.dead_letters),
            EventTopic::All => None,
        }
    }

    fn total(&self) -> u64 {
        [&self.joined, &self.ticks, &self.dead_letters]
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum()
    }
}

/// Sending half of one lossless subscription.
struct Queue {
    filter: EventFilter,
    sender: mpsc::Sender<StreamEvent>,
}

pub struct InMemoryEventBus {
    sender: broadcast::Sender<StreamEvent>,
    queues: RwLock<Vec<Queue>>,
    tracker: SubscriberTracker,
    published: TopicCounters,
    undelivered: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` is how far a subscription may lag before it skips events.
    /// Zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            queues: RwLock::new(Vec::new()),
            tracker: SubscriberTracker::default(),
            published: TopicCounters::default(),
            undelivered: AtomicU64::new(0),
            capacity,
        }
    }

    /// Receive every matching event published from now on.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let guard = self.tracker.register(&filter);
        debug!(topics = ?filter.topics, stages = ?filter.source_stages, "Subscribed");
        Subscription::broadcast(self.sender.subscribe(), filter, guard)
    }

    /// Receive every matching event published from now on, without loss.
    ///
    /// The subscription gets its own queue of `capacity` events. Publishers
    /// wait while it is full, so the consumer must keep draining it.
    #[must_use]
    pub fn subscribe_lossless(&self, filter: EventFilter) -> Subscription {
        let guard = self.tracker.register(&filter);
        let (sender, receiver) = mpsc::channel(self.capacity);
        self.queues.write().push(Queue {
            filter: filter.clone(),
            sender,
        });
        debug!(topics = ?filter.topics, capacity = self.capacity, "Subscribed lossless");
        Subscription::queued(receiver, filter, guard)
    }

    /// Like `subscribe`, as a `Stream`.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        self.subscribe(filter).into_stream()
    }

    /// Live subscriptions, whatever their filter.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let queues = self.queues.read().iter().filter(|q| !q.sender.is_closed()).count();
        self.sender.receiver_count() + queues
    }

    /// Live subscriptions registered with exactly this topic list.
    #[must_use]
    pub fn subscriptions_for(&self, filter: &EventFilter) -> usize {
        self.tracker.count(filter)
    }

    /// Events published on `topic`. `EventTopic::All` sums every topic.
    #[must_use]
    pub fn published(&self, topic: EventTopic) -> u64 {
        match self.published.slot(topic) {
            Some(counter) => counter.load(Ordering::Relaxed),
            None => self.published.total(),
        }
    }

    /// Events published while nobody was subscribed.
    #[must_use]
    pub fn undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }

    fn subscribe_lossless(&self, filter: EventFilter) -> Subscription {
        InMemoryEventBus::subscribe_lossless(self, filter)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: StreamEvent) -> usize {
        let topic = event.topic();
        if let Some(counter) = self.published.slot(topic) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        // Senders are cloned out so no lock is held across a send
        let queues: Vec<_> = self
            .queues
            .read()
            .iter()
            .filter(|q| q.filter.matches(&event))
            .map(|q| q.sender.clone())
            .collect();

        let mut delivered = 0;
        let mut closed = false;
        for queue in queues {
            match queue.send(event.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => closed = true,
            }
        }
        if closed {
            self.queues.write().retain(|q| !q.sender.is_closed());
        }

        delivered += self.sender.send(event).unwrap_or(0);
        if delivered == 0 {
            self.undelivered.fetch_add(1, Ordering::Relaxed);
            debug!(topic = topic.as_str(), "Published with no subscribers");
        } else {
            trace!(topic = topic.as_str(), receivers = delivered, "Published");
        }
        delivered
    }

    fn events_published(&self) -> u64 {
        self.published.total()
    }
}
