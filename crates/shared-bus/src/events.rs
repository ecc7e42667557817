//! # Stream Events
//!
//! Defines every event type that flows through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{CorrelatedPurchase, Event, StageId, StockTicker};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    // =========================================================================
    // SJ-04: WINDOWED JOIN
    // =========================================================================
    /// Two purchases by one customer fell inside the join window.
    Joined(Event<CorrelatedPurchase>),

    // =========================================================================
    // SJ-01: EVENT TIME (ticker feed)
    // =========================================================================
    /// A time-stamped price update, keyed by symbol.
    StockTick(Event<StockTicker>),

    // =========================================================================
    // CRITICAL EVENTS (DLQ)
    // =========================================================================
    /// A stage hit an error that needs operator attention.
    CriticalError {
        /// The stage that encountered the error.
        stage: StageId,
        /// Error description.
        error: String,
    },
}

impl StreamEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::Joined(_) => EventTopic::JoinedOutput,
            Self::StockTick(_) => EventTopic::StockTicker,
            Self::CriticalError { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Get the originating stage.
    #[must_use]
    pub fn source_stage(&self) -> StageId {
        match self {
            Self::Joined(_) => StageId::WindowedJoin,
            Self::StockTick(_) => StageId::EventTime,
            Self::CriticalError { stage, .. } => *stage,
        }
    }

    /// The record key, for keyed events.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Joined(e) => Some(&e.key),
            Self::StockTick(e) => Some(&e.key),
            Self::CriticalError { .. } => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Joined records.
    JoinedOutput,
    /// Stock ticker updates.
    StockTicker,
    /// Dead Letter Queue for critical errors.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

impl EventTopic {
    /// Metric label for this topic.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JoinedOutput => "joined_output",
            Self::StockTicker => "stock_ticker",
            Self::DeadLetterQueue => "dead_letter_queue",
            Self::All => "all",
        }
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source stages to include. Empty means all sources.
    pub source_stages: Vec<StageId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_stages: Vec::new(),
        }
    }

    /// Create a filter for events from specific stages.
    #[must_use]
    pub fn from_stages(stages: Vec<StageId>) -> Self {
        Self {
            topics: Vec::new(),
            source_stages: stages,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &StreamEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match =
            self.source_stages.is_empty() || self.source_stages.contains(&event.source_stage());

        topic_match && source_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(symbol: &str, price: f64) -> StreamEvent {
        StreamEvent::StockTick(Event::new(symbol, StockTicker::new(symbol, price), 0, 0))
    }

    fn joined() -> StreamEvent {
        StreamEvent::Joined(Event::new(
            "c1",
            CorrelatedPurchase {
                customer_id: "c1".into(),
                items_purchased: vec!["latte".into(), "headphones".into()],
                total_amount: 12.5,
                first_purchase_time: 0,
                second_purchase_time: 500_000,
            },
            500_000,
            1,
        ))
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(joined().topic(), EventTopic::JoinedOutput);
        assert_eq!(joined().source_stage(), StageId::WindowedJoin);
        assert_eq!(tick("AAPL", 100.0).topic(), EventTopic::StockTicker);
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&joined()));
        assert!(filter.matches(&tick("AAPL", 1.0)));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::StockTicker]);
        assert!(filter.matches(&tick("AAPL", 100.0)));
        assert!(!filter.matches(&joined()));
    }

    #[test]
    fn test_filter_by_stage() {
        let filter = EventFilter::from_stages(vec![StageId::WindowedJoin]);
        assert!(filter.matches(&joined()));

        let critical = StreamEvent::CriticalError {
            stage: StageId::BranchRouter,
            error: "worker panicked".into(),
        };
        assert!(!filter.matches(&critical));
    }

    #[test]
    fn test_event_key() {
        assert_eq!(tick("MSFT", 3.0).key(), Some("MSFT"));
        let critical = StreamEvent::CriticalError {
            stage: StageId::ViewLog,
            error: "x".into(),
        };
        assert_eq!(critical.key(), None);
    }
}
