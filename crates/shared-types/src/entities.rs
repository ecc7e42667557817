//! # Core Domain Entities
//!
//! Defines the record shapes that flow between the pipeline stages.
//!
//! ## Clusters
//!
//! - **Envelope**: `SourceRecord` (as delivered by the transport), `Event` (time-stamped, keyed)
//! - **Purchases**: `Purchase`, `CorrelatedPurchase`
//! - **Market data**: `StockTicker`
//! - **Stages**: `StageId` for log and metric labels

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::errors::TimestampError;

// =============================================================================
// CLUSTER A: THE ENVELOPE
// =============================================================================

/// Logical event time in milliseconds since the Unix epoch.
pub type EventTime = i64;

/// A record exactly as the external transport delivers it.
///
/// Keys are optional: upstream producers are free to publish without one,
/// and the pipeline rekeys records before any keyed stage sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord<P> {
    /// Partition the record was read from.
    pub partition: u32,
    /// Offset within the partition (monotonic per partition).
    pub offset: u64,
    /// Transport key, if the producer set one.
    pub key: Option<String>,
    /// Decoded payload.
    pub payload: P,
}

impl<P> SourceRecord<P> {
    /// Create a keyed source record.
    pub fn keyed(partition: u32, offset: u64, key: impl Into<String>, payload: P) -> Self {
        Self {
            partition,
            offset,
            key: Some(key.into()),
            payload,
        }
    }

    /// Create a source record without a key.
    pub fn unkeyed(partition: u32, offset: u64, payload: P) -> Self {
        Self {
            partition,
            offset,
            key: None,
            payload,
        }
    }
}

/// A keyed record with its assigned event time.
///
/// Identity is `(key, event_time, sequence)`: two events sharing a key are
/// distinct entities. `sequence` is the arrival order stamped at ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<P> {
    /// Routing and join key.
    pub key: String,
    /// Domain payload.
    pub payload: P,
    /// Logical event time used for windowing.
    pub event_time: EventTime,
    /// Arrival order at ingest.
    pub sequence: u64,
}

impl<P> Event<P> {
    /// Create a new event.
    pub fn new(key: impl Into<String>, payload: P, event_time: EventTime, sequence: u64) -> Self {
        Self {
            key: key.into(),
            payload,
            event_time,
            sequence,
        }
    }

    /// Replace the key, keeping everything else.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Map the payload into another type, keeping key, time and sequence.
    pub fn map_payload<Q>(self, f: impl FnOnce(P) -> Q) -> Event<Q> {
        Event {
            key: self.key,
            payload: f(self.payload),
            event_time: self.event_time,
            sequence: self.sequence,
        }
    }
}

/// Payloads that carry their own event time.
pub trait DeclaredTimestamp {
    /// Read the payload's declared timestamp.
    ///
    /// # Errors
    ///
    /// `TimestampError::Malformed` when the field is absent or unparseable.
    fn declared_timestamp(&self) -> Result<EventTime, TimestampError>;
}

// =============================================================================
// CLUSTER B: PURCHASES
// =============================================================================

/// A point-of-sale purchase.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub first_name: String,
    pub last_name: String,
    pub customer_id: String,
    /// Card number; `xxxx-xxxx-xxxx-NNNN` once masked.
    pub credit_card_number: String,
    pub item_purchased: String,
    pub department: String,
    pub employee_id: String,
    pub quantity: u32,
    pub price: f64,
    /// Raw RFC 3339 purchase time as delivered by the producer.
    pub purchase_date: Option<String>,
    pub zip_code: String,
    pub store_id: String,
}

impl Purchase {
    /// Prefix every masked card number shares.
    pub const MASKED_CARD_PREFIX: &'static str = "xxxx-xxxx-xxxx-";

    /// Fully redacted card number, used when the last group can't be kept.
    pub const FULLY_MASKED_CARD: &'static str = "xxxx";

    /// Whether the card number has already been redacted.
    #[must_use]
    pub fn is_card_masked(&self) -> bool {
        self.credit_card_number == Self::FULLY_MASKED_CARD
            || self.credit_card_number.starts_with(Self::MASKED_CARD_PREFIX)
    }

    /// Total value of this purchase line.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

impl DeclaredTimestamp for Purchase {
    fn declared_timestamp(&self) -> Result<EventTime, TimestampError> {
        let raw = self
            .purchase_date
            .as_deref()
            .ok_or_else(|| TimestampError::missing("purchaseDate"))?;

        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| TimestampError::unparseable("purchaseDate", raw, e))
    }
}

/// Two purchases by the same customer that happened close together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedPurchase {
    pub customer_id: String,
    pub items_purchased: Vec<String>,
    pub total_amount: f64,
    pub first_purchase_time: EventTime,
    pub second_purchase_time: EventTime,
}

// =============================================================================
// CLUSTER C: MARKET DATA
// =============================================================================

/// A price update for a listed company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTicker {
    pub symbol: String,
    pub price: f64,
}

impl StockTicker {
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }
}

// =============================================================================
// CLUSTER D: STAGES
// =============================================================================

/// Pipeline stage identifiers, used as log and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    /// Timestamp assignment.
    EventTime = 1,
    /// Masking and rekeying.
    RecordTransform = 2,
    /// Predicate routing.
    BranchRouter = 3,
    /// Window buffers and join evaluation.
    WindowedJoin = 4,
    /// Materialized view and raw log consumers.
    ViewLog = 5,
}

impl StageId {
    /// Short label, e.g. `sj-04`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventTime => "sj-01",
            Self::RecordTransform => "sj-02",
            Self::BranchRouter => "sj-03",
            Self::WindowedJoin => "sj-04",
            Self::ViewLog => "sj-05",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
