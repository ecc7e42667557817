//! Timestamp policies.
//!
//! A policy decides where a record's event time comes from. Policies are
//! pure apart from reading the clock.

use serde::{Deserialize, Serialize};
use shared_types::{DeclaredTimestamp, EventTime, SourceRecord, TimestampError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::ports::TimeSource;

/// Extracts an event time from a source record.
///
/// `previous` is the last-known timestamp on the record's partition, if any.
pub trait TimestampExtractor<P>: Send + Sync {
    /// # Errors
    ///
    /// `TimestampError::Malformed` when the record carries no usable time.
    fn extract(
        &self,
        record: &SourceRecord<P>,
        previous: Option<EventTime>,
    ) -> Result<EventTime, TimestampError>;
}

/// Reads the timestamp the payload declares about itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredFieldExtractor;

impl<P: DeclaredTimestamp> TimestampExtractor<P> for DeclaredFieldExtractor {
    fn extract(
        &self,
        record: &SourceRecord<P>,
        _previous: Option<EventTime>,
    ) -> Result<EventTime, TimestampError> {
        record.payload.declared_timestamp()
    }
}

/// Stamps records with the wall clock at ingestion. Always succeeds.
#[derive(Debug, Clone, Default)]
pub struct IngestionClockExtractor<T> {
    clock: T,
}

impl<T: TimeSource> IngestionClockExtractor<T> {
    pub fn new(clock: T) -> Self {
        Self { clock }
    }
}

impl<P, T: TimeSource> TimestampExtractor<P> for IngestionClockExtractor<T> {
    fn extract(
        &self,
        _record: &SourceRecord<P>,
        _previous: Option<EventTime>,
    ) -> Result<EventTime, TimestampError> {
        Ok(self.clock.now())
    }
}

/// Configured timestamp source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampPolicy {
    /// Use the payload's declared timestamp field.
    #[default]
    DeclaredField,
    /// Use the wall clock at ingestion.
    IngestionClock,
}

impl TimestampPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeclaredField => "declared-field",
            Self::IngestionClock => "ingestion-clock",
        }
    }
}

impl fmt::Display for TimestampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown timestamp policy `{0}` (expected declared-field or ingestion-clock)")]
pub struct PolicyParseError(pub String);

impl FromStr for TimestampPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "declared-field" | "declared" => Ok(Self::DeclaredField),
            "ingestion-clock" | "ingestion" | "wallclock" => Ok(Self::IngestionClock),
            _ => Err(PolicyParseError(s.to_string())),
        }
    }
}

/// Extractor selected by a `TimestampPolicy` value.
#[derive(Debug, Clone)]
pub struct PolicyExtractor<T> {
    policy: TimestampPolicy,
    declared: DeclaredFieldExtractor,
    ingestion: IngestionClockExtractor<T>,
}

impl<T: TimeSource> PolicyExtractor<T> {
    pub fn new(policy: TimestampPolicy, clock: T) -> Self {
        Self {
            policy,
            declared: DeclaredFieldExtractor,
            ingestion: IngestionClockExtractor::new(clock),
        }
    }

    pub fn policy(&self) -> TimestampPolicy {
        self.policy
    }
}

impl<P: DeclaredTimestamp, T: TimeSource> TimestampExtractor<P> for PolicyExtractor<T> {
    fn extract(
        &self,
        record: &SourceRecord<P>,
        previous: Option<EventTime>,
    ) -> Result<EventTime, TimestampError> {
        match self.policy {
            TimestampPolicy::DeclaredField => self.declared.extract(record, previous),
            TimestampPolicy::IngestionClock => self.ingestion.extract(record, previous),
        }
    }
}
