//! # Error Types
//!
//! Defines error types shared across pipeline stages.

use std::fmt::Display;

use thiserror::Error;

/// Errors raised while reading a payload's declared event time.
///
/// Always recoverable: the event-time stage substitutes a fallback timestamp
/// and the record keeps flowing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// The timestamp field is absent or cannot be parsed.
    #[error("Malformed timestamp in `{field}`: {reason} (raw: {raw:?})")]
    Malformed {
        field: &'static str,
        raw: Option<String>,
        reason: String,
    },
}

impl TimestampError {
    /// The field carried no value at all.
    pub fn missing(field: &'static str) -> Self {
        Self::Malformed {
            field,
            raw: None,
            reason: "field is missing".to_string(),
        }
    }

    /// The field carried a value that could not be parsed.
    pub fn unparseable(field: &'static str, raw: &str, cause: impl Display) -> Self {
        Self::Malformed {
            field,
            raw: Some(raw.to_string()),
            reason: cause.to_string(),
        }
    }
}

/// Pipeline lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Accepting and processing input.
    Running,
    /// Input closed; workers finishing in-flight records.
    Draining,
    /// All workers have exited and buffers are released.
    Stopped,
}
