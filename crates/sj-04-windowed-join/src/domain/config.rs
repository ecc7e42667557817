//! Join configuration with validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::JoinError;

/// What to do when a key already holds its maximum number of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Drop the key's oldest entry to make room (soft bound).
    #[default]
    EvictOldest,
    /// Refuse the new entry with `BufferError::Overflow` (hard bound).
    RejectNew,
}

impl OverflowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvictOldest => "evict-oldest",
            Self::RejectNew => "reject-new",
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "evict-oldest" | "evict" => Ok(Self::EvictOldest),
            "reject-new" | "reject" => Ok(Self::RejectNew),
            other => Err(JoinError::InvalidConfig(format!(
                "unknown overflow policy `{other}`"
            ))),
        }
    }
}

/// Maximum entries any single key may hold in one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerKeyBound {
    pub max_entries: usize,
    pub policy: OverflowPolicy,
}

/// Window join configuration.
///
/// `retention_ms` defaults to `window_ms`: an entry is kept exactly as long
/// as a later arrival on the other side could still match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Maximum `|left.t - right.t|` for a pair to join (inclusive). Zero
    /// joins only simultaneous events.
    pub window_ms: i64,
    /// How far behind a buffer's maximum timestamp entries are kept.
    pub retention_ms: i64,
    /// Optional per-key cap on buffered entries.
    pub per_key_bound: Option<PerKeyBound>,
}

impl JoinConfig {
    /// 20 minutes, the correlated-purchase window.
    pub const DEFAULT_WINDOW_MS: i64 = 20 * 60 * 1000;

    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            retention_ms: window_ms,
            per_key_bound: None,
        }
    }

    #[must_use]
    pub fn with_retention(mut self, retention_ms: i64) -> Self {
        self.retention_ms = retention_ms;
        self
    }

    #[must_use]
    pub fn with_per_key_bound(mut self, max_entries: usize, policy: OverflowPolicy) -> Self {
        self.per_key_bound = Some(PerKeyBound {
            max_entries,
            policy,
        });
        self
    }

    /// # Errors
    ///
    /// `JoinError::InvalidConfig` unless `window >= 0`, `retention >= window`
    /// and any per-key bound is at least one.
    pub fn validate(&self) -> Result<(), JoinError> {
        if self.window_ms < 0 {
            return Err(JoinError::InvalidConfig(format!(
                "window_ms must not be negative, got {}",
                self.window_ms
            )));
        }
        if self.retention_ms < self.window_ms {
            return Err(JoinError::InvalidConfig(format!(
                "retention_ms ({}) must be at least window_ms ({})",
                self.retention_ms, self.window_ms
            )));
        }
        if let Some(bound) = self.per_key_bound {
            if bound.max_entries == 0 {
                return Err(JoinError::InvalidConfig(
                    "per-key bound must allow at least one entry".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW_MS)
    }
}
