//! # Pipeline Configuration
//!
//! One immutable value describing the whole pipeline. Built once at startup
//! (defaults, then environment overrides), validated, then shared as
//! `Arc<PipelineConfig>` and never mutated.
//!
//! ## Environment Variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SJ_WINDOW_MS` | `1200000` (20 minutes) |
//! | `SJ_RETENTION_MS` | same as the window |
//! | `SJ_TIMESTAMP_POLICY` | `declared-field` |
//! | `SJ_PARTITIONS` | `2` |
//! | `SJ_JOIN_WORKERS` | `2` |
//! | `SJ_CHANNEL_CAPACITY` | `1024` |
//! | `SJ_MAX_ENTRIES_PER_KEY` | unset (no per-key bound) |
//! | `SJ_OVERFLOW_POLICY` | `evict-oldest` |
//! | `SJ_PURCHASES_PER_BATCH` | `100` |
//! | `SJ_BATCHES` | `10` |
//! | `SJ_CUSTOMERS` | `10` |
//! | `SJ_BATCH_INTERVAL_MS` | `6000` |
//! | `SJ_MALFORMED_RATIO` | `0.02` |
//! | `SJ_SEED` | `42` |
//! | `SJ_TICKER_COMPANIES` | `3` |
//! | `SJ_TICKER_ITERATIONS` | `3` |
//! | `SJ_TICKER_INTERVAL_MS` | `4000` |
//!
//! A value that does not parse is logged at `warn` and the default is kept.

use sj_01_event_time::TimestampPolicy;
use sj_04_windowed_join::{JoinConfig, JoinError, OverflowPolicy, PerKeyBound};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A setting is outside its allowed range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The join window settings are inconsistent.
    #[error(transparent)]
    Join(#[from] JoinError),
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Maximum `|left.t - right.t|` for two purchases to join.
    pub window_ms: i64,
    /// How long buffered purchases are kept behind the newest one.
    pub retention_ms: i64,
    /// Where purchase event time comes from.
    pub timestamp_policy: TimestampPolicy,
    /// Input partitions, one ingest worker each.
    pub partitions: u32,
    /// Join workers; keys are sharded across them.
    pub join_workers: usize,
    /// Capacity of every internal channel and of the event bus.
    pub channel_capacity: usize,
    /// Optional cap on buffered entries per key and side.
    pub per_key_bound: Option<PerKeyBound>,
    /// Sample purchase producer.
    pub producer: ProducerConfig,
    /// Sample stock ticker producer.
    pub tickers: TickerConfig,
}

/// Sample purchase producer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerConfig {
    pub purchases_per_batch: usize,
    pub batches: usize,
    pub customers: usize,
    pub batch_interval_ms: u64,
    /// Fraction of purchases produced with a missing or garbled date.
    pub malformed_ratio: f64,
    pub seed: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            purchases_per_batch: 100,
            batches: 10,
            customers: 10,
            batch_interval_ms: 6_000,
            malformed_ratio: 0.02,
            seed: 42,
        }
    }
}

/// Sample stock ticker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerConfig {
    pub companies: usize,
    pub iterations: usize,
    pub interval_ms: u64,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            companies: 3,
            iterations: 3,
            interval_ms: 4_000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_ms: JoinConfig::DEFAULT_WINDOW_MS,
            retention_ms: JoinConfig::DEFAULT_WINDOW_MS,
            timestamp_policy: TimestampPolicy::default(),
            partitions: 2,
            join_workers: 2,
            channel_capacity: 1024,
            per_key_bound: None,
            producer: ProducerConfig::default(),
            tickers: TickerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `SJ_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let window_ms = setting(&lookup, "SJ_WINDOW_MS", defaults.window_ms);
        let per_key_bound = lookup("SJ_MAX_ENTRIES_PER_KEY")
            .and_then(|raw| parse_or_warn("SJ_MAX_ENTRIES_PER_KEY", &raw))
            .map(|max_entries| PerKeyBound {
                max_entries,
                policy: setting(&lookup, "SJ_OVERFLOW_POLICY", OverflowPolicy::default()),
            });

        let producer = ProducerConfig {
            purchases_per_batch: setting(
                &lookup,
                "SJ_PURCHASES_PER_BATCH",
                defaults.producer.purchases_per_batch,
            ),
            batches: setting(&lookup, "SJ_BATCHES", defaults.producer.batches),
            customers: setting(&lookup, "SJ_CUSTOMERS", defaults.producer.customers),
            batch_interval_ms: setting(
                &lookup,
                "SJ_BATCH_INTERVAL_MS",
                defaults.producer.batch_interval_ms,
            ),
            malformed_ratio: setting(&lookup, "SJ_MALFORMED_RATIO", defaults.producer.malformed_ratio),
            seed: setting(&lookup, "SJ_SEED", defaults.producer.seed),
        };

        let tickers = TickerConfig {
            companies: setting(&lookup, "SJ_TICKER_COMPANIES", defaults.tickers.companies),
            iterations: setting(&lookup, "SJ_TICKER_ITERATIONS", defaults.tickers.iterations),
            interval_ms: setting(&lookup, "SJ_TICKER_INTERVAL_MS", defaults.tickers.interval_ms),
        };

        Self {
            window_ms,
            // Retention follows the window unless set explicitly
            retention_ms: setting(&lookup, "SJ_RETENTION_MS", window_ms),
            timestamp_policy: setting(&lookup, "SJ_TIMESTAMP_POLICY", defaults.timestamp_policy),
            partitions: setting(&lookup, "SJ_PARTITIONS", defaults.partitions),
            join_workers: setting(&lookup, "SJ_JOIN_WORKERS", defaults.join_workers),
            channel_capacity: setting(&lookup, "SJ_CHANNEL_CAPACITY", defaults.channel_capacity),
            per_key_bound,
            producer,
            tickers,
        }
    }

    /// Join settings handed to every join worker.
    pub fn join_config(&self) -> JoinConfig {
        JoinConfig {
            window_ms: self.window_ms,
            retention_ms: self.retention_ms,
            per_key_bound: self.per_key_bound,
        }
    }

    /// # Errors
    ///
    /// `ConfigError` for zero partitions, workers or channel capacity, an
    /// invalid join window, no customers, or a malformed ratio outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("partitions", self.partitions as usize)?;
        positive("join_workers", self.join_workers)?;
        positive("channel_capacity", self.channel_capacity)?;
        positive("producer.customers", self.producer.customers)?;
        if !(0.0..=1.0).contains(&self.producer.malformed_ratio) {
            return Err(ConfigError::InvalidValue {
                field: "producer.malformed_ratio",
                reason: format!("{} is not within [0, 1]", self.producer.malformed_ratio),
            });
        }
        self.join_config().validate()?;
        Ok(())
    }
}

fn positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn setting<T>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    lookup(name)
        .and_then(|raw| parse_or_warn(name, &raw))
        .unwrap_or(default)
}

fn parse_or_warn<T>(name: &'static str, raw: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(variable = name, value = raw, error = %e, "Ignoring unparseable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.window_ms, 1_200_000);
        assert_eq!(config.retention_ms, config.window_ms);
        assert_eq!(config.timestamp_policy, TimestampPolicy::DeclaredField);
        assert!(config.per_key_bound.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_lookup_matches_default() {
        assert_eq!(PipelineConfig::from_lookup(|_| None), PipelineConfig::default());
    }

    #[test]
    fn test_retention_follows_window() {
        let config = PipelineConfig::from_lookup(lookup_from(&[("SJ_WINDOW_MS", "300000")]));
        assert_eq!(config.window_ms, 300_000);
        assert_eq!(config.retention_ms, 300_000);

        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("SJ_WINDOW_MS", "300000"),
            ("SJ_RETENTION_MS", "600000"),
        ]));
        assert_eq!(config.retention_ms, 600_000);
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("SJ_PARTITIONS", "many"),
            ("SJ_TIMESTAMP_POLICY", "sundial"),
            ("SJ_JOIN_WORKERS", "4"),
        ]));
        assert_eq!(config.partitions, 2);
        assert_eq!(config.timestamp_policy, TimestampPolicy::DeclaredField);
        assert_eq!(config.join_workers, 4);
    }

    #[test]
    fn test_per_key_bound_from_env() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("SJ_MAX_ENTRIES_PER_KEY", "8"),
            ("SJ_OVERFLOW_POLICY", "reject-new"),
        ]));
        assert_eq!(
            config.per_key_bound,
            Some(PerKeyBound {
                max_entries: 8,
                policy: OverflowPolicy::RejectNew
            })
        );

        let config = PipelineConfig::from_lookup(lookup_from(&[("SJ_OVERFLOW_POLICY", "reject-new")]));
        assert!(config.per_key_bound.is_none());
    }

    #[test]
    fn test_policy_from_env() {
        let config =
            PipelineConfig::from_lookup(lookup_from(&[("SJ_TIMESTAMP_POLICY", "ingestion-clock")]));
        assert_eq!(config.timestamp_policy, TimestampPolicy::IngestionClock);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = PipelineConfig::default();
        config.partitions = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "partitions", .. })
        ));

        let mut config = PipelineConfig::default();
        config.join_workers = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_short_retention() {
        let mut config = PipelineConfig::default();
        config.retention_ms = config.window_ms - 1;
        assert!(matches!(config.validate(), Err(ConfigError::Join(_))));
    }

    #[test]
    fn test_validate_rejects_bad_ratio() {
        let mut config = PipelineConfig::default();
        config.producer.malformed_ratio = 1.5;
        assert!(config.validate().is_err());
    }
}
