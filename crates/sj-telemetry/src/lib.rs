//! # StreamJoin Telemetry
//!
//! Logging and metrics for the StreamJoin pipeline.
//!
//! ## Components
//!
//! - **Logs**: `tracing` events rendered by a `tracing-subscriber` fmt layer
//!   (pretty for development, JSON for containers), filtered by `EnvFilter`.
//! - **Metrics**: Prometheus counters, gauges and histograms in a global
//!   registry, exported as text over `GET /metrics`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sj_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//!
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SJ_SERVICE_NAME` | `streamjoin` | Service name in the startup log |
//! | `SJ_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directive |
//! | `SJ_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `SJ_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `SJ_METRICS_PORT` | `9100` | Metrics endpoint port, `0` disables |

mod config;
mod logging;
pub mod metrics;
mod server;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, BUFFERED_ENTRIES,
    BUFFER_EVICTIONS, BUFFER_REJECTIONS, EVENT_BUS_MESSAGES_SENT, JOINED_RECORDS,
    JOIN_PROBE_DURATION, LOG_LENGTH, RECORDS_INGESTED, RECORDS_ROUTED, RECORDS_UNROUTED,
    STAGE_ERRORS, TIMESTAMP_FALLBACKS, VIEW_KEYS,
};
pub use server::{bind_metrics, serve_metrics};

use thiserror::Error;

/// Failures while installing logging or registering metrics.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register all metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so early log lines can already be counted
    let metrics_handle = register_metrics()?;

    logging::init_logging(config)?;

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!("Telemetry guard released");
    }
}

/// Convenience macro for creating a span with stage context.
///
/// # Example
///
/// ```rust,ignore
/// use sj_telemetry::stage_span;
///
/// let _span = stage_span!("probe", stage = "sj-04", key = "c1").entered();
/// ```
#[macro_export]
macro_rules! stage_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Increment a counter, optionally by label values.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Increment a counter by `value`, optionally by label values.
#[macro_export]
macro_rules! metric_inc_by {
    ($metric:expr, $value:expr) => {
        $metric.inc_by($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).inc_by($value)
    };
}

/// Move a gauge by `value`, which may be negative.
#[macro_export]
macro_rules! metric_add {
    ($metric:expr, $value:expr) => {
        $metric.add($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).add($value)
    };
}

/// Observe a histogram sample, optionally by label values.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}
