//! Structured logging.
//!
//! Log lines carry consistent fields so they can be filtered per stage:
//! - `stage`: stage label (`sj-01` .. `sj-05`)
//! - `key`: record key, where one applies
//! - `event_time`: logical event time in ms, where one applies

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Install the global `tracing` subscriber.
///
/// JSON output is meant for containers, the pretty format for development.
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log filter `{}`: {e}", config.log_level)))?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(config.console_output.then_some(fmt_layer))
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Logging initialized"
    );

    Ok(())
}

/// Helper to create structured log entries with a stage label.
#[macro_export]
macro_rules! log_event {
    // Info level with stage
    (info, $stage:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            stage = %$stage,
            $($($field)*,)?
            $msg
        )
    };

    // Warn level with stage
    (warn, $stage:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            stage = %$stage,
            $($($field)*,)?
            $msg
        )
    };

    // Error level with stage
    (error, $stage:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            stage = %$stage,
            $($($field)*,)?
            $msg
        )
    };

    // Debug level with stage
    (debug, $stage:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            stage = %$stage,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a record-related event with the standard key and event-time fields.
#[macro_export]
macro_rules! log_record_event {
    ($level:ident, $stage:expr, $msg:expr, $key:expr, $event_time:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            stage = %$stage,
            key = %$key,
            event_time = $event_time,
            $($($field)*,)?
            $msg
        )
    };
}
