//! Prometheus metrics for the StreamJoin pipeline.
//!
//! All metrics follow the naming convention: `sj_<stage>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., joined_records_total)
//! - **Gauge**: Value that can go up or down (e.g., buffered entries)
//! - **Histogram**: Distribution of values (e.g., join probe duration)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

fn latency_buckets(start: f64, count: usize) -> Vec<f64> {
    exponential_buckets(start, 2.0, count).unwrap_or_else(|_| prometheus::DEFAULT_BUCKETS.to_vec())
}

lazy_static! {
    /// Registry every StreamJoin metric lives in.
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // INGEST / EVENT TIME (sj-01)
    // =========================================================================

    /// Source records accepted by the ingest workers
    pub static ref RECORDS_INGESTED: CounterVec = CounterVec::new(
        Opts::new("sj_ingest_records_total", "Source records accepted by ingest workers"),
        &["stream"]  // stream: purchases/tickers
    ).expect("metric creation failed");

    /// Records whose declared timestamp was malformed
    pub static ref TIMESTAMP_FALLBACKS: CounterVec = CounterVec::new(
        Opts::new("sj_event_time_fallbacks_total", "Malformed timestamps replaced by a fallback"),
        &["fallback"]  // fallback: previous/ingestion_clock
    ).expect("metric creation failed");

    // =========================================================================
    // ROUTING (sj-03)
    // =========================================================================

    /// Records routed into a category
    pub static ref RECORDS_ROUTED: CounterVec = CounterVec::new(
        Opts::new("sj_router_routed_total", "Records routed into a category"),
        &["category"]
    ).expect("metric creation failed");

    /// Records matching no category (dropped from the join path)
    pub static ref RECORDS_UNROUTED: Counter = Counter::new(
        "sj_router_unrouted_total",
        "Records matching no category"
    ).expect("metric creation failed");

    // =========================================================================
    // WINDOWED JOIN (sj-04)
    // =========================================================================

    /// Joined records emitted
    pub static ref JOINED_RECORDS: Counter = Counter::new(
        "sj_join_records_emitted_total",
        "Joined records emitted by the window join"
    ).expect("metric creation failed");

    /// Window buffer evictions
    pub static ref BUFFER_EVICTIONS: CounterVec = CounterVec::new(
        Opts::new("sj_join_buffer_evictions_total", "Entries removed from window buffers"),
        &["side", "reason"]  // side: left/right, reason: expired/overflow
    ).expect("metric creation failed");

    /// Inserts refused by a hard per-key bound
    pub static ref BUFFER_REJECTIONS: CounterVec = CounterVec::new(
        Opts::new("sj_join_buffer_rejections_total", "Inserts refused by the per-key bound"),
        &["side"]
    ).expect("metric creation failed");

    /// Entries currently held across all window buffers
    pub static ref BUFFERED_ENTRIES: GaugeVec = GaugeVec::new(
        Opts::new("sj_join_buffered_entries", "Entries currently held in window buffers"),
        &["side"]
    ).expect("metric creation failed");

    /// Time spent probing the opposite buffer and emitting matches
    pub static ref JOIN_PROBE_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "sj_join_probe_duration_seconds",
            "Time spent probing the opposite window buffer"
        ).buckets(latency_buckets(0.000_001, 16))
    ).expect("metric creation failed");

    // =========================================================================
    // VIEW / LOG (sj-05)
    // =========================================================================

    /// Distinct keys in the materialized view
    pub static ref VIEW_KEYS: Gauge = Gauge::new(
        "sj_view_keys",
        "Distinct keys held by the materialized view"
    ).expect("metric creation failed");

    /// Entries appended to the raw event log
    pub static ref LOG_LENGTH: Gauge = Gauge::new(
        "sj_log_length",
        "Entries appended to the raw event log"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS
    // =========================================================================

    /// Messages published on the event bus
    pub static ref EVENT_BUS_MESSAGES_SENT: CounterVec = CounterVec::new(
        Opts::new("sj_eventbus_messages_sent_total", "Messages published on the event bus"),
        &["topic"]
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Stage errors by type
    pub static ref STAGE_ERRORS: CounterVec = CounterVec::new(
        Opts::new("sj_stage_errors_total", "Errors by stage and type"),
        &["stage", "error_type"]
    ).expect("metric creation failed");
}

/// Handle to the registry the metrics were registered with.
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Number of metric families currently exported.
    pub fn family_count(&self) -> usize {
        self.registry.gather().len()
    }
}

/// Register every metric once. Later calls are no-ops.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ingest
        Box::new(RECORDS_INGESTED.clone()),
        Box::new(TIMESTAMP_FALLBACKS.clone()),
        // Routing
        Box::new(RECORDS_ROUTED.clone()),
        Box::new(RECORDS_UNROUTED.clone()),
        // Join
        Box::new(JOINED_RECORDS.clone()),
        Box::new(BUFFER_EVICTIONS.clone()),
        Box::new(BUFFER_REJECTIONS.clone()),
        Box::new(BUFFERED_ENTRIES.clone()),
        Box::new(JOIN_PROBE_DURATION.clone()),
        // View / log
        Box::new(VIEW_KEYS.clone()),
        Box::new(LOG_LENGTH.clone()),
        // Event bus
        Box::new(EVENT_BUS_MESSAGES_SENT.clone()),
        // Errors
        Box::new(STAGE_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Render the registry in the Prometheus text exposition format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Observes the elapsed seconds into its histogram when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Time the rest of the enclosing scope into a histogram.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
