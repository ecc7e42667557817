//! # StreamJoin Pipeline
//!
//! Runs the correlated-purchases pipeline against seeded sample sources.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logs, metric registry)
//! 2. Load and validate the pipeline configuration
//! 3. Serve `/metrics` if a port is configured
//! 4. Start the pipeline and its sample sources
//! 5. Run until the sources finish or Ctrl+C, then drain

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, StreamEvent};
use sj_01_event_time::{SystemTimeSource, TimeSource};
use sj_telemetry::{bind_metrics, init_telemetry, serve_metrics, TelemetryConfig};
use tokio::sync::watch;
use tracing::{error, info, warn};

use pipeline_runtime::handlers::refresh_view_metrics;
use pipeline_runtime::{pump, MockPurchaseSource, MockTickerSource, Pipeline, PipelineConfig, PurchaseTopology};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _telemetry = init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    let config = PipelineConfig::from_env();
    config.validate().context("Invalid pipeline configuration")?;

    info!("===========================================");
    info!("  StreamJoin Pipeline v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let (metrics_tx, metrics_rx) = watch::channel(false);
    let metrics_server = if telemetry.metrics_enabled() {
        let listener = bind_metrics(telemetry.metrics_port)
            .await
            .context("Failed to bind metrics endpoint")?;
        Some(tokio::spawn(serve_metrics(listener, metrics_rx)))
    } else {
        None
    };

    let bus = Arc::new(InMemoryEventBus::with_capacity(config.channel_capacity));
    let joined_logger = spawn_joined_logger(&bus, metrics_tx.subscribe());

    let topology = PurchaseTopology::correlated_purchases()?;
    let pipeline = Arc::new(Pipeline::start(config.clone(), topology, bus)?);
    let gauges = spawn_gauge_refresh(&pipeline, metrics_tx.subscribe());

    let start_ms = SystemTimeSource.now();
    let purchases = {
        let pipeline = Arc::clone(&pipeline);
        let source = MockPurchaseSource::new(config.producer.clone(), config.partitions, start_ms);
        let period = Duration::from_millis(config.producer.batch_interval_ms);
        let signal = pipeline.shutdown_signal();
        tokio::spawn(async move { pump("purchases", source, pipeline.as_ref(), period, signal).await })
    };
    let tickers = {
        let pipeline = Arc::clone(&pipeline);
        let source = MockTickerSource::new(&config.tickers, config.producer.seed);
        let period = Duration::from_millis(config.tickers.interval_ms);
        let signal = pipeline.shutdown_signal();
        tokio::spawn(async move { pump("tickers", source, pipeline.as_ref(), period, signal).await })
    };

    info!("Pipeline is running. Press Ctrl+C to stop.");
    let sources = async {
        let (p, t) = tokio::join!(purchases, tickers);
        if let Err(e) = p {
            error!(error = %e, "Purchase source failed");
        }
        if let Err(e) = t {
            error!(error = %e, "Ticker source failed");
        }
    };
    tokio::select! {
        _ = sources => info!("Sample sources exhausted"),
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Ctrl+C received");
        }
    }

    let report = pipeline.shutdown().await;

    let _ = metrics_tx.send(true);
    let _ = gauges.await;
    let _ = joined_logger.await;
    if let Some(server) = metrics_server {
        let _ = server.await;
    }

    let report = report?;
    info!(
        ingested = report.total_ingested(),
        unrouted = report.total_unrouted(),
        joined = report.total_joined(),
        released = report.released(),
        ticks = report.tickers.ticks,
        view_keys = report.views.view_keys,
        log_length = report.views.log_length,
        "Shutdown complete"
    );
    Ok(())
}

/// Log every joined record until shutdown, then whatever is still queued.
fn spawn_joined_logger(
    bus: &InMemoryEventBus,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let mut joined = bus.subscribe(EventFilter::topics(vec![EventTopic::JoinedOutput]));
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = joined.recv() => match event {
                    Some(event) => log_joined(&event),
                    None => return,
                },
                _ = shutdown.changed() => break,
            }
        }
        while let Ok(Some(event)) = joined.try_recv() {
            log_joined(&event);
        }
    })
}

fn log_joined(event: &StreamEvent) {
    if let StreamEvent::Joined(event) = event {
        info!(
            customer = %event.payload.customer_id,
            items = ?event.payload.items_purchased,
            total = event.payload.total_amount,
            event_time = event.event_time,
            "Correlated purchase"
        );
    }
}

/// Keep the view and log gauges current while running.
fn spawn_gauge_refresh(
    pipeline: &Pipeline,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let (view, log) = (pipeline.view(), pipeline.log());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => refresh_view_metrics(&view, &log),
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Gauge refresh lost its shutdown signal");
                    }
                    break;
                }
            }
        }
    })
}
