//! # Stock Ticker Handlers
//!
//! Ticks are stamped with the ingestion clock, keyed by symbol and published
//! on the bus, where the view and log consumers pick them up independently.

use shared_bus::{EventPublisher, StreamEvent};
use shared_types::{SourceRecord, StageId, StockTicker};
use sj_01_event_time::{EventTimeApi, EventTimeAssigner, IngestionClockExtractor, SequenceGenerator, TimeSource};
use sj_05_view_log::{SharedLog, SharedView, ViewLogReport};
use sj_telemetry::{log_event, metric_inc, EVENT_BUS_MESSAGES_SENT, LOG_LENGTH, RECORDS_INGESTED, VIEW_KEYS};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Counters reported when the ticker worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickerReport {
    pub ticks: u64,
    pub published: u64,
}

pub struct TickerWorker<P, T> {
    assigner: EventTimeAssigner<IngestionClockExtractor<T>, T>,
    publisher: Arc<P>,
    report: TickerReport,
}

impl<P, T> TickerWorker<P, T>
where
    P: EventPublisher,
    T: TimeSource + Clone,
{
    pub fn new(clock: T, sequence: Arc<SequenceGenerator>, publisher: Arc<P>) -> Self {
        Self {
            assigner: EventTimeAssigner::new(
                IngestionClockExtractor::new(clock.clone()),
                clock,
                sequence,
            ),
            publisher,
            report: TickerReport::default(),
        }
    }

    pub async fn run(mut self, mut input: mpsc::Receiver<SourceRecord<StockTicker>>) -> TickerReport {
        while let Some(record) = input.recv().await {
            self.report.ticks += 1;
            metric_inc!(RECORDS_INGESTED, &["tickers"]);

            let mut event = self.assigner.assign(record).event;
            if event.key.is_empty() {
                event.key = event.payload.symbol.clone();
            }

            let event = StreamEvent::StockTick(event);
            metric_inc!(EVENT_BUS_MESSAGES_SENT, &[event.topic().as_str()]);
            self.publisher.publish(event).await;
            self.report.published += 1;
        }

        log_event!(info, StageId::ViewLog, "Ticker worker drained", ticks = self.report.ticks);
        self.report
    }
}

/// Copy the current view and log sizes into their gauges.
pub fn refresh_view_metrics(view: &SharedView<StockTicker>, log: &SharedLog<StockTicker>) {
    VIEW_KEYS.set(view.read().len() as f64);
    LOG_LENGTH.set(log.read().len() as f64);
}

/// Final gauge values once the consumers have stopped.
pub fn record_view_report(report: &ViewLogReport) {
    VIEW_KEYS.set(report.view_keys as f64);
    LOG_LENGTH.set(report.log_length as f64);
}
