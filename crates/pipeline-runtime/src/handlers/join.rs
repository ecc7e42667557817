//! # Join Worker
//!
//! Each worker exclusively owns both window buffers for its key shard.
//! Ingest workers hand it routed purchases over an mpsc channel; it probes,
//! buffers and publishes joined records on the bus.

use shared_bus::{EventPublisher, StreamEvent};
use shared_types::{CorrelatedPurchase, Event, Purchase, StageId};
use sj_04_windowed_join::{JoinOutcome, JoinSide, PurchaseJoiner, WindowedJoin, WindowedJoinApi};
use sj_telemetry::{
    log_event, metric_add, metric_inc, metric_inc_by, metric_observe, BUFFERED_ENTRIES,
    BUFFER_EVICTIONS, BUFFER_REJECTIONS, EVENT_BUS_MESSAGES_SENT, JOINED_RECORDS,
    JOIN_PROBE_DURATION,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// A routed purchase on its way to the join worker owning its key.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinMessage {
    pub side: JoinSide,
    pub event: Event<Purchase>,
}

/// Shard owning `key` among `shards` join workers.
pub fn shard_for(key: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % shards.max(1) as u64) as usize
}

/// Counters reported when a join worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinWorkerReport {
    pub shard: usize,
    pub left_received: u64,
    pub right_received: u64,
    pub emitted: u64,
    pub rejected: u64,
    pub expired: u64,
    pub overflow_evicted: u64,
    /// Entries still buffered at shutdown and dropped.
    pub released: usize,
}

pub struct JoinWorker<P> {
    shard: usize,
    join: WindowedJoin<Purchase, Purchase, PurchaseJoiner>,
    publisher: Arc<P>,
    report: JoinWorkerReport,
}

impl<P: EventPublisher> JoinWorker<P> {
    pub fn new(
        shard: usize,
        join: WindowedJoin<Purchase, Purchase, PurchaseJoiner>,
        publisher: Arc<P>,
    ) -> Self {
        Self {
            shard,
            join,
            publisher,
            report: JoinWorkerReport {
                shard,
                ..Default::default()
            },
        }
    }

    /// Process messages until every sender is dropped, then release the
    /// buffers.
    pub async fn run(mut self, mut input: mpsc::Receiver<JoinMessage>) -> JoinWorkerReport {
        log_event!(debug, StageId::WindowedJoin, "Join worker started", shard = self.shard);

        while let Some(message) = input.recv().await {
            self.handle(message).await;
        }

        let left = self.join.buffered(JoinSide::Left);
        let right = self.join.buffered(JoinSide::Right);
        metric_add!(BUFFERED_ENTRIES, &[JoinSide::Left.as_str()], -(left as f64));
        metric_add!(BUFFERED_ENTRIES, &[JoinSide::Right.as_str()], -(right as f64));
        self.report.released = self.join.shutdown();

        log_event!(
            info,
            StageId::WindowedJoin,
            "Join worker drained",
            shard = self.shard,
            emitted = self.report.emitted,
            released = self.report.released
        );
        self.report
    }

    async fn handle(&mut self, message: JoinMessage) {
        let outcome = match message.side {
            JoinSide::Left => {
                self.report.left_received += 1;
                self.join.on_left(message.event)
            }
            JoinSide::Right => {
                self.report.right_received += 1;
                self.join.on_right(message.event)
            }
        };

        self.record(&outcome);

        for joined in outcome.emitted {
            self.publish(joined).await;
        }
    }

    fn record(&mut self, outcome: &JoinOutcome<CorrelatedPurchase>) {
        let side = outcome.side.as_str();

        metric_observe!(JOIN_PROBE_DURATION, outcome.probe_duration.as_secs_f64());

        let mut delta = -((outcome.expired + outcome.overflow_evicted) as f64);
        if outcome.buffered {
            delta += 1.0;
        }
        metric_add!(BUFFERED_ENTRIES, &[side], delta);

        if outcome.expired > 0 {
            self.report.expired += outcome.expired as u64;
            metric_inc_by!(BUFFER_EVICTIONS, &[side, "expired"], outcome.expired as f64);
        }
        if outcome.overflow_evicted > 0 {
            self.report.overflow_evicted += outcome.overflow_evicted as u64;
            metric_inc_by!(BUFFER_EVICTIONS, &[side, "overflow"], outcome.overflow_evicted as f64);
        }
        if let Some(err) = &outcome.rejected {
            self.report.rejected += 1;
            metric_inc!(BUFFER_REJECTIONS, &[side]);
            log_event!(debug, StageId::WindowedJoin, "Purchase not buffered", side = side, error = %err);
        }
    }

    async fn publish(&mut self, joined: Event<CorrelatedPurchase>) {
        trace!(
            shard = self.shard,
            key = %joined.key,
            event_time = joined.event_time,
            "Joined record"
        );
        self.report.emitted += 1;
        metric_inc!(JOINED_RECORDS);

        let event = StreamEvent::Joined(joined);
        metric_inc!(EVENT_BUS_MESSAGES_SENT, &[event.topic().as_str()]);
        self.publisher.publish(event).await;
    }
}
