//! # Ingest Worker
//!
//! One worker per input partition. Records are handled strictly in arrival
//! order: assign event time, transform, route, then hand routed purchases to
//! the join worker owning their key.

use shared_types::{Purchase, SourceRecord, StageId};
use sj_01_event_time::{
    EventTimeApi, EventTimeAssigner, PolicyExtractor, SequenceGenerator, TimeSource,
    TimestampPolicy,
};
use sj_02_record_transform::RecordTransformApi;
use sj_03_branch_router::Route;
use sj_telemetry::{
    log_event, log_record_event, metric_inc, RECORDS_INGESTED, RECORDS_ROUTED, RECORDS_UNROUTED,
    STAGE_ERRORS, TIMESTAMP_FALLBACKS,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::join::{shard_for, JoinMessage};
use crate::wiring::PurchaseTopology;

/// Counters reported when an ingest worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub partition: u32,
    pub records: u64,
    pub fallbacks: u64,
    pub routed: u64,
    pub unrouted: u64,
    /// Routed into a category that feeds neither join input.
    pub unjoined: u64,
    /// Join worker had already stopped.
    pub undelivered: u64,
}

pub struct IngestWorker<A> {
    partition: u32,
    assigner: A,
    topology: Arc<PurchaseTopology>,
    shards: Vec<mpsc::Sender<JoinMessage>>,
    report: IngestReport,
}

impl<A> IngestWorker<A>
where
    A: EventTimeApi<Purchase>,
{
    pub fn new(
        partition: u32,
        assigner: A,
        topology: Arc<PurchaseTopology>,
        shards: Vec<mpsc::Sender<JoinMessage>>,
    ) -> Self {
        Self {
            partition,
            assigner,
            topology,
            shards,
            report: IngestReport {
                partition,
                ..Default::default()
            },
        }
    }

    /// Process records until the input closes. Dropping the worker's shard
    /// senders on return lets the join workers finish.
    pub async fn run(mut self, mut input: mpsc::Receiver<SourceRecord<Purchase>>) -> IngestReport {
        log_event!(debug, StageId::EventTime, "Ingest worker started", partition = self.partition);

        while let Some(record) = input.recv().await {
            self.handle(record).await;
        }

        log_event!(
            info,
            StageId::EventTime,
            "Ingest worker drained",
            partition = self.partition,
            records = self.report.records,
            unrouted = self.report.unrouted
        );
        self.report
    }

    async fn handle(&mut self, record: SourceRecord<Purchase>) {
        self.report.records += 1;
        metric_inc!(RECORDS_INGESTED, &["purchases"]);

        let assignment = self.assigner.assign(record);
        if let Some(fallback) = assignment.fallback {
            self.report.fallbacks += 1;
            metric_inc!(TIMESTAMP_FALLBACKS, &[fallback.as_str()]);
        }

        let event = self.topology.transforms.transform(assignment.event);

        let category = match self.topology.router.route(&event) {
            Route::Category(category) => category,
            Route::Unrouted => {
                self.report.unrouted += 1;
                metric_inc!(RECORDS_UNROUTED);
                log_record_event!(trace, StageId::BranchRouter, "Unrouted", event.key, event.event_time);
                return;
            }
        };
        self.report.routed += 1;
        metric_inc!(RECORDS_ROUTED, &[&*category.name]);

        let Some(side) = self.topology.side_of(&category) else {
            self.report.unjoined += 1;
            return;
        };

        let shard = shard_for(&event.key, self.shards.len());
        let message = JoinMessage { side, event };
        if self.shards[shard].send(message).await.is_err() {
            self.report.undelivered += 1;
            metric_inc!(STAGE_ERRORS, &[StageId::BranchRouter.as_str(), "join_worker_gone"]);
            log_event!(warn, StageId::BranchRouter, "Join worker gone, purchase dropped", shard = shard);
        }
    }
}

/// Stamp, transform and route one partition's records with a policy-driven
/// assigner.
pub type PolicyIngestWorker<T> = IngestWorker<EventTimeAssigner<PolicyExtractor<T>, T>>;

/// Build the assigner an ingest worker uses for `policy`.
pub fn policy_assigner<T>(
    policy: TimestampPolicy,
    clock: T,
    sequence: Arc<SequenceGenerator>,
) -> EventTimeAssigner<PolicyExtractor<T>, T>
where
    T: TimeSource + Clone,
{
    EventTimeAssigner::new(
        PolicyExtractor::new(policy, clock.clone()),
        clock,
        sequence,
    )
}
