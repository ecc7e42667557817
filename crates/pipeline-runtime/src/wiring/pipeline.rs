//! # Pipeline Lifecycle
//!
//! Starts every worker, accepts records while `Running`, and drains
//! everything on shutdown:
//!
//! ```text
//!  submit_purchase ─► [ingest partition 0..P] ─┬─► [join shard 0..J] ─► bus: JoinedOutput
//!                                              └─► ...
//!  submit_tick ─────► [ticker worker] ─► bus: StockTicker ─┬─► view consumer
//!                                                          └─► log consumer
//! ```
//!
//! ## Shutdown Order
//!
//! 1. State moves to `Draining`; the source signal fires so pumps stop.
//! 2. Input senders are dropped. Ingest workers finish their queues.
//! 3. Ingest workers exit, dropping their shard senders, so join workers
//!    finish, publish what is left and release their buffers.
//! 4. The ticker worker finishes, then the view and log consumers drain
//!    their queues and stop. Their bus subscriptions are lossless, so every
//!    published tick reaches both.
//! 5. State moves to `Stopped`.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::InMemoryEventBus;
use shared_types::{PipelineState, Purchase, SourceRecord, StageId, StockTicker};
use sj_01_event_time::{SequenceGenerator, SystemTimeSource, TimeSource};
use sj_04_windowed_join::{JoinError, WindowedJoin};
use sj_05_view_log::{SharedLog, SharedView, ViewLogConsumer, ViewLogReport};
use sj_telemetry::{metric_inc, STAGE_ERRORS};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::PurchaseTopology;
use crate::adapters::RecordSink;
use crate::container::{ConfigError, PipelineConfig};
use crate::handlers::{
    policy_assigner, record_view_report, IngestReport, IngestWorker, JoinMessage, JoinWorker,
    JoinWorkerReport, TickerReport, TickerWorker,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline is not accepting records")]
    Stopped,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Topology(#[from] super::TopologyError),

    #[error(transparent)]
    Join(#[from] JoinError),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

/// What every worker reported on its way out.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub ingest: Vec<IngestReport>,
    pub joins: Vec<JoinWorkerReport>,
    pub tickers: TickerReport,
    pub views: ViewLogReport,
}

impl PipelineReport {
    pub fn total_ingested(&self) -> u64 {
        self.ingest.iter().map(|r| r.records).sum()
    }

    pub fn total_unrouted(&self) -> u64 {
        self.ingest.iter().map(|r| r.unrouted).sum()
    }

    pub fn total_joined(&self) -> u64 {
        self.joins.iter().map(|r| r.emitted).sum()
    }

    /// Buffered entries dropped at shutdown.
    pub fn released(&self) -> usize {
        self.joins.iter().map(|r| r.released).sum()
    }
}

struct Inputs {
    purchases: Vec<mpsc::Sender<SourceRecord<Purchase>>>,
    tickers: mpsc::Sender<SourceRecord<StockTicker>>,
}

struct Workers {
    ingest: Vec<JoinHandle<IngestReport>>,
    joins: Vec<JoinHandle<JoinWorkerReport>>,
    ticker: JoinHandle<TickerReport>,
    views: ViewLogConsumer,
}

/// A running pipeline.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    bus: Arc<InMemoryEventBus>,
    state: RwLock<PipelineState>,
    sources_tx: watch::Sender<bool>,
    consumers_tx: watch::Sender<bool>,
    inputs: Mutex<Option<Inputs>>,
    workers: Mutex<Option<Workers>>,
    view: SharedView<StockTicker>,
    log: SharedLog<StockTicker>,
}

impl Pipeline {
    /// Start on the system clock. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// `PipelineError` if the configuration is invalid.
    pub fn start(
        config: PipelineConfig,
        topology: PurchaseTopology,
        bus: Arc<InMemoryEventBus>,
    ) -> Result<Self, PipelineError> {
        Self::start_with_clock(config, topology, bus, SystemTimeSource)
    }

    /// Start with an explicit ingestion clock.
    ///
    /// # Errors
    ///
    /// `PipelineError` if the configuration is invalid.
    pub fn start_with_clock<T>(
        config: PipelineConfig,
        topology: PurchaseTopology,
        bus: Arc<InMemoryEventBus>,
        clock: T,
    ) -> Result<Self, PipelineError>
    where
        T: TimeSource + Clone + 'static,
    {
        config.validate()?;
        let config = Arc::new(config);
        let topology = Arc::new(topology);
        let sequence = Arc::new(SequenceGenerator::new());
        let capacity = config.channel_capacity;

        let (sources_tx, _) = watch::channel(false);
        let (consumers_tx, consumers_rx) = watch::channel(false);

        // Subscribe before any tick can be published
        let views = ViewLogConsumer::start(bus.as_ref(), consumers_rx);
        let (view, log) = (views.view(), views.log());

        let mut shard_senders = Vec::with_capacity(config.join_workers);
        let mut joins = Vec::with_capacity(config.join_workers);
        for shard in 0..config.join_workers {
            let (tx, rx) = mpsc::channel::<JoinMessage>(capacity);
            let join = WindowedJoin::new(config.join_config(), topology.joiner)?;
            joins.push(tokio::spawn(JoinWorker::new(shard, join, bus.clone()).run(rx)));
            shard_senders.push(tx);
        }

        let mut purchases = Vec::with_capacity(config.partitions as usize);
        let mut ingest = Vec::with_capacity(config.partitions as usize);
        for partition in 0..config.partitions {
            let (tx, rx) = mpsc::channel(capacity);
            let assigner = policy_assigner(config.timestamp_policy, clock.clone(), sequence.clone());
            let worker = IngestWorker::new(partition, assigner, topology.clone(), shard_senders.clone());
            ingest.push(tokio::spawn(worker.run(rx)));
            purchases.push(tx);
        }
        // Ingest workers now hold the only shard senders
        drop(shard_senders);

        let (tickers, ticker_rx) = mpsc::channel(capacity);
        let ticker = tokio::spawn(TickerWorker::new(clock, sequence, bus.clone()).run(ticker_rx));

        info!(
            partitions = config.partitions,
            join_workers = config.join_workers,
            window_ms = config.window_ms,
            retention_ms = config.retention_ms,
            policy = %config.timestamp_policy,
            "Pipeline started"
        );

        Ok(Self {
            config,
            bus,
            state: RwLock::new(PipelineState::Running),
            sources_tx,
            consumers_tx,
            inputs: Mutex::new(Some(Inputs { purchases, tickers })),
            workers: Mutex::new(Some(Workers {
                ingest,
                joins,
                ticker,
                views,
            })),
            view,
            log,
        })
    }

    pub fn state(&self) -> PipelineState {
        *self.state.read()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        self.bus.clone()
    }

    /// Flips to `true` when shutdown begins. Sources should stop then.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.sources_tx.subscribe()
    }

    /// Latest price per symbol.
    pub fn view(&self) -> SharedView<StockTicker> {
        self.view.clone()
    }

    /// Every tick in arrival order.
    pub fn log(&self) -> SharedLog<StockTicker> {
        self.log.clone()
    }

    /// Hand a purchase to the ingest worker of its partition.
    ///
    /// # Errors
    ///
    /// `PipelineError::Stopped` once shutdown has begun.
    pub async fn submit_purchase(&self, record: SourceRecord<Purchase>) -> Result<(), PipelineError> {
        let sender = {
            let inputs = self.inputs.lock();
            let inputs = inputs.as_ref().ok_or(PipelineError::Stopped)?;
            let index = record.partition as usize % inputs.purchases.len();
            inputs.purchases[index].clone()
        };
        sender.send(record).await.map_err(|_| PipelineError::Stopped)
    }

    /// # Errors
    ///
    /// `PipelineError::Stopped` once shutdown has begun.
    pub async fn submit_tick(&self, record: SourceRecord<StockTicker>) -> Result<(), PipelineError> {
        let sender = {
            let inputs = self.inputs.lock();
            inputs.as_ref().ok_or(PipelineError::Stopped)?.tickers.clone()
        };
        sender.send(record).await.map_err(|_| PipelineError::Stopped)
    }

    /// Drain and stop every worker. Only the first call does any work.
    ///
    /// # Errors
    ///
    /// `PipelineError::Stopped` if already shut down, `WorkerFailed` if a
    /// worker task panicked. The pipeline ends `Stopped` either way.
    pub async fn shutdown(&self) -> Result<PipelineReport, PipelineError> {
        let Some(workers) = self.workers.lock().take() else {
            return Err(PipelineError::Stopped);
        };

        *self.state.write() = PipelineState::Draining;
        info!("Pipeline draining");
        let _ = self.sources_tx.send(true);
        drop(self.inputs.lock().take());

        let mut report = PipelineReport::default();
        let mut failures = Vec::new();

        for handle in workers.ingest {
            match handle.await {
                Ok(r) => report.ingest.push(r),
                Err(e) => failures.push(worker_failed(StageId::EventTime, "ingest", &e)),
            }
        }
        for handle in workers.joins {
            match handle.await {
                Ok(r) => report.joins.push(r),
                Err(e) => failures.push(worker_failed(StageId::WindowedJoin, "join", &e)),
            }
        }
        match workers.ticker.await {
            Ok(r) => report.tickers = r,
            Err(e) => failures.push(worker_failed(StageId::ViewLog, "ticker", &e)),
        }

        let _ = self.consumers_tx.send(true);
        report.views = workers.views.join().await;
        record_view_report(&report.views);

        *self.state.write() = PipelineState::Stopped;
        info!(
            ingested = report.total_ingested(),
            joined = report.total_joined(),
            released = report.released(),
            view_keys = report.views.view_keys,
            log_length = report.views.log_length,
            "Pipeline stopped"
        );

        match failures.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(report),
        }
    }
}

fn worker_failed(stage: StageId, worker: &str, err: &tokio::task::JoinError) -> PipelineError {
    error!(stage = stage.as_str(), worker, error = %err, "Worker task failed");
    metric_inc!(STAGE_ERRORS, &[stage.as_str(), "worker_failed"]);
    PipelineError::WorkerFailed(format!("{worker}: {err}"))
}

#[async_trait]
impl RecordSink<Purchase> for Pipeline {
    async fn submit(&self, record: SourceRecord<Purchase>) -> Result<(), PipelineError> {
        self.submit_purchase(record).await
    }
}

#[async_trait]
impl RecordSink<StockTicker> for Pipeline {
    async fn submit(&self, record: SourceRecord<StockTicker>) -> Result<(), PipelineError> {
        self.submit_tick(record).await
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.workers.get_mut().is_some() {
            warn!("Pipeline dropped without shutdown; workers abandoned");
        }
    }
}
