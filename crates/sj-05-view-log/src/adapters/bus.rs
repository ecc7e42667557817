//! # Bus Consumers
//!
//! Two independent lossless subscriptions to the stock-ticker topic:
//!
//! ```text
//!                     ┌──► [queue A] ──► MaterializedView (latest per symbol)
//! [Event Bus] ────────┤
//!   StockTicker       └──► [queue B] ──► EventLog (every tick, in order)
//! ```
//!
//! Each queue is bounded by the bus capacity; a consumer that falls behind
//! holds the ticker worker back rather than losing ticks. The two never
//! coordinate. Each one drains what is already queued once shutdown is
//! signalled, then stops.

use parking_lot::RwLock;
use shared_bus::{EventFilter, EventSubscriber, EventTopic, StreamEvent, Subscription};
use shared_types::StockTicker;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{EventLog, MaterializedView};
use crate::ports::StreamConsumer;

pub type SharedView<V> = Arc<RwLock<MaterializedView<V>>>;
pub type SharedLog<V> = Arc<RwLock<EventLog<V>>>;

/// Counts reported once both consumers have stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewLogReport {
    pub view_updates: u64,
    pub view_keys: usize,
    pub log_length: usize,
}

/// Running view and log consumers over the stock-ticker topic.
pub struct ViewLogConsumer {
    view: SharedView<StockTicker>,
    log: SharedLog<StockTicker>,
    view_task: JoinHandle<u64>,
    log_task: JoinHandle<u64>,
}

impl ViewLogConsumer {
    /// Subscribe twice, losslessly, and spawn one task per subscription.
    ///
    /// Must be called inside a tokio runtime. Only ticks published after this
    /// call are observed.
    pub fn start<B>(bus: &B, shutdown: watch::Receiver<bool>) -> Self
    where
        B: EventSubscriber + ?Sized,
    {
        let filter = EventFilter::topics(vec![EventTopic::StockTicker]);
        let view = Arc::new(RwLock::new(MaterializedView::new()));
        let log = Arc::new(RwLock::new(EventLog::new()));

        let view_task = spawn_consumer(
            bus.subscribe_lossless(filter.clone()),
            shutdown.clone(),
            view.clone(),
        );
        let log_task = spawn_consumer(bus.subscribe_lossless(filter), shutdown, log.clone());

        info!("View and log consumers started");
        Self {
            view,
            log,
            view_task,
            log_task,
        }
    }

    pub fn view(&self) -> SharedView<StockTicker> {
        self.view.clone()
    }

    pub fn log(&self) -> SharedLog<StockTicker> {
        self.log.clone()
    }

    /// Wait for both consumers to stop.
    pub async fn join(self) -> ViewLogReport {
        let view_updates = match self.view_task.await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "View consumer task failed");
                0
            }
        };
        if let Err(e) = self.log_task.await {
            warn!(error = %e, "Log consumer task failed");
        }

        let report = ViewLogReport {
            view_updates,
            view_keys: self.view.read().len(),
            log_length: self.log.read().len(),
        };
        info!(
            view_keys = report.view_keys,
            log_length = report.log_length,
            "View and log consumers stopped"
        );
        report
    }
}

fn spawn_consumer<C>(
    mut subscription: Subscription,
    mut shutdown: watch::Receiver<bool>,
    target: Arc<RwLock<C>>,
) -> JoinHandle<u64>
where
    C: StreamConsumer<StockTicker> + Sync + 'static,
{
    tokio::spawn(async move {
        let kind = target.read().kind();
        let mut consumed = 0u64;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => consumed += u64::from(deliver(&target, event)),
                    None => return consumed,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        // Whatever was published before the stop signal is still ours
        while let Ok(Some(event)) = subscription.try_recv() {
            consumed += u64::from(deliver(&target, event));
        }
        debug!(consumer = kind, consumed, "Consumer drained");
        consumed
    })
}

fn deliver<C>(target: &RwLock<C>, event: StreamEvent) -> bool
where
    C: StreamConsumer<StockTicker>,
{
    match event {
        StreamEvent::StockTick(tick) => {
            target.write().consume(tick);
            true
        }
        _ => false,
    }
}
