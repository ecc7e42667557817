//! # Pumping Sources Into the Pipeline
//!
//! `pump` drains a `RecordSource` into a `RecordSink`, one batch per tick of
//! a `tokio::time::interval`, and stops early once the shutdown flag is set
//! or the sink refuses records.

use async_trait::async_trait;
use shared_types::SourceRecord;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::producer::RecordSource;
use crate::wiring::PipelineError;

/// Anything that accepts source records.
#[async_trait]
pub trait RecordSink<P>: Send + Sync {
    /// # Errors
    ///
    /// `PipelineError::Stopped` once input is closed.
    async fn submit(&self, record: SourceRecord<P>) -> Result<(), PipelineError>;
}

/// Feed `source` into `sink`. Returns the number of records accepted.
pub async fn pump<P, S, K>(
    name: &'static str,
    mut source: S,
    sink: &K,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> u64
where
    P: Send + 'static,
    S: RecordSource<P>,
    K: RecordSink<P> + ?Sized,
{
    // A zero period would panic in `interval`
    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut accepted = 0u64;

    'batches: loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let Some(batch) = source.next_batch() else {
            break;
        };
        let size = batch.len();
        for record in batch {
            if sink.submit(record).await.is_err() {
                debug!(source = name, "Sink closed, pump stopping");
                break 'batches;
            }
            accepted += 1;
        }
        debug!(source = name, records = size, remaining = source.remaining(), "Batch submitted");
    }

    info!(source = name, accepted, "Source finished");
    accepted
}
