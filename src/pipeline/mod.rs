//! The download pipeline, split into its concurrent stages.
//!
//! - [`distributor`] - feeds catalog assets into the bounded work channel
//! - [`worker`] - N workers fetching assets and reporting completions
//! - [`progress`] - the single aggregator that counts completions and decides when the run is done
//!
//! [`run_pipeline`] owns every task it spawns and awaits all of them before
//! returning, whichever way the run ends.

mod distributor;
pub mod progress;
mod worker;

pub use progress::{ProgressReport, ProgressState};

use crate::error::{Error, Result};
use crate::fetcher::AssetFetcher;
use crate::types::{AssetCatalog, RunSummary};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use worker::Worker;

/// Capacity of the channel between the distributor and the workers
///
/// Kept tiny so at most `concurrency + 1` assets are in flight at once.
pub const WORK_CHANNEL_CAPACITY: usize = 1;

/// Capacity of the channel between the workers and the aggregator
pub const COMPLETION_CHANNEL_CAPACITY: usize = 1;

/// Download every asset of `catalog` with `concurrency` workers
///
/// Returns the final summary once exactly `catalog.len()` completions were
/// observed. The first fetch failure cancels `cancel` and becomes the result of
/// the run; files already written stay on disk.
pub async fn run_pipeline(
    catalog: Arc<AssetCatalog>,
    fetcher: Arc<dyn AssetFetcher>,
    concurrency: usize,
    progress_interval: Duration,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    if concurrency == 0 {
        return Err(Error::config("concurrency", "must be at least 1"));
    }

    let (work_tx, work_rx) = mpsc::channel(WORK_CHANNEL_CAPACITY);
    let (done_tx, done_rx) = mpsc::channel(COMPLETION_CHANNEL_CAPACITY);
    let work = Arc::new(Mutex::new(work_rx));

    let distributor = tokio::spawn(distributor::run_distributor(
        catalog.clone(),
        work_tx,
        cancel.clone(),
    ));

    let mut workers = tokio::task::JoinSet::new();
    for index in 0..concurrency {
        let worker = Worker {
            index,
            fetcher: fetcher.clone(),
            work: work.clone(),
            completions: done_tx.clone(),
            cancel: cancel.clone(),
        };
        workers.spawn(worker.run());
    }
    // Workers hold the only remaining senders
    drop(done_tx);

    let aggregator = tokio::spawn(progress::run_aggregator(
        ProgressState::new(catalog.len(), catalog.total_size()),
        done_rx,
        progress_interval,
        cancel.clone(),
    ));

    let aggregated = aggregator.await;
    if aggregated.is_err() {
        // Without the aggregator nobody drains completions
        cancel.cancel();
    }

    let mut first_failure: Option<Error> = None;
    while let Some(joined) = workers.join_next().await {
        let failure = match joined {
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => e,
            Err(e) => {
                cancel.cancel();
                Error::Task(e)
            }
        };
        if first_failure.is_none() {
            first_failure = Some(failure);
        }
    }
    let distributed = distributor.await?;
    tracing::debug!(distributed, total = catalog.len(), "Pipeline tasks joined");

    if let Some(failure) = first_failure {
        return Err(failure);
    }
    aggregated?
}
