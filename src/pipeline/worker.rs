//! Download workers: pull assets, fetch them, report completions.

use crate::error::{Error, Result};
use crate::fetcher::AssetFetcher;
use crate::types::{AssetDescriptor, Completion};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Receiving end of the work channel, shared by every worker
pub(crate) type SharedWorkQueue = Arc<Mutex<mpsc::Receiver<AssetDescriptor>>>;

/// Everything one worker needs
pub(crate) struct Worker {
    pub(crate) index: usize,
    pub(crate) fetcher: Arc<dyn AssetFetcher>,
    pub(crate) work: SharedWorkQueue,
    pub(crate) completions: mpsc::Sender<Completion>,
    pub(crate) cancel: CancellationToken,
}

impl Worker {
    /// Process assets until the work channel is drained or the run is cancelled
    ///
    /// A fetch failure cancels the whole run and is returned as [`Error::Fetch`].
    /// Returns the number of assets this worker completed.
    pub(crate) async fn run(self) -> Result<usize> {
        let mut processed = 0;

        loop {
            let next = tokio::select! {
                asset = next_asset(&self.work) => asset,
                _ = self.cancel.cancelled() => None,
            };
            let Some(asset) = next else {
                break;
            };

            let outcome = tokio::select! {
                outcome = self.fetcher.fetch(&asset) => outcome,
                _ = self.cancel.cancelled() => break,
            };

            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(source) => {
                    tracing::error!(
                        worker = self.index,
                        asset_id = %asset.asset_id,
                        error = %source,
                        "Failed to handle asset"
                    );
                    self.cancel.cancel();
                    return Err(Error::Fetch {
                        asset_id: asset.asset_id,
                        source,
                    });
                }
            };

            let sent = tokio::select! {
                result = self.completions.send(Completion { asset, outcome }) => result.is_ok(),
                _ = self.cancel.cancelled() => false,
            };
            if !sent {
                break;
            }
            processed += 1;
        }

        tracing::debug!(worker = self.index, processed, "Worker finished");
        Ok(processed)
    }
}

// The lock is held only while waiting for the next item, so each asset goes to exactly one worker
async fn next_asset(work: &SharedWorkQueue) -> Option<AssetDescriptor> {
    work.lock().await.recv().await
}
