//! Work distribution: feeds the catalog into the bounded work channel.

use crate::types::{AssetCatalog, AssetDescriptor};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Push every asset of `catalog`, in order, into `work`
///
/// Suspends while the channel is full. The channel is closed when this returns
/// (the sender is dropped), which is what lets idle workers exit. Returns the
/// number of assets handed out, which equals the catalog length unless the run
/// was cancelled or every worker has gone away.
pub(crate) async fn run_distributor(
    catalog: Arc<AssetCatalog>,
    work: mpsc::Sender<AssetDescriptor>,
    cancel: CancellationToken,
) -> usize {
    let mut sent = 0;
    for asset in catalog.iter() {
        let delivered = tokio::select! {
            result = work.send(asset.clone()) => result.is_ok(),
            _ = cancel.cancelled() => false,
        };
        if !delivered {
            tracing::debug!(sent, total = catalog.len(), "Distribution stopped early");
            return sent;
        }
        sent += 1;
    }
    tracing::debug!(sent, "All assets queued");
    sent
}
