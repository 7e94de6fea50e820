//! Progress aggregation: the single consumer of the completion channel.

use crate::error::{Error, Result};
use crate::types::{Completion, RunSummary};
use crate::utils::{format_bytes, percent};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Running totals of a dump, owned by the aggregator task
#[derive(Clone, Debug)]
pub struct ProgressState {
    total_assets: usize,
    total_bytes: u64,
    completed_assets: usize,
    completed_bytes: u64,
    downloaded: usize,
    skipped: usize,
    bytes_written: u64,
}

impl ProgressState {
    /// Start tracking a catalog of `total_assets` assets weighing `total_bytes`
    pub fn new(total_assets: usize, total_bytes: u64) -> Self {
        Self {
            total_assets,
            total_bytes,
            completed_assets: 0,
            completed_bytes: 0,
            downloaded: 0,
            skipped: 0,
            bytes_written: 0,
        }
    }

    /// Account for one finished asset
    pub fn record(&mut self, completion: &Completion) {
        self.completed_assets += 1;
        self.completed_bytes += completion.asset.bytes;
        if completion.outcome.is_skipped() {
            self.skipped += 1;
        } else {
            self.downloaded += 1;
            self.bytes_written += completion.outcome.bytes_written();
        }
    }

    /// Whether every asset of the catalog has been accounted for
    pub fn is_complete(&self) -> bool {
        self.completed_assets >= self.total_assets
    }

    /// Snapshot suitable for a progress line
    pub fn report(&self) -> ProgressReport {
        let completed = self.completed_assets.min(self.total_assets);
        ProgressReport {
            percent: percent(completed, self.total_assets),
            completed,
            total: self.total_assets,
            completed_bytes: self.completed_bytes,
            total_bytes: self.total_bytes,
        }
    }

    /// Final tally
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_assets: self.total_assets,
            completed_assets: self.completed_assets,
            total_bytes: self.total_bytes,
            completed_bytes: self.completed_bytes,
            downloaded: self.downloaded,
            skipped: self.skipped,
            bytes_written: self.bytes_written,
        }
    }
}

/// One progress line
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressReport {
    /// Completed share of assets, `0.0..=100.0`
    pub percent: f64,
    /// Assets accounted for, never above `total`
    pub completed: usize,
    /// Assets in the catalog
    pub total: usize,
    /// Catalog-reported bytes of completed assets
    pub completed_bytes: u64,
    /// Catalog-reported bytes of all assets
    pub total_bytes: u64,
}

impl std::fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Completed {:.1}%. Downloaded {}/{} files, {}/{}",
            self.percent,
            self.completed,
            self.total,
            format_bytes(self.completed_bytes),
            format_bytes(self.total_bytes),
        )
    }
}

/// Consume completions until every asset of the catalog is accounted for
///
/// Emits at most one progress line per `interval` while assets are pending. The
/// final line, logged once the last asset is accounted for, is exempt from the
/// throttle and may follow the previous line sooner than `interval`. Reaching `state`'s total is the only way to succeed: if the channel closes or
/// `cancel` fires first the run is incomplete and [`Error::Cancelled`] is returned.
pub(crate) async fn run_aggregator(
    mut state: ProgressState,
    mut completions: mpsc::Receiver<Completion>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let mut last_emit = Instant::now();

    while !state.is_complete() {
        let completion = tokio::select! {
            completion = completions.recv() => completion,
            _ = cancel.cancelled() => None,
        };
        let Some(completion) = completion else {
            let report = state.report();
            tracing::warn!(
                completed = report.completed,
                total = report.total,
                "Stopped before all assets were processed"
            );
            return Err(Error::Cancelled);
        };

        state.record(&completion);

        if last_emit.elapsed() >= interval && !state.is_complete() {
            tracing::info!("{}", state.report());
            last_emit = Instant::now();
        }
    }

    tracing::info!("{}", state.report());
    Ok(state.summary())
}
