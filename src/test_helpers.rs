//! Shared test helpers: asset builders and in-memory collaborators.

use crate::catalog::CatalogSource;
use crate::error::{EnumerationError, FetchError};
use crate::fetcher::AssetFetcher;
use crate::types::{AssetDescriptor, AssetPage, Completion, FetchOutcome};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// Build an asset whose public ID equals its asset ID
pub(crate) fn asset(id: &str, bytes: u64) -> AssetDescriptor {
    AssetDescriptor {
        asset_id: id.to_string(),
        public_id: id.to_string(),
        bytes,
        secure_url: format!("https://res.example.com/{id}"),
        ..Default::default()
    }
}

/// `asset-0`, `asset-1`, ... with sizes 1, 2, ...
pub(crate) fn numbered_assets(count: usize) -> Vec<AssetDescriptor> {
    (0..count)
        .map(|i| asset(&format!("asset-{i}"), i as u64 + 1))
        .collect()
}

/// A completion for a freshly downloaded asset
pub(crate) fn completion(asset: AssetDescriptor) -> Completion {
    let outcome = FetchOutcome::Downloaded {
        path: PathBuf::from("dump").join(&asset.public_id),
        bytes_written: asset.bytes,
    };
    Completion { asset, outcome }
}

/// Catalog source replaying a fixed sequence of pages
pub(crate) struct MockCatalogSource {
    pages: Mutex<VecDeque<Result<AssetPage, EnumerationError>>>,
    served: Mutex<Vec<usize>>,
    cursors: Mutex<Vec<String>>,
    limits: Mutex<Vec<usize>>,
    hang: bool,
}

impl MockCatalogSource {
    /// Serve exactly these pages, in order
    pub(crate) fn with_pages(pages: Vec<Result<AssetPage, EnumerationError>>) -> Self {
        Self {
            pages: Mutex::new(VecDeque::from(pages)),
            served: Mutex::new(Vec::new()),
            cursors: Mutex::new(Vec::new()),
            limits: Mutex::new(Vec::new()),
            hang: false,
        }
    }

    /// Split `assets` into pages of `page_size`, linked by `cursor-N` cursors
    pub(crate) fn paged(assets: &[AssetDescriptor], page_size: usize) -> Self {
        let chunks: Vec<_> = assets.chunks(page_size).collect();
        let mut pages = Vec::with_capacity(chunks.len().max(1));
        for (i, chunk) in chunks.iter().enumerate() {
            let next_cursor = if i + 1 < chunks.len() {
                format!("cursor-{}", i + 1)
            } else {
                String::new()
            };
            pages.push(Ok(AssetPage {
                assets: chunk.to_vec(),
                next_cursor,
                error: None,
            }));
        }
        if pages.is_empty() {
            pages.push(Ok(AssetPage::default()));
        }
        Self::with_pages(pages)
    }

    /// A source whose requests never complete
    pub(crate) fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::with_pages(Vec::new())
        }
    }

    /// Number of assets on each page served so far
    pub(crate) fn page_sizes(&self) -> Vec<usize> {
        self.served.lock().unwrap().clone()
    }

    /// Cursor of every request received
    pub(crate) fn requested_cursors(&self) -> Vec<String> {
        self.cursors.lock().unwrap().clone()
    }

    /// Page-size bound of every request received
    pub(crate) fn requested_limits(&self) -> Vec<usize> {
        self.limits.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CatalogSource for MockCatalogSource {
    async fn list_page(
        &self,
        cursor: &str,
        max_results: usize,
    ) -> Result<AssetPage, EnumerationError> {
        self.cursors.lock().unwrap().push(cursor.to_string());
        self.limits.lock().unwrap().push(max_results);
        if self.hang {
            std::future::pending::<()>().await;
        }

        let page = self
            .pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AssetPage::default()));
        if let Ok(page) = &page {
            self.served.lock().unwrap().push(page.assets.len());
        }
        page
    }
}

/// Fetcher that records calls instead of touching the network
#[derive(Default)]
pub(crate) struct MockFetcher {
    fail_on: Option<String>,
    delay: Option<Duration>,
    seen: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Fail with a copy error when asked for `asset_id`
    pub(crate) fn failing_on(asset_id: &str) -> Self {
        Self {
            fail_on: Some(asset_id.to_string()),
            ..Default::default()
        }
    }

    /// Take `delay` for every fetch
    pub(crate) fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// Number of fetches started
    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Number of different assets fetched
    pub(crate) fn distinct_assets(&self) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .collect::<HashSet<_>>()
            .len()
    }
}

#[async_trait::async_trait]
impl AssetFetcher for MockFetcher {
    async fn fetch(&self, asset: &AssetDescriptor) -> Result<FetchOutcome, FetchError> {
        self.seen.lock().unwrap().push(asset.asset_id.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        let path = PathBuf::from("dump").join(&asset.public_id);
        if self.fail_on.as_deref() == Some(asset.asset_id.as_str()) {
            return Err(FetchError::Copy {
                path,
                source: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            });
        }
        Ok(FetchOutcome::Downloaded {
            path,
            bytes_written: asset.bytes,
        })
    }
}
