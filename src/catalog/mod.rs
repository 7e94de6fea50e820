//! Catalog enumeration
//!
//! The listing service is reached through the [`CatalogSource`] trait so the
//! enumerator can be driven by the real Admin API ([`CloudinaryClient`]) or by an
//! in-memory source in tests.

mod cloudinary;

pub use cloudinary::CloudinaryClient;

use crate::error::{EnumerationError, Error, Result};
use crate::types::{AssetCatalog, AssetPage};
use tokio_util::sync::CancellationToken;

/// Largest page the listing API hands out
pub const MAX_PAGE_SIZE: usize = 1000;

/// A paginated, read-only listing of the account's assets
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch one page of at most `max_results` assets
    ///
    /// An empty `cursor` requests the first page. Transport and decoding failures
    /// are returned as errors; problems the service reports about the request
    /// itself come back in [`AssetPage::error`].
    async fn list_page(
        &self,
        cursor: &str,
        max_results: usize,
    ) -> std::result::Result<AssetPage, EnumerationError>;
}

/// Walk every page of `source` and collect the complete catalog
///
/// Pages are appended in the order they arrive. The first failing page, in-band
/// or transport, aborts the whole enumeration; nothing is retried. Cancelling
/// `cancel` aborts the request in flight.
pub async fn collect_all(
    source: &dyn CatalogSource,
    cancel: &CancellationToken,
) -> Result<AssetCatalog> {
    let mut cursor = String::new();
    let mut assets = Vec::new();
    let mut pages = 0usize;

    loop {
        let page = tokio::select! {
            page = source.list_page(&cursor, MAX_PAGE_SIZE) => page?,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };

        if let Some(message) = page.error {
            return Err(EnumerationError::Service { message }.into());
        }

        pages += 1;
        assets.extend(page.assets);
        tracing::debug!(page = pages, collected = assets.len(), "Collected asset page");

        if page.next_cursor.is_empty() {
            break;
        }
        cursor = page.next_cursor;
    }

    Ok(AssetCatalog::new(assets))
}
