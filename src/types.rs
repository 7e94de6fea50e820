//! Core types for cloudinary-dump

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One remote asset as reported by the listing API
///
/// Descriptors are created by the catalog enumerator and never mutated afterwards.
/// Only `asset_id`, `secure_url` and `bytes` drive the pipeline; the remaining
/// fields exist so file-name templates can reference them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    /// Immutable unique identifier assigned by the service
    pub asset_id: String,
    /// Public identifier, may contain `/`-separated folders
    pub public_id: String,
    /// File format / extension without the leading dot
    #[serde(default)]
    pub format: String,
    /// Version number of the stored asset
    #[serde(default)]
    pub version: u64,
    /// Resource type (`image`, `video`, `raw`)
    #[serde(default)]
    pub resource_type: String,
    /// Delivery type (`upload`, `private`, `authenticated`, ...)
    #[serde(default, rename = "type")]
    pub delivery_type: String,
    /// Creation timestamp as reported by the service (RFC 3339)
    #[serde(default)]
    pub created_at: String,
    /// Size of the stored asset in bytes
    #[serde(default)]
    pub bytes: u64,
    /// Width in pixels (0 for non-visual assets)
    #[serde(default)]
    pub width: u64,
    /// Height in pixels (0 for non-visual assets)
    #[serde(default)]
    pub height: u64,
    /// Access mode (`public`, `authenticated`)
    #[serde(default)]
    pub access_mode: String,
    /// Plain HTTP delivery URL
    #[serde(default)]
    pub url: String,
    /// HTTPS delivery URL, the source of the download
    pub secure_url: String,
}

/// The complete, ordered list of assets in the account
///
/// Order is the concatenation order of listing pages. Once built the catalog is
/// not modified; its length is the number of completions that make a run done.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetCatalog {
    assets: Vec<AssetDescriptor>,
}

impl AssetCatalog {
    /// Wrap an already collected list of assets
    pub fn new(assets: Vec<AssetDescriptor>) -> Self {
        Self { assets }
    }

    /// Number of assets
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the account has no assets
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Sum of all asset sizes in bytes
    pub fn total_size(&self) -> u64 {
        self.assets.iter().map(|a| a.bytes).sum()
    }

    /// Iterate assets in catalog order
    pub fn iter(&self) -> std::slice::Iter<'_, AssetDescriptor> {
        self.assets.iter()
    }

    /// Borrow the assets as a slice
    pub fn assets(&self) -> &[AssetDescriptor] {
        &self.assets
    }
}

impl<'a> IntoIterator for &'a AssetCatalog {
    type Item = &'a AssetDescriptor;
    type IntoIter = std::slice::Iter<'a, AssetDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.iter()
    }
}

/// One page returned by a [`CatalogSource`](crate::catalog::CatalogSource)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetPage {
    /// Assets on this page, in service order
    pub assets: Vec<AssetDescriptor>,
    /// Cursor for the following page; empty on the last page
    pub next_cursor: String,
    /// In-band error reported by the service for this page
    pub error: Option<String>,
}

/// Result of fetching a single asset
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was streamed into a newly created file
    Downloaded {
        /// File that was written
        path: PathBuf,
        /// Number of body bytes written
        bytes_written: u64,
    },
    /// A file already existed at the destination; nothing was written
    Skipped {
        /// Existing destination
        path: PathBuf,
    },
}

impl FetchOutcome {
    /// Bytes written to disk by this fetch (zero for a skip)
    pub fn bytes_written(&self) -> u64 {
        match self {
            FetchOutcome::Downloaded { bytes_written, .. } => *bytes_written,
            FetchOutcome::Skipped { .. } => 0,
        }
    }

    /// Destination path of the fetch
    pub fn path(&self) -> &std::path::Path {
        match self {
            FetchOutcome::Downloaded { path, .. } | FetchOutcome::Skipped { path } => path,
        }
    }

    /// Whether the fetch was skipped because the destination existed
    pub fn is_skipped(&self) -> bool {
        matches!(self, FetchOutcome::Skipped { .. })
    }
}

/// A finished asset travelling from a worker to the progress aggregator
#[derive(Clone, Debug)]
pub struct Completion {
    /// The asset that was processed
    pub asset: AssetDescriptor,
    /// What the fetch did
    pub outcome: FetchOutcome,
}

/// Final tally of a successful run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Number of assets in the catalog
    pub total_assets: usize,
    /// Number of assets accounted for (downloaded + skipped)
    pub completed_assets: usize,
    /// Catalog-reported size of all assets
    pub total_bytes: u64,
    /// Catalog-reported size of completed assets
    pub completed_bytes: u64,
    /// Assets written to disk during this run
    pub downloaded: usize,
    /// Assets skipped because the destination already existed
    pub skipped: usize,
    /// Bytes actually written to disk during this run
    pub bytes_written: u64,
}
