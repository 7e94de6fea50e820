//! Run orchestration: startup, catalog enumeration, then the download pipeline.

use crate::catalog::{self, CatalogSource, CloudinaryClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{AssetFetcher, HttpAssetFetcher};
use crate::pipeline;
use crate::template::NameTemplate;
use crate::types::RunSummary;
use crate::utils::format_bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Exports every asset of one account into a local directory
///
/// Construction does all the work that can fail without I/O (credentials,
/// template, HTTP client), so a `Dumper` that exists is ready to run.
pub struct Dumper {
    config: Arc<Config>,
    source: Arc<dyn CatalogSource>,
    fetcher: Arc<dyn AssetFetcher>,
    cancel: CancellationToken,
}

impl Dumper {
    /// Validate `config` and build the production collaborators
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for invalid parameters or credentials,
    /// [`Error::Template`] when the file-name template does not compile.
    pub fn new(config: Config) -> Result<Self> {
        let credentials = config.validate()?;
        let template = Arc::new(NameTemplate::compile(&config.file_name_template)?);

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config("http_client", format!("failed to build HTTP client: {e}")))?;

        let source = Arc::new(CloudinaryClient::new(
            http.clone(),
            &config.api_base_url,
            credentials,
        ));
        let fetcher = Arc::new(HttpAssetFetcher::new(
            http,
            template,
            config.target_dir.clone(),
        ));

        Self::with_components(config, source, fetcher)
    }

    /// Build a dumper around custom collaborators
    ///
    /// The configuration is still validated except for the credentials URL,
    /// which only the default listing client needs.
    pub fn with_components(
        config: Config,
        source: Arc<dyn CatalogSource>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Result<Self> {
        if config.concurrency == 0 {
            return Err(Error::config("concurrency", "must be at least 1"));
        }
        Ok(Self {
            config: Arc::new(config),
            source,
            fetcher,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that aborts the run when cancelled
    ///
    /// Cancelling it stops enumeration and downloads; [`Dumper::run`] then
    /// returns [`Error::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Enumerate the catalog and download every asset
    ///
    /// # Errors
    ///
    /// The first fatal condition of the run: enumeration failure, a failed
    /// asset fetch, or cancellation.
    pub async fn run(&self) -> Result<RunSummary> {
        tokio::fs::create_dir_all(&self.config.target_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create target directory '{}': {}",
                        self.config.target_dir.display(),
                        e
                    ),
                ))
            })?;

        tracing::info!("Collecting information about assets...");
        let catalog = catalog::collect_all(self.source.as_ref(), &self.cancel).await?;
        tracing::info!(
            "Got {} assets with a total size of {}.",
            catalog.len(),
            format_bytes(catalog.total_size())
        );

        let run_token = self.cancel.child_token();
        let summary = pipeline::run_pipeline(
            Arc::new(catalog),
            self.fetcher.clone(),
            self.config.concurrency,
            self.config.progress_interval,
            run_token,
        )
        .await?;

        tracing::info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            written = %format_bytes(summary.bytes_written),
            target_dir = %self.config.target_dir.display(),
            "Dump finished"
        );
        Ok(summary)
    }
}
