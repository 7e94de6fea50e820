//! Fetching a single asset into the target directory

use crate::error::FetchError;
use crate::template::NameTemplate;
use crate::types::{AssetDescriptor, FetchOutcome};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Retrieves one asset and stores it locally
#[async_trait::async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch `asset`, or skip it if its destination already exists
    async fn fetch(&self, asset: &AssetDescriptor) -> Result<FetchOutcome, FetchError>;
}

/// Streams asset bodies over HTTP into files named by a [`NameTemplate`]
#[derive(Clone, Debug)]
pub struct HttpAssetFetcher {
    http: reqwest::Client,
    template: Arc<NameTemplate>,
    target_dir: PathBuf,
}

impl HttpAssetFetcher {
    /// Create a fetcher writing below `target_dir`
    pub fn new(http: reqwest::Client, template: Arc<NameTemplate>, target_dir: PathBuf) -> Self {
        Self {
            http,
            template,
            target_dir,
        }
    }

    /// Where `asset` would be written
    pub fn destination(&self, asset: &AssetDescriptor) -> Result<PathBuf, FetchError> {
        Ok(self.target_dir.join(self.template.render_path(asset)?))
    }

    async fn download(
        &self,
        asset: &AssetDescriptor,
        destination: PathBuf,
    ) -> Result<FetchOutcome, FetchError> {
        let request_error = |source| FetchError::Request {
            url: asset.secure_url.clone(),
            source,
        };
        let response = self
            .http
            .get(&asset.secure_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request_error)?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| FetchError::Create {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&destination)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Another asset rendered to the same name and got there first
                tracing::warn!(
                    asset_id = %asset.asset_id,
                    path = %destination.display(),
                    "Destination was created concurrently, skipping"
                );
                return Ok(FetchOutcome::Skipped { path: destination });
            }
            Err(source) => {
                return Err(FetchError::Create {
                    path: destination,
                    source,
                });
            }
        };

        let bytes_written = copy_body(response, &mut file, &destination).await?;

        Ok(FetchOutcome::Downloaded {
            path: destination,
            bytes_written,
        })
    }
}

#[async_trait::async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, asset: &AssetDescriptor) -> Result<FetchOutcome, FetchError> {
        let destination = self.destination(asset)?;

        match tokio::fs::symlink_metadata(&destination).await {
            Ok(_) => {
                tracing::debug!(
                    asset_id = %asset.asset_id,
                    path = %destination.display(),
                    "Already present"
                );
                return Ok(FetchOutcome::Skipped { path: destination });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(FetchError::ExistenceCheck {
                    path: destination,
                    source,
                });
            }
        }

        let outcome = self.download(asset, destination).await?;
        tracing::debug!(
            asset_id = %asset.asset_id,
            path = %outcome.path().display(),
            bytes = outcome.bytes_written(),
            "Asset fetched"
        );
        Ok(outcome)
    }
}

/// Stream the response body into `file`, returning the number of bytes written
///
/// A failure leaves whatever was already written in place.
async fn copy_body(
    response: reqwest::Response,
    file: &mut tokio::fs::File,
    destination: &Path,
) -> Result<u64, FetchError> {
    let copy_error = |source| FetchError::Copy {
        path: destination.to_path_buf(),
        source,
    };

    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| copy_error(std::io::Error::other(e)))?;
        file.write_all(&chunk).await.map_err(copy_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(copy_error)?;

    Ok(written)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::asset;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(template: &str, target_dir: &Path) -> HttpAssetFetcher {
        HttpAssetFetcher::new(
            reqwest::Client::new(),
            Arc::new(NameTemplate::compile(template).unwrap()),
            target_dir.to_path_buf(),
        )
    }

    fn served_asset(server: &MockServer, id: &str, body_len: u64) -> AssetDescriptor {
        AssetDescriptor {
            secure_url: format!("{}/assets/{id}", server.uri()),
            ..asset(id, body_len)
        }
    }

    #[tokio::test]
    async fn downloads_body_to_rendered_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/assets/cat"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"meow meow".to_vec()))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let outcome = fetcher("{{.PublicID}}.bin", dir.path())
            .fetch(&served_asset(&server, "cat", 9))
            .await
            .unwrap();

        let expected = dir.path().join("cat.bin");
        assert_eq!(
            outcome,
            FetchOutcome::Downloaded {
                path: expected.clone(),
                bytes_written: 9
            }
        );
        assert_eq!(std::fs::read(expected).unwrap(), b"meow meow");
    }

    #[tokio::test]
    async fn nested_names_create_parent_directories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let asset = AssetDescriptor {
            public_id: "albums/2024/cat".to_string(),
            ..served_asset(&server, "cat", 1)
        };

        fetcher("{{.PublicID}}", dir.path()).fetch(&asset).await.unwrap();

        assert!(dir.path().join("albums/2024/cat").is_file());
    }

    #[tokio::test]
    async fn existing_destination_is_skipped_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new content".to_vec()))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("cat");
        std::fs::write(&existing, b"old content").unwrap();

        let outcome = fetcher("{{.PublicID}}", dir.path())
            .fetch(&served_asset(&server, "cat", 11))
            .await
            .unwrap();

        assert!(outcome.is_skipped());
        assert_eq!(outcome.bytes_written(), 0);
        assert_eq!(std::fs::read(existing).unwrap(), b"old content");
    }

    #[tokio::test]
    async fn existing_directory_also_counts_as_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cat")).unwrap();
        let asset = AssetDescriptor {
            secure_url: "http://127.0.0.1:9/never".to_string(),
            ..asset("cat", 1)
        };

        let outcome = fetcher("{{.PublicID}}", dir.path()).fetch(&asset).await.unwrap();

        assert!(outcome.is_skipped());
    }

    #[tokio::test]
    async fn error_status_fails_without_creating_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let err = fetcher("{{.PublicID}}", dir.path())
            .fetch(&served_asset(&server, "gone", 5))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Request { .. }), "got {err:?}");
        assert!(!dir.path().join("gone").exists());
    }

    #[tokio::test]
    async fn unsafe_rendered_name_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let asset = AssetDescriptor {
            public_id: "../escape".to_string(),
            ..asset("x", 1)
        };

        let err = fetcher("{{.PublicID}}", dir.path()).fetch(&asset).await.unwrap_err();

        assert!(matches!(err, FetchError::Render(_)));
    }

    #[tokio::test]
    async fn uncreatable_destination_is_a_create_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a parent directory is needed
        std::fs::write(dir.path().join("albums"), b"").unwrap();
        let asset = AssetDescriptor {
            public_id: "albums/cat".to_string(),
            ..served_asset(&server, "cat", 1)
        };

        let err = fetcher("{{.PublicID}}", dir.path()).fetch(&asset).await.unwrap_err();

        assert!(
            matches!(err, FetchError::Create { .. } | FetchError::ExistenceCheck { .. }),
            "got {err:?}"
        );
    }
}
