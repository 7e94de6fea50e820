//! Admin API implementation of [`CatalogSource`]

use super::CatalogSource;
use crate::config::CloudinaryCredentials;
use crate::error::EnumerationError;
use crate::types::{AssetDescriptor, AssetPage};
use serde::Deserialize;

/// Lists assets through `GET /v1_1/{cloud_name}/resources`
#[derive(Clone, Debug)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: CloudinaryCredentials,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    resources: Vec<AssetDescriptor>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl CloudinaryClient {
    /// Create a client for the account described by `credentials`
    ///
    /// `api_base_url` is the scheme and host of the Admin API, normally
    /// [`DEFAULT_API_BASE_URL`](crate::config::DEFAULT_API_BASE_URL).
    pub fn new(
        http: reqwest::Client,
        api_base_url: &str,
        credentials: CloudinaryCredentials,
    ) -> Self {
        let endpoint = format!(
            "{}/v1_1/{}/resources",
            api_base_url.trim_end_matches('/'),
            credentials.cloud_name
        );
        Self {
            http,
            endpoint,
            credentials,
        }
    }

    /// Full URL of the listing endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl CatalogSource for CloudinaryClient {
    async fn list_page(
        &self,
        cursor: &str,
        max_results: usize,
    ) -> Result<AssetPage, EnumerationError> {
        let mut request = self
            .http
            .get(&self.endpoint)
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .query(&[("max_results", max_results.to_string())]);
        if !cursor.is_empty() {
            request = request.query(&[("next_cursor", cursor)]);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        // Error bodies come with 4xx statuses, so decode before looking at the status
        let parsed = match serde_json::from_slice::<ListResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(EnumerationError::Status {
                    status: status.as_u16(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = parsed.error {
            tracing::warn!(
                status = status.as_u16(),
                message = %error.message,
                "Listing service reported an error"
            );
            return Ok(AssetPage {
                error: Some(error.message),
                ..Default::default()
            });
        }
        if !status.is_success() {
            return Err(EnumerationError::Status {
                status: status.as_u16(),
            });
        }

        Ok(AssetPage {
            assets: parsed.resources,
            next_cursor: parsed.next_cursor.unwrap_or_default(),
            error: None,
        })
    }
}
