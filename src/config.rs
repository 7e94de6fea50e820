//! Configuration types for cloudinary-dump

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Template used when none is given: one file per asset, named by its public ID
pub const DEFAULT_TEMPLATE: &str = "{{.PublicID}}";

/// Default Admin API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudinary.com";

/// Immutable parameters of one dump run
///
/// Built once at startup (from the command line or by an embedding program) and
/// shared by reference with every component of the run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Credentials URL in the form `cloudinary://<api_key>:<api_secret>@<cloud_name>`
    pub cloudinary_url: String,

    /// Directory assets are written into (default: "dump")
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    /// Template producing each asset's path relative to `target_dir` (default: "{{.PublicID}}")
    #[serde(default = "default_template")]
    pub file_name_template: String,

    /// Number of concurrent download workers (default: 5)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Base URL of the Admin API (default: "https://api.cloudinary.com")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Minimum time between two progress lines (default: 1 second)
    #[serde(default = "default_progress_interval", with = "duration_serde")]
    pub progress_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloudinary_url: String::new(),
            target_dir: default_target_dir(),
            file_name_template: default_template(),
            concurrency: default_concurrency(),
            api_base_url: default_api_base_url(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl Config {
    /// Check the parameters that can be checked without touching the network
    ///
    /// Returns the parsed credentials so callers do not parse the URL twice.
    pub fn validate(&self) -> Result<CloudinaryCredentials> {
        if self.concurrency == 0 {
            return Err(Error::config("concurrency", "must be at least 1"));
        }
        if self.target_dir.as_os_str().is_empty() {
            return Err(Error::config("target_dir", "must not be empty"));
        }
        url::Url::parse(&self.api_base_url).map_err(|e| {
            Error::config(
                "api_base_url",
                format!("invalid URL '{}': {}", self.api_base_url, e),
            )
        })?;
        CloudinaryCredentials::parse(&self.cloudinary_url)
    }
}

/// Account credentials extracted from a `cloudinary://` URL
#[derive(Clone, PartialEq, Eq)]
pub struct CloudinaryCredentials {
    /// Cloud name (the account's namespace in API paths)
    pub cloud_name: String,
    /// API key, used as the basic-auth user name
    pub api_key: String,
    /// API secret, used as the basic-auth password
    pub api_secret: String,
}

impl CloudinaryCredentials {
    /// Parse `cloudinary://<api_key>:<api_secret>@<cloud_name>`
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(Error::config("cloudinary_url", "credentials URL is required"));
        }

        let parsed = url::Url::parse(raw.trim())
            .map_err(|e| Error::config("cloudinary_url", format!("failed to parse URL: {e}")))?;

        if parsed.scheme() != "cloudinary" {
            return Err(Error::config(
                "cloudinary_url",
                format!("expected scheme 'cloudinary', got '{}'", parsed.scheme()),
            ));
        }

        let cloud_name = parsed.host_str().unwrap_or_default().to_string();
        let api_key = decode(parsed.username());
        let api_secret = parsed.password().map(decode).unwrap_or_default();

        if cloud_name.is_empty() {
            return Err(Error::config("cloudinary_url", "cloud name is missing"));
        }
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(Error::config(
                "cloudinary_url",
                "API key and secret are required",
            ));
        }

        Ok(Self {
            cloud_name,
            api_key,
            api_secret,
        })
    }
}

// Keep the secret out of logs
impl std::fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

// Userinfo comes back percent-encoded from `url`
fn decode(component: &str) -> String {
    urlencoding::decode(component)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| component.to_string())
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("dump")
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_concurrency() -> usize {
    5
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(1)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
