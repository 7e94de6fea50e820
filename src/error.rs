//! Error types for cloudinary-dump
//!
//! The taxonomy follows the phases of a run:
//! - Startup problems (bad credentials URL, bad template) surface as [`Error::Config`]
//!   and [`Error::Template`] before any I/O happens
//! - Listing failures surface as [`Error::Enumeration`] and abort before downloads start
//! - Any per-asset failure surfaces as [`Error::Fetch`] and is fatal to the whole run

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cloudinary-dump operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cloudinary-dump
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "concurrency")
        key: Option<String>,
    },

    /// The file-name template could not be compiled
    #[error("argument template has incorrect syntax: {0}")]
    Template(#[from] TemplateError),

    /// Collecting the asset catalog failed
    #[error("unable to collect information about assets: {0}")]
    Enumeration(#[from] EnumerationError),

    /// Fetching a single asset failed; fatal to the whole run
    #[error("failed to handle asset {asset_id}: {source}")]
    Fetch {
        /// Identifier of the asset that failed
        asset_id: String,
        /// What went wrong
        #[source]
        source: FetchError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Run was cancelled before every asset was accounted for
    #[error("run cancelled before all assets were processed")]
    Cancelled,

    /// A spawned pipeline task panicked or was aborted
    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// File-name template errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{{` was opened but never closed
    #[error("unclosed action starting at byte {offset}")]
    UnclosedAction {
        /// Byte offset of the opening braces
        offset: usize,
    },

    /// A `}}` appeared outside of an action
    #[error("unexpected '}}}}' at byte {offset}")]
    UnexpectedClose {
        /// Byte offset of the closing braces
        offset: usize,
    },

    /// Action body is not a `.Field` reference
    #[error("unsupported action {{{{{action}}}}}: only field references like {{{{.PublicID}}}} are allowed")]
    InvalidAction {
        /// The raw action body
        action: String,
    },

    /// Action references a field assets do not have
    #[error("unknown field .{field}")]
    UnknownField {
        /// The field name as written
        field: String,
    },

    /// The rendered name cannot be used as a path inside the target directory
    #[error("rendered file name {rendered:?} is not a safe relative path: {reason}")]
    UnsafePath {
        /// The rendered string
        rendered: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

/// Catalog listing errors
#[derive(Debug, Error)]
pub enum EnumerationError {
    /// The listing request failed at the transport level
    #[error("listing request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The listing service answered with an unexpected status and no error message
    #[error("listing service returned HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The listing response body was not the expected JSON
    #[error("failed to decode listing response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The listing service answered with an in-band error message
    #[error("listing service reported an error: {message}")]
    Service {
        /// Message returned by the service
        message: String,
    },
}

/// Failures while fetching one asset and writing it to disk
#[derive(Debug, Error)]
pub enum FetchError {
    /// The template could not render a usable name for this asset
    #[error("failed to create file name: {0}")]
    Render(#[from] TemplateError),

    /// Checking whether the destination already exists failed
    #[error("checking file absence failed for {}: {source}", .path.display())]
    ExistenceCheck {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Opening the asset body failed (transport error or non-success status)
    #[error("failed to make request to {url}: {source}")]
    Request {
        /// Source URL
        url: String,
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },

    /// Creating the destination file (or its parent directories) failed
    #[error("failed to create file {}: {source}", .path.display())]
    Create {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Streaming the body into the destination file failed
    #[error("failed to copy data from network to {}: {source}", .path.display())]
    Copy {
        /// Destination path (left partially written)
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn fetch_error_names_asset_and_cause() {
        let err = Error::Fetch {
            asset_id: "abc123".to_string(),
            source: FetchError::Create {
                path: PathBuf::from("dump/cat"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            },
        };

        let msg = err.to_string();
        assert!(msg.contains("abc123"), "message should name the asset: {msg}");
        assert!(msg.contains("dump/cat"), "message should name the path: {msg}");
        assert!(err.source().is_some(), "cause chain must be preserved");
    }

    #[test]
    fn template_error_messages_render_braces_literally() {
        let err = TemplateError::InvalidAction {
            action: "range .Tags".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported action {{range .Tags}}: only field references like {{.PublicID}} are allowed"
        );

        let err = TemplateError::UnexpectedClose { offset: 3 };
        assert_eq!(err.to_string(), "unexpected '}}' at byte 3");
    }

    #[test]
    fn service_error_is_wrapped_with_context() {
        let err: Error = EnumerationError::Service {
            message: "Invalid api_key".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "unable to collect information about assets: listing service reported an error: Invalid api_key"
        );
    }

    #[test]
    fn config_helper_records_key() {
        let err = Error::config("concurrency", "must be at least 1");
        match err {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("concurrency"));
                assert_eq!(message, "must be at least 1");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
