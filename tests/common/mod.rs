//! Common test utilities for cloudinary-dump integration tests

#![allow(dead_code)]

use cloudinary_dump::Config;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLOUD_NAME: &str = "demo";
pub const API_KEY: &str = "key";
pub const API_SECRET: &str = "secret";

/// Admin API and asset delivery served by one mock server
pub struct FakeCloudinary {
    pub server: MockServer,
}

impl FakeCloudinary {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Config pointing at this server and writing into `target_dir`
    pub fn config(&self, target_dir: &Path) -> Config {
        Config {
            cloudinary_url: format!("cloudinary://{API_KEY}:{API_SECRET}@{CLOUD_NAME}"),
            target_dir: target_dir.to_path_buf(),
            concurrency: 2,
            api_base_url: self.server.uri(),
            progress_interval: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Listing entry for an asset served by [`FakeCloudinary::serve_asset`]
    pub fn resource(&self, id: &str, bytes: u64) -> Value {
        json!({
            "asset_id": format!("id-{id}"),
            "public_id": id,
            "format": "bin",
            "version": 1_700_000_000u64,
            "resource_type": "image",
            "type": "upload",
            "created_at": "2024-01-01T00:00:00Z",
            "bytes": bytes,
            "secure_url": format!("{}/assets/{id}", self.server.uri()),
        })
    }

    /// Serve the listing as `pages`, chained by `cursor-N` cursors
    pub async fn serve_listing(&self, pages: Vec<Vec<Value>>) {
        let listing = format!("/v1_1/{CLOUD_NAME}/resources");
        let count = pages.len();
        for (i, resources) in pages.into_iter().enumerate() {
            let mut body = json!({ "resources": resources });
            if i + 1 < count {
                body["next_cursor"] = json!(format!("cursor-{}", i + 1));
            }

            let mock = Mock::given(method("GET"))
                .and(path(listing.as_str()))
                .and(basic_auth(API_KEY, API_SECRET));
            let mock = if i == 0 {
                mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            } else {
                // Cursor-specific pages win over the first page
                mock.and(query_param("next_cursor", format!("cursor-{i}")))
                    .respond_with(ResponseTemplate::new(200).set_body_json(body))
                    .with_priority(1)
            };
            mock.expect(1).mount(&self.server).await;
        }
    }

    /// Answer every listing request with an in-band error
    pub async fn serve_listing_error(&self, status: u16, message: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v1_1/{CLOUD_NAME}/resources")))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({ "error": { "message": message } })),
            )
            .mount(&self.server)
            .await;
    }

    /// Serve `body` as the content of asset `id`
    pub async fn serve_asset(&self, id: &str, body: &[u8]) {
        Mock::given(method("GET"))
            .and(path(format!("/assets/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&self.server)
            .await;
    }

    /// Asset `id` exists in the listing but its delivery fails
    pub async fn serve_missing_asset(&self, id: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/assets/{id}")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&self.server)
            .await;
    }

    /// Number of asset bodies requested so far
    pub async fn asset_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path().starts_with("/assets/"))
            .count()
    }

    /// Number of requests made to the listing endpoint
    pub async fn listing_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path().ends_with("/resources"))
            .count()
    }
}

/// `len` bytes of recognizable content
pub fn body_of(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}
