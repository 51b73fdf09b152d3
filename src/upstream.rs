//! Upstream video API client.
//!
//! Fetches one batch of videos, retrying transient failures, and reshapes the
//! vendor payload into [`ReelsDataset`]. Items that lack either URL, or whose
//! shape is unexpected, are skipped individually.

use crate::{
    http_retry::{RetryConfig, post_json_with_retry},
    models::{Reel, ReelsDataset},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Envelope `code` the upstream uses to signal success.
const SUCCESS_CODE: i64 = 200;

/// Overall per-request timeout for upstream calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP connect timeout for upstream calls.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(StatusCode),
}

/// Source of reels data.
///
/// The refresh coordinator only depends on this trait, so tests can drive it
/// with scripted sources.
#[async_trait]
pub trait ReelSource: Send + Sync {
    /// Fetch and transform one batch.
    ///
    /// An empty dataset is a valid result; callers decide whether it is
    /// acceptable.
    async fn fetch_reels(&self) -> Result<ReelsDataset, UpstreamError>;
}

#[derive(Serialize)]
struct BatchRequest {
    count: u32,
}

/// [`ReelSource`] backed by the third-party video API.
#[derive(Clone, Debug)]
pub struct HttpReelSource {
    client: Client,
    endpoint: String,
    token: Option<String>,
    batch_size: u32,
    brand: String,
    retry: RetryConfig,
}

impl HttpReelSource {
    pub fn new(
        client: Client,
        endpoint: String,
        token: Option<String>,
        batch_size: u32,
        brand: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            token,
            batch_size,
            brand,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy (tests use millisecond backoff).
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Build the client used for upstream calls: 30s overall, 10s connect.
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
}

#[async_trait]
impl ReelSource for HttpReelSource {
    async fn fetch_reels(&self) -> Result<ReelsDataset, UpstreamError> {
        info!(
            "Fetching {} videos from upstream {}",
            self.batch_size, self.endpoint
        );

        let body = post_json_with_retry(
            &self.client,
            &self.endpoint,
            self.token.as_deref(),
            &BatchRequest {
                count: self.batch_size,
            },
            &self.retry,
        )
        .await?;

        let payload: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!("Upstream body is not JSON, treating as empty: {}", e);
                return Ok(ReelsDataset::default());
            }
        };

        let dataset = transform_response(&payload, &self.brand);
        info!("Upstream returned {} usable reels", dataset.len());
        Ok(dataset)
    }
}

/// Reshape a full upstream envelope.
///
/// Anything other than `{"code": 200, "data": [...]}` yields an empty
/// dataset.
pub fn transform_response(payload: &Value, brand: &str) -> ReelsDataset {
    let items = match (
        payload.get("code").and_then(Value::as_i64),
        payload.get("data").and_then(Value::as_array),
    ) {
        (Some(SUCCESS_CODE), Some(items)) => items,
        _ => {
            warn!("Unexpected upstream envelope, treating as zero results");
            return ReelsDataset::default();
        }
    };

    let reels: Vec<Reel> = items
        .iter()
        .filter_map(|item| transform_item(item, brand))
        .collect();

    let skipped = items.len() - reels.len();
    if skipped > 0 {
        debug!("Skipped {} malformed upstream items", skipped);
    }

    ReelsDataset::new(reels)
}

/// Reshape a single upstream item, or `None` if it is unusable.
pub fn transform_item(item: &Value, brand: &str) -> Option<Reel> {
    let video_url = non_empty_str(item.get("mp4_url")?)?;
    let thumbnail_url = non_empty_str(item.get("medium_thumb")?)?;

    let caption = item
        .get("meta")
        .and_then(|m| m.get("title"))
        .and_then(|t| t.get("text"))
        .and_then(non_empty_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback_caption(item, brand));

    Some(Reel {
        thumbnail_url: thumbnail_url.to_string(),
        video_url: video_url.to_string(),
        caption,
    })
}

fn fallback_caption(item: &Value, brand: &str) -> String {
    match item.get("action_name").and_then(non_empty_str) {
        Some(action) => format!("{} | {}", action, brand),
        None => format!("Watch now | {}", brand),
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(thumb: &str, video: &str) -> Value {
        json!({ "medium_thumb": thumb, "mp4_url": video })
    }

    fn source_for(server: &MockServer) -> HttpReelSource {
        HttpReelSource::new(
            Client::new(),
            format!("{}/v1/videos", server.uri()),
            None,
            3,
            "Acme".to_string(),
        )
        .with_retry(RetryConfig {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
            timeout: None,
        })
    }

    #[test]
    fn item_with_nested_title_uses_it() {
        let raw = json!({
            "medium_thumb": "https://cdn.example.com/1.jpg",
            "mp4_url": "https://cdn.example.com/1.mp4",
            "action_name": "Shop",
            "meta": { "title": { "text": "Autumn lookbook" } }
        });

        let reel = transform_item(&raw, "Acme").unwrap();
        assert_eq!(reel.thumbnail_url, "https://cdn.example.com/1.jpg");
        assert_eq!(reel.video_url, "https://cdn.example.com/1.mp4");
        assert_eq!(reel.caption, "Autumn lookbook");
    }

    #[test]
    fn caption_falls_back_to_action_name() {
        let raw = json!({
            "medium_thumb": "t", "mp4_url": "v",
            "action_name": "Shop now",
            "meta": { "title": null }
        });
        assert_eq!(transform_item(&raw, "Acme").unwrap().caption, "Shop now | Acme");
    }

    #[test]
    fn caption_falls_back_to_placeholder() {
        let raw = json!({ "medium_thumb": "t", "mp4_url": "v", "meta": "garbage" });
        assert_eq!(transform_item(&raw, "Acme").unwrap().caption, "Watch now | Acme");
    }

    #[test]
    fn item_missing_either_url_is_dropped() {
        assert!(transform_item(&json!({ "mp4_url": "v" }), "Acme").is_none());
        assert!(transform_item(&json!({ "medium_thumb": "t" }), "Acme").is_none());
        assert!(transform_item(&item("", "v"), "Acme").is_none());
        assert!(transform_item(&item("t", "   "), "Acme").is_none());
        assert!(transform_item(&json!({ "medium_thumb": 7, "mp4_url": "v" }), "Acme").is_none());
        assert!(transform_item(&json!("not an object"), "Acme").is_none());
    }

    #[test]
    fn excluded_items_shrink_dataset_and_keep_order() {
        let payload = json!({
            "code": 200,
            "data": [
                item("t1", "v1"),
                { "mp4_url": "v2" },
                item("t3", "v3"),
                null,
                item("t5", "v5"),
            ]
        });

        let dataset = transform_response(&payload, "Acme");
        let videos: Vec<&str> = dataset.reels.iter().map(|r| r.video_url.as_str()).collect();
        assert_eq!(videos, vec!["v1", "v3", "v5"]);
    }

    #[test]
    fn bad_envelope_is_zero_results() {
        assert!(transform_response(&json!({ "code": 500, "data": [item("t", "v")] }), "A").is_empty());
        assert!(transform_response(&json!({ "code": 200, "data": {} }), "A").is_empty());
        assert!(transform_response(&json!({ "data": [item("t", "v")] }), "A").is_empty());
        assert!(transform_response(&json!([1, 2, 3]), "A").is_empty());
    }

    #[tokio::test]
    async fn fetch_posts_batch_size_and_transforms() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/videos"))
            .and(body_json(json!({ "count": 3 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": [item("t1", "v1"), { "medium_thumb": "t2" }, item("t3", "v3")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dataset = source_for(&server).fetch_reels().await.unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.reels[1].thumbnail_url, "t3");
    }

    #[tokio::test]
    async fn non_json_body_is_empty_not_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let dataset = source_for(&server).fetch_reels().await.unwrap();
        assert!(dataset.is_empty());
    }

    #[tokio::test]
    async fn client_error_surfaces_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = source_for(&server).fetch_reels().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(StatusCode::UNAUTHORIZED)));
    }
}
