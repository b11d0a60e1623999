//! HTTP client for the video catalogue API
//!
//! # Example
//!
//! ```no_run
//! use pmovideo::{VideoApiClient, VideoFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VideoApiClient::builder()
//!         .base_url("http://127.0.0.1:4000")
//!         .build()?;
//!
//!     for video in client.fetch_videos().await? {
//!         println!("{} - {}", video.published_at, video.title);
//!     }
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::fetcher::VideoFetcher;
use crate::models::Video;
use crate::playlist::newest_first;

/// Default catalogue server (local development server)
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:4000";

/// Default path of the catalogue endpoint
pub const DEFAULT_VIDEOS_PATH: &str = "/videos";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("PMOVideo/", env!("CARGO_PKG_VERSION"), " (pmovideo)");

/// Video catalogue HTTP client
///
/// Stateless: every call performs one request and does not cache.
#[derive(Debug, Clone)]
pub struct VideoApiClient {
    client: Client,
    base_url: String,
    videos_path: String,
    timeout: Duration,
}

impl VideoApiClient {
    /// Create a new client with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of the catalogue endpoint
    pub fn videos_url(&self) -> Result<Url> {
        let base = self.base_url.trim_end_matches('/');
        let path = self.videos_path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Fetches the catalogue and returns it newest first.
    ///
    /// Any non-success status is an error, as is a body that does not
    /// decode into a list of videos.
    pub async fn list_videos(&self) -> Result<Vec<Video>> {
        let url = self.videos_url()?;
        debug!(%url, "Fetching video catalogue");

        let response = self.client.get(url.clone()).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Catalogue request failed");
            return Err(Error::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await?;
        let videos: Vec<Video> = serde_json::from_slice(&body)?;
        debug!(count = videos.len(), "Received video catalogue");

        Ok(newest_first(videos))
    }
}

#[async_trait]
impl VideoFetcher for VideoApiClient {
    async fn fetch_videos(&self) -> Result<Vec<Video>> {
        self.list_videos().await
    }
}

/// Builder for configuring a VideoApiClient
#[derive(Debug)]
pub struct ClientBuilder {
    client: Option<Client>,
    base_url: String,
    videos_path: String,
    timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            videos_path: DEFAULT_VIDEOS_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the catalogue endpoint path
    pub fn videos_path(mut self, path: impl Into<String>) -> Self {
        self.videos_path = path.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client
    pub fn build(self) -> Result<VideoApiClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::other(format!("Cannot build HTTP client: {e}")))?,
        };

        Ok(VideoApiClient {
            client,
            base_url: self.base_url,
            videos_path: self.videos_path,
            timeout: self.timeout,
        })
    }
}
