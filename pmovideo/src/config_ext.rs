//! Extension pour intégrer le catalogue vidéo dans pmoconfig
//!
//! Adds the `api.*` keys to `pmoconfig::Config`:
//!
//! ```yaml
//! api:
//!   base_url: "http://127.0.0.1:4000"
//!   videos_path: "/videos"
//!   timeout_secs: 30
//! ```
//!
//! # Exemple
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use pmovideo::{VideoApiClient, VideoApiConfigExt};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! println!("Catalogue: {}", config.get_video_api_base_url()?);
//! let client = VideoApiClient::configured(&config)?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::Result;
use pmoconfig::Config;

use crate::client::{
    VideoApiClient, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_VIDEOS_PATH,
};

/// Trait d'extension pour la configuration du catalogue vidéo
pub trait VideoApiConfigExt {
    /// Base URL of the catalogue server
    fn get_video_api_base_url(&self) -> Result<String>;
    fn set_video_api_base_url(&self, url: String) -> Result<()>;

    /// Path of the catalogue endpoint
    fn get_video_api_path(&self) -> Result<String>;
    fn set_video_api_path(&self, path: String) -> Result<()>;

    /// Request timeout in seconds
    fn get_video_api_timeout_secs(&self) -> Result<u64>;
    fn set_video_api_timeout_secs(&self, secs: u64) -> Result<()>;
}

impl VideoApiConfigExt for Config {
    pmoconfig::impl_string_config!(
        get_video_api_base_url,
        set_video_api_base_url,
        &["api", "base_url"],
        DEFAULT_BASE_URL
    );

    pmoconfig::impl_string_config!(
        get_video_api_path,
        set_video_api_path,
        &["api", "videos_path"],
        DEFAULT_VIDEOS_PATH
    );

    pmoconfig::impl_u64_config!(
        get_video_api_timeout_secs,
        set_video_api_timeout_secs,
        &["api", "timeout_secs"],
        DEFAULT_REQUEST_TIMEOUT_SECS
    );
}

impl VideoApiClient {
    /// Builds a client from the `api.*` configuration keys
    pub fn configured(config: &Config) -> crate::Result<Self> {
        let base_url = config.get_video_api_base_url()?;
        let path = config.get_video_api_path()?;
        let timeout = config.get_video_api_timeout_secs()?;
        tracing::info!(base_url=%base_url, path=%path, timeout_secs=timeout, "Configuring video catalogue client");

        VideoApiClient::builder()
            .base_url(base_url)
            .videos_path(path)
            .timeout(Duration::from_secs(timeout))
            .build()
    }
}
