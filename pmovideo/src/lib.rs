//! Video catalogue library for PMOVideo
//!
//! This crate provides the data model of the video catalogue and the
//! client that retrieves it:
//!
//! - **Models**: [`Video`] and [`Author`], deserialized from the catalogue
//!   JSON (`hlsURL`, `fullURL`, `publishedAt`, ...)
//! - **Dates**: `publishedAt` is parsed with two fixed UTC formats, with and
//!   without milliseconds
//! - **Playlist ordering**: newest first, undated videos last
//! - **Fetching**: the [`VideoFetcher`] trait and its HTTP implementation
//!   [`VideoApiClient`]
//! - **Configuration Extension**: `api.*` keys in pmoconfig
//!   (`pmoconfig` feature)
//!
//! # Example
//!
//! ```no_run
//! use pmovideo::{VideoApiClient, VideoFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VideoApiClient::new()?;
//!     let playlist = client.fetch_videos().await?;
//!     if let Some(latest) = playlist.first() {
//!         println!("Latest: {} by {}", latest.title, latest.author.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod playlist;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

pub use client::{ClientBuilder, VideoApiClient};
pub use error::{Error, Result};
pub use fetcher::VideoFetcher;
pub use models::{parse_published_at, Author, Video};
pub use playlist::{newest_first, sort_newest_first};

#[cfg(feature = "pmoconfig")]
pub use config_ext::VideoApiConfigExt;
