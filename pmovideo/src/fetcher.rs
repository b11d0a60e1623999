//! Catalogue fetching abstraction
//!
//! The playback session only needs "give me the playlist". Keeping that
//! behind a trait lets the session run against the HTTP client or a test
//! double.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Video;

/// One round-trip to the catalogue.
///
/// Implementations return the videos already ordered as a playlist
/// (see [`crate::playlist::newest_first`]).
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch_videos(&self) -> Result<Vec<Video>>;
}

#[async_trait]
impl<T: VideoFetcher + ?Sized> VideoFetcher for Arc<T> {
    async fn fetch_videos(&self) -> Result<Vec<Video>> {
        (**self).fetch_videos().await
    }
}
