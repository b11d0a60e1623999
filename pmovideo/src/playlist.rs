//! Playlist ordering
//!
//! A playlist is the fetched catalogue sorted newest first. Videos whose
//! `publishedAt` cannot be parsed are never pulled ahead of dated ones:
//! they are placed after every dated video, in arrival order. Videos with
//! the same date also keep their arrival order.

use std::cmp::Reverse;

use crate::models::Video;

/// Sorts `videos` in place, newest first.
pub fn sort_newest_first(videos: &mut [Video]) {
    // Option orders None before Some, so the reversed key puts undated
    // videos last. sort_by_cached_key is stable.
    videos.sort_by_cached_key(|video| Reverse(video.parsed_published_at()));
}

/// Consumes a fetched list and returns it as a playlist.
pub fn newest_first(mut videos: Vec<Video>) -> Vec<Video> {
    sort_newest_first(&mut videos);
    videos
}
