//! Data models for the video catalogue API
//!
//! The catalogue endpoint returns a JSON array of videos:
//!
//! ```json
//! [{
//!   "id": "1",
//!   "title": "First Video",
//!   "hlsURL": "https://example.com/video1.m3u8",
//!   "fullURL": "https://example.com/video1.mp4",
//!   "description": "Some **markdown**",
//!   "publishedAt": "2025-01-01T10:00:00.000Z",
//!   "author": { "id": "author1", "name": "John Doe" }
//! }]
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accepted `publishedAt` formats, tried in order. Both are UTC.
pub const PUBLISHED_AT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.3fZ", "%Y-%m-%dT%H:%M:%SZ"];

/// Author of a video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub name: String,
}

/// A video of the catalogue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    /// Unique identifier
    pub id: String,
    pub title: String,
    /// HLS playlist used for playback
    #[serde(rename = "hlsURL")]
    pub stream_url: String,
    /// Progressive download of the full file
    #[serde(rename = "fullURL")]
    pub download_url: String,
    /// Markdown description
    pub description: String,
    /// Raw publication timestamp, see [`PUBLISHED_AT_FORMATS`]
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    pub author: Author,
}

impl Video {
    /// Publication date, or `None` when `published_at` matches neither
    /// accepted format.
    pub fn parsed_published_at(&self) -> Option<DateTime<Utc>> {
        parse_published_at(&self.published_at)
    }
}

/// Parses a catalogue timestamp (`2025-01-01T10:00:00.000Z` or
/// `2025-01-01T10:00:00Z`).
pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    PUBLISHED_AT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}
