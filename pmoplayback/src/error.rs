//! Error types for the playback session

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Errors raised while attaching or driving a media resource
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The stream URL of the selected video cannot be parsed
    #[error("Invalid video URL: {url}")]
    InvalidMediaUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The media engine could not create a resource
    #[error("Cannot create media resource: {0}")]
    ResourceCreation(String),

    /// The media engine reported a failure
    #[error("{0}")]
    Playback(String),

    /// The resource was used after `dispose`
    #[error("Media resource has been disposed")]
    Disposed,
}

impl PlaybackError {
    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    pub fn resource_creation(msg: impl Into<String>) -> Self {
        Self::ResourceCreation(msg.into())
    }
}
