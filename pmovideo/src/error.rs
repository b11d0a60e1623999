//! Error types for the video catalogue client

/// Result type alias for video catalogue operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching the video catalogue
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Connection to the server failed
    #[error("Could not connect to the server: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server did not answer in time
    #[error("The request timed out")]
    Timeout,

    /// The server answered with a non-success status
    #[error("Bad server response (HTTP status {0})")]
    HttpStatus(u16),

    /// The payload does not match the expected shape
    #[error("The data couldn't be read because it isn't in the correct format: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration error (from pmoconfig/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_decode() {
            Error::Other(err.to_string())
        } else {
            Error::Transport(err)
        }
    }
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True for failures that happened while talking to the server:
    /// bad request URL, connection failure, timeout, non-success status.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::Transport(_) | Error::Timeout | Error::HttpStatus(_)
        )
    }

    /// Stable short code shown next to the error description
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidUrl(_) => "bad-url",
            Error::Transport(_) => "cannot-connect",
            Error::Timeout => "timed-out",
            Error::HttpStatus(_) => "bad-server-response",
            Error::Decode(_) => "cannot-decode",
            Error::Config(_) => "config",
            Error::Other(_) => "unknown",
        }
    }
}
