//! Playback session for PMOVideo
//!
//! This crate drives one video at a time out of a remote catalogue:
//!
//! - **Session**: [`PlaybackSession`] loads the catalogue through a
//!   [`pmovideo::VideoFetcher`], tracks the current position and exposes
//!   navigation (next, previous, play/pause) plus loading and error state
//! - **Observable state**: every change is published as a
//!   [`SessionSnapshot`] on a `tokio::sync::watch` channel
//! - **Media adapter**: [`MediaEngine`] / [`MediaResource`] abstract the
//!   native player; [`HeadlessEngine`] is an in-memory implementation
//! - **Listener ownership**: callbacks registered on a resource are held
//!   by [`Subscription`] handles released on every selection change
//! - **Configuration Extension**: `playback.*` keys in pmoconfig
//!   (`pmoconfig` feature)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pmoplayback::{HeadlessEngine, PlaybackSession, SessionOptions};
//! use pmovideo::VideoApiClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VideoApiClient::new()?;
//!     let session = PlaybackSession::new(
//!         Arc::new(client),
//!         Arc::new(HeadlessEngine::new()),
//!         SessionOptions::default(),
//!     );
//!
//!     session.load_playlist().await;
//!     match session.current_video() {
//!         Some(video) => println!("Now playing: {}", video.title),
//!         None => println!("{}", session.error_message().unwrap_or_default()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod headless;
pub mod media;
pub mod session;
pub mod state;
pub mod subscription;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

pub use error::{PlaybackError, Result};
pub use headless::{HeadlessEngine, HeadlessResource};
pub use media::{FailureCallback, MediaEngine, MediaResource, ResourceStatus, StatusCallback};
pub use session::{DEFAULT_AUTOPLAY_DELAY, PlaybackSession, SessionOptions};
pub use state::{NO_VIDEOS_MESSAGE, SessionPhase, SessionSnapshot};
pub use subscription::{ListenerSet, Subscription};

#[cfg(feature = "pmoconfig")]
pub use config_ext::PlaybackConfigExt;
