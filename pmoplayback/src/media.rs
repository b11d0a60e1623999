//! Media resource adapter.
//!
//! The session never talks to a decoder directly. It drives one
//! [`MediaResource`] at a time, created through a [`MediaEngine`]. Native
//! players (AVFoundation, GStreamer, libmpv, ...) plug in by implementing
//! these two traits.
//!
//! ## Threading
//!
//! Callbacks registered with [`MediaResource::on_failure`] and
//! [`MediaResource::on_status_change`] may be invoked from any thread,
//! including synchronously from inside `play`/`pause`. The session only
//! forwards them to its own event task, so adapters do not need to defer
//! them.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::Result;
use crate::subscription::Subscription;

/// Playback status reported by a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceStatus {
    /// No item, or the item is not started yet.
    Idle,
    Playing,
    Paused,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Idle => "IDLE",
            ResourceStatus::Playing => "PLAYING",
            ResourceStatus::Paused => "PAUSED",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called with a human readable description of a playback failure.
pub type FailureCallback = Box<dyn Fn(String) + Send + Sync>;

/// Called with the new status after every status change.
pub type StatusCallback = Box<dyn Fn(ResourceStatus) + Send + Sync>;

/// One playable item holder.
pub trait MediaResource: Send + Sync {
    /// Loads `url` in place of the current item.
    fn replace_item(&self, url: &Url) -> Result<()>;

    /// Removes the current item, leaving the resource idle.
    fn clear_item(&self);

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn status(&self) -> ResourceStatus;

    /// Registers a playback-failure listener.
    fn on_failure(&self, callback: FailureCallback) -> Subscription;

    /// Registers a status-change listener.
    fn on_status_change(&self, callback: StatusCallback) -> Subscription;

    /// Releases the native resources. The resource is unusable afterwards.
    fn dispose(&self);
}

/// Factory for media resources.
pub trait MediaEngine: Send + Sync {
    fn create(&self, url: &Url) -> Result<Arc<dyn MediaResource>>;
}

impl<T: MediaEngine + ?Sized> MediaEngine for Arc<T> {
    fn create(&self, url: &Url) -> Result<Arc<dyn MediaResource>> {
        (**self).create(url)
    }
}
