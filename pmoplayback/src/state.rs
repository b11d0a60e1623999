//! Session state and the snapshots published to observers.

use std::sync::Arc;

use pmovideo::Video;

use crate::media::MediaResource;
use crate::subscription::Subscription;

/// Message shown when the catalogue is empty.
pub const NO_VIDEOS_MESSAGE: &str = "No videos available";

pub(crate) fn network_error_message(err: &pmovideo::Error) -> String {
    format!("Network error: {err}\n\nError code: {}", err.code())
}

pub(crate) fn load_error_message(err: &pmovideo::Error) -> String {
    format!("Failed to load videos\n\n{err}")
}

pub(crate) fn playback_error_message(description: &str) -> String {
    format!("Video playback error: {description}")
}

/// Coarse state of the session, derived from a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing loaded yet.
    Empty,
    /// A catalogue fetch is in flight.
    Loading,
    /// A playlist is loaded. A playback error may still be reported
    /// through [`SessionSnapshot::error_message`].
    Ready { index: usize },
    /// The last fetch failed or returned nothing.
    Error { reason: String },
}

/// Immutable view of the session, published after every mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub playlist: Arc<Vec<Video>>,
    pub current_index: usize,
    pub is_loading: bool,
    pub is_playing: bool,
    pub error_message: Option<String>,
    /// True when a media resource holds the current video.
    pub has_active_resource: bool,
    /// Selection generation, advanced by every selection.
    pub generation: u64,
}

impl SessionSnapshot {
    /// Video at the current index, if the index is in range.
    pub fn current_video(&self) -> Option<&Video> {
        self.playlist.get(self.current_index)
    }

    pub fn can_go_next(&self) -> bool {
        !self.playlist.is_empty() && self.current_index < self.playlist.len() - 1
    }

    pub fn can_go_previous(&self) -> bool {
        !self.playlist.is_empty() && self.current_index > 0
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Loading
        } else if !self.playlist.is_empty() {
            SessionPhase::Ready {
                index: self.current_index,
            }
        } else if let Some(reason) = &self.error_message {
            SessionPhase::Error {
                reason: reason.clone(),
            }
        } else {
            SessionPhase::Empty
        }
    }
}

/// Mutable record owned by the session. Only the session writes it.
pub(crate) struct SessionState {
    pub(crate) playlist: Arc<Vec<Video>>,
    pub(crate) current_index: usize,
    pub(crate) is_loading: bool,
    pub(crate) is_playing: bool,
    pub(crate) error_message: Option<String>,
    pub(crate) active_resource: Option<Arc<dyn MediaResource>>,
    /// Listeners registered for the current video.
    pub(crate) subscriptions: Vec<Subscription>,
    pub(crate) generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            playlist: Arc::new(Vec::new()),
            current_index: 0,
            is_loading: false,
            is_playing: false,
            error_message: None,
            active_resource: None,
            subscriptions: Vec::new(),
            generation: 0,
        }
    }
}

impl SessionState {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            playlist: self.playlist.clone(),
            current_index: self.current_index,
            is_loading: self.is_loading,
            is_playing: self.is_playing,
            error_message: self.error_message.clone(),
            has_active_resource: self.active_resource.is_some(),
            generation: self.generation,
        }
    }

    pub(crate) fn can_go_next(&self) -> bool {
        !self.playlist.is_empty() && self.current_index < self.playlist.len() - 1
    }

    pub(crate) fn can_go_previous(&self) -> bool {
        !self.playlist.is_empty() && self.current_index > 0
    }

    /// Cancels every listener of the current video.
    pub(crate) fn release_subscriptions(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
    }

    /// Releases listeners, then disposes the resource.
    pub(crate) fn dispose_resource(&mut self) {
        self.release_subscriptions();
        if let Some(resource) = self.active_resource.take() {
            resource.dispose();
        }
        self.is_playing = false;
    }

    /// Back to an empty playlist with no resource attached.
    ///
    /// Advances the generation so events queued for the last selection and
    /// pending plays are dropped.
    pub(crate) fn reset(&mut self, error_message: String) {
        self.generation += 1;
        self.dispose_resource();
        self.playlist = Arc::new(Vec::new());
        self.current_index = 0;
        self.error_message = Some(error_message);
    }
}
