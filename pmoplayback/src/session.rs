//! Playback session controller.
//!
//! A [`PlaybackSession`] fetches the catalogue, keeps track of the current
//! video and owns the single media resource playing it.
//!
//! ## Single writer
//!
//! All state lives in one `std::sync::Mutex`. Public methods mutate it in
//! short critical sections that never cross an `.await`, and every
//! critical section ends by publishing a [`SessionSnapshot`] on a `watch`
//! channel while the lock is still held, so observers never see a torn
//! `current_index` / resource pair.
//!
//! Resource callbacks do not touch the state. They are turned into
//! `ResourceEvent`s tagged with the selection generation and handed to
//! the session event task, which applies them under the same lock and
//! drops those belonging to an older selection.
//!
//! ## Deferred play
//!
//! Auto-play waits `autoplay_delay` before calling `play` so the new item
//! can settle. The pending play carries the generation of the selection
//! that scheduled it and is discarded if another selection happened in
//! between.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use pmovideo::{Video, VideoFetcher};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{PlaybackError, Result};
use crate::media::{MediaEngine, MediaResource, ResourceStatus};
use crate::state::{
    NO_VIDEOS_MESSAGE, SessionPhase, SessionSnapshot, SessionState, load_error_message,
    network_error_message, playback_error_message,
};

/// Delay before an auto-play is issued
pub const DEFAULT_AUTOPLAY_DELAY: Duration = Duration::from_millis(100);

/// Session tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Wait before issuing an auto-play. Zero plays immediately.
    pub autoplay_delay: Duration,
    /// Start a catalogue load as soon as the session is created.
    pub autoload: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autoplay_delay: DEFAULT_AUTOPLAY_DELAY,
            autoload: false,
        }
    }
}

impl SessionOptions {
    pub fn with_autoplay_delay(mut self, delay: Duration) -> Self {
        self.autoplay_delay = delay;
        self
    }

    pub fn with_autoload(mut self, autoload: bool) -> Self {
        self.autoload = autoload;
        self
    }
}

/// Notification coming from the media resource of one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ResourceEvent {
    Failed { generation: u64, description: String },
    StatusChanged { generation: u64, status: ResourceStatus },
}

impl ResourceEvent {
    fn generation(&self) -> u64 {
        match self {
            ResourceEvent::Failed { generation, .. } => *generation,
            ResourceEvent::StatusChanged { generation, .. } => *generation,
        }
    }
}

struct SessionInner {
    fetcher: Arc<dyn VideoFetcher>,
    engine: Arc<dyn MediaEngine>,
    options: SessionOptions,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: mpsc::UnboundedSender<ResourceEvent>,
    // Sérialise les chargements concurrents
    load_gate: tokio::sync::Mutex<()>,
}

impl SessionInner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` on the state and publishes the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.lock_state();
        let result = f(&mut state);
        let snapshot = state.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
        result
    }

    /// Attaches the video at `index` to the media resource.
    ///
    /// Returns the generation of a play that must be scheduled, if any.
    fn select_locked(
        &self,
        state: &mut SessionState,
        index: usize,
        explicit_auto_play: bool,
    ) -> Option<u64> {
        if index >= state.playlist.len() {
            warn!(
                index,
                len = state.playlist.len(),
                "Selection out of range, falling back to the first video"
            );
            state.current_index = 0;
            return None;
        }

        let was_playing = state.is_playing;
        state.generation += 1;
        let generation = state.generation;

        state.release_subscriptions();
        if let Some(resource) = &state.active_resource {
            if let Err(err) = resource.pause() {
                debug!(error = %err, "Cannot pause previous item");
            }
            resource.clear_item();
        }

        state.current_index = index;
        let video = &state.playlist[index];
        let stream_url = video.stream_url.clone();
        debug!(index, id = %video.id, title = %video.title, generation, "Selecting video");

        let url = match Url::parse(&stream_url) {
            Ok(url) => url,
            Err(source) => {
                let err = PlaybackError::InvalidMediaUrl {
                    url: stream_url,
                    source,
                };
                warn!(index, error = %err, "Cannot attach video");
                state.error_message = Some(err.to_string());
                state.dispose_resource();
                return None;
            }
        };

        let previous = state.active_resource.take();
        let resource = match self.attach(previous, &url) {
            Ok(resource) => resource,
            Err(err) => {
                warn!(index, error = %err, "Cannot create media resource");
                state.error_message = Some(playback_error_message(&err.to_string()));
                state.dispose_resource();
                return None;
            }
        };

        let events = self.events.clone();
        state
            .subscriptions
            .push(resource.on_failure(Box::new(move |description: String| {
                let _ = events.send(ResourceEvent::Failed {
                    generation,
                    description,
                });
            })));
        let events = self.events.clone();
        state
            .subscriptions
            .push(resource.on_status_change(Box::new(move |status: ResourceStatus| {
                let _ = events.send(ResourceEvent::StatusChanged { generation, status });
            })));
        state.active_resource = Some(resource.clone());

        // La playlist n'est jamais vide ici
        let should_auto_play = explicit_auto_play || index == 0 || was_playing;
        if should_auto_play {
            state.is_playing = true;
            Some(generation)
        } else {
            if let Err(err) = resource.pause() {
                debug!(error = %err, "Cannot pause new item");
            }
            state.is_playing = false;
            None
        }
    }

    /// Reuses `previous` when it accepts the new item, creates a resource
    /// otherwise.
    fn attach(
        &self,
        previous: Option<Arc<dyn MediaResource>>,
        url: &Url,
    ) -> Result<Arc<dyn MediaResource>> {
        if let Some(resource) = previous {
            match resource.replace_item(url) {
                Ok(()) => return Ok(resource),
                Err(err) => {
                    warn!(error = %err, "Cannot reuse media resource, creating a new one");
                    resource.dispose();
                }
            }
        }
        self.engine.create(url)
    }

    fn schedule_play(self: &Arc<Self>, generation: u64) {
        let delay = self.options.autoplay_delay;
        if delay.is_zero() {
            self.play_if_current(generation);
            return;
        }

        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = session.upgrade() {
                inner.play_if_current(generation);
            }
        });
    }

    fn play_if_current(&self, generation: u64) {
        self.update(|state| {
            if state.generation != generation {
                debug!(
                    generation,
                    current = state.generation,
                    "Dropping stale deferred play"
                );
                return;
            }
            let Some(resource) = state.active_resource.clone() else {
                return;
            };
            match resource.play() {
                Ok(()) => state.is_playing = true,
                Err(err) => {
                    warn!(error = %err, "Auto-play failed");
                    state.error_message = Some(playback_error_message(&err.to_string()));
                    state.is_playing = false;
                }
            }
        });
    }

    fn apply_event(&self, event: ResourceEvent) {
        self.update(|state| {
            if event.generation() != state.generation {
                debug!(?event, current = state.generation, "Ignoring stale resource event");
                return;
            }
            match event {
                ResourceEvent::Failed { description, .. } => {
                    warn!(index = state.current_index, %description, "Playback failed");
                    state.error_message = Some(playback_error_message(&description));
                }
                ResourceEvent::StatusChanged { status, .. } => {
                    debug!(%status, "Media status changed");
                    state.is_playing = status == ResourceStatus::Playing;
                }
            }
        });
    }
}

/// Releases the resource and invalidates pending plays and events.
fn teardown(state: &mut SessionState) {
    state.generation += 1;
    state.dispose_resource();
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        teardown(state);
    }
}

/// Clears `is_loading` however the load ends, future drop included.
struct LoadingGuard<'a> {
    inner: &'a SessionInner,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.inner.update(|state| state.is_loading = false);
    }
}

async fn forward_events(
    session: Weak<SessionInner>,
    mut events: mpsc::UnboundedReceiver<ResourceEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = session.upgrade() else {
            break;
        };
        inner.apply_event(event);
    }
    debug!("Session event task stopped");
}

/// Handle on a playback session. Clones share the same session.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl PlaybackSession {
    /// Creates a session.
    ///
    /// Must be called from within a Tokio runtime: the session spawns its
    /// event task, and the initial load when `options.autoload` is set.
    pub fn new(
        fetcher: Arc<dyn VideoFetcher>,
        engine: Arc<dyn MediaEngine>,
        options: SessionOptions,
    ) -> Self {
        let state = SessionState::default();
        let (snapshots, _) = watch::channel(state.snapshot());
        let (events, events_rx) = mpsc::unbounded_channel();
        let autoload = options.autoload;

        let inner = Arc::new(SessionInner {
            fetcher,
            engine,
            options,
            state: Mutex::new(state),
            snapshots,
            events,
            load_gate: tokio::sync::Mutex::new(()),
        });
        tokio::spawn(forward_events(Arc::downgrade(&inner), events_rx));

        let session = Self { inner };
        if autoload {
            let session = session.clone();
            tokio::spawn(async move { session.load_playlist().await });
        }
        session
    }

    /// Fetches the catalogue and selects its first video.
    ///
    /// Failures end up in [`error_message`](Self::error_message). Calls are
    /// serialized: a second call waits for the first one to finish.
    pub async fn load_playlist(&self) {
        let _gate = self.inner.load_gate.lock().await;

        self.inner.update(|state| {
            state.is_loading = true;
            state.error_message = None;
        });
        let _loading = LoadingGuard { inner: &self.inner };

        info!("Loading video catalogue");
        let result = self.inner.fetcher.fetch_videos().await;

        let scheduled = self.inner.update(|state| match result {
            Ok(videos) if !videos.is_empty() => {
                info!(count = videos.len(), "Video catalogue loaded");
                state.playlist = Arc::new(videos);
                if state.current_index >= state.playlist.len() {
                    state.current_index = 0;
                }
                self.inner.select_locked(state, 0, false)
            }
            Ok(_) => {
                warn!("Video catalogue is empty");
                state.reset(NO_VIDEOS_MESSAGE.to_string());
                None
            }
            Err(err) if err.is_network() => {
                warn!(error = %err, code = err.code(), "Network error while loading videos");
                state.reset(network_error_message(&err));
                None
            }
            Err(err) => {
                warn!(error = %err, "Failed to load videos");
                state.reset(load_error_message(&err));
                None
            }
        });

        if let Some(generation) = scheduled {
            self.inner.schedule_play(generation);
        }
    }

    /// Same as [`load_playlist`](Self::load_playlist), for retry buttons.
    pub async fn retry(&self) {
        self.load_playlist().await;
    }

    /// Attaches the video at `index`.
    ///
    /// An index outside the playlist resets the position to the first
    /// video without attaching anything.
    pub fn select_video(&self, index: usize, auto_play: bool) {
        let scheduled = self
            .inner
            .update(|state| self.inner.select_locked(state, index, auto_play));
        if let Some(generation) = scheduled {
            self.inner.schedule_play(generation);
        }
    }

    /// Pauses when playing, plays otherwise. No-op without a resource.
    pub fn play_pause(&self) {
        self.inner.update(|state| {
            let Some(resource) = state.active_resource.clone() else {
                return;
            };
            let result = if resource.status() == ResourceStatus::Playing {
                resource.pause()
            } else {
                resource.play()
            };
            if let Err(err) = result {
                warn!(error = %err, "Play/pause failed");
                state.error_message = Some(playback_error_message(&err.to_string()));
            }
        });
    }

    pub fn go_next(&self) {
        self.step(|state| {
            state
                .can_go_next()
                .then(|| state.current_index + 1)
        });
    }

    pub fn go_previous(&self) {
        self.step(|state| {
            state
                .can_go_previous()
                .then(|| state.current_index - 1)
        });
    }

    fn step(&self, target: impl FnOnce(&SessionState) -> Option<usize>) {
        let scheduled = self.inner.update(|state| {
            let index = target(state)?;
            let keep_playing = state.is_playing;
            self.inner.select_locked(state, index, keep_playing)
        });
        if let Some(generation) = scheduled {
            self.inner.schedule_play(generation);
        }
    }

    /// Overrides the current position without touching the resource.
    pub fn set_current_index(&self, index: usize) {
        self.inner.update(|state| state.current_index = index);
    }

    /// Disposes the resource and releases every listener. The playlist is
    /// kept, a later selection attaches a fresh resource.
    pub fn shutdown(&self) {
        info!("Shutting down playback session");
        self.inner.update(teardown);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn playlist(&self) -> Arc<Vec<Video>> {
        self.inner.snapshots.borrow().playlist.clone()
    }

    pub fn current_index(&self) -> usize {
        self.inner.snapshots.borrow().current_index
    }

    pub fn is_loading(&self) -> bool {
        self.inner.snapshots.borrow().is_loading
    }

    pub fn is_playing(&self) -> bool {
        self.inner.snapshots.borrow().is_playing
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.snapshots.borrow().error_message.clone()
    }

    pub fn current_video(&self) -> Option<Video> {
        self.inner.snapshots.borrow().current_video().cloned()
    }

    pub fn can_go_next(&self) -> bool {
        self.inner.snapshots.borrow().can_go_next()
    }

    pub fn can_go_previous(&self) -> bool {
        self.inner.snapshots.borrow().can_go_previous()
    }

    pub fn has_active_resource(&self) -> bool {
        self.inner.snapshots.borrow().has_active_resource
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.snapshots.borrow().phase()
    }
}
