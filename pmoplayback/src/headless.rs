//! In-process media engine without decoding.
//!
//! `HeadlessEngine` keeps the playback status in memory and emits the same
//! notifications a native player would. The console front-end uses it when
//! no real output is available, and the test suite uses it to observe what
//! the session asks of its resource.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use url::Url;

use crate::error::{PlaybackError, Result};
use crate::media::{FailureCallback, MediaEngine, MediaResource, ResourceStatus, StatusCallback};
use crate::subscription::{ListenerSet, Subscription};

/// Engine creating [`HeadlessResource`]s.
#[derive(Clone, Default)]
pub struct HeadlessEngine {
    resources: Arc<Mutex<Vec<Arc<HeadlessResource>>>>,
    refuse_create: Arc<AtomicBool>,
}

impl HeadlessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn resources(&self) -> MutexGuard<'_, Vec<Arc<HeadlessResource>>> {
        self.resources
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of resources created so far.
    pub fn created_count(&self) -> usize {
        self.resources().len()
    }

    /// Makes every following `create` fail, or succeed again.
    pub fn refuse_creation(&self, refuse: bool) {
        self.refuse_create.store(refuse, Ordering::SeqCst);
    }

    /// Most recently created resource.
    pub fn last_resource(&self) -> Option<Arc<HeadlessResource>> {
        self.resources().last().cloned()
    }
}

impl MediaEngine for HeadlessEngine {
    fn create(&self, url: &Url) -> Result<Arc<dyn MediaResource>> {
        if self.refuse_create.load(Ordering::SeqCst) {
            return Err(PlaybackError::resource_creation(format!("no decoder for {url}")));
        }
        let resource = Arc::new(HeadlessResource::new(url.clone()));
        self.resources().push(resource.clone());
        debug!(%url, "Created headless media resource");
        Ok(resource)
    }
}

#[derive(Debug)]
struct ResourceState {
    item: Option<Url>,
    status: ResourceStatus,
    disposed: bool,
}

/// Resource tracking its item and status in memory.
pub struct HeadlessResource {
    state: Mutex<ResourceState>,
    failures: ListenerSet<String>,
    statuses: ListenerSet<ResourceStatus>,
    play_calls: AtomicUsize,
    pause_calls: AtomicUsize,
}

impl HeadlessResource {
    pub fn new(url: Url) -> Self {
        Self {
            state: Mutex::new(ResourceState {
                item: Some(url),
                status: ResourceStatus::Idle,
                disposed: false,
            }),
            failures: ListenerSet::new(),
            statuses: ListenerSet::new(),
            play_calls: AtomicUsize::new(0),
            pause_calls: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, ResourceState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sets the status and notifies listeners when it changed.
    fn transition(&self, status: ResourceStatus) {
        let changed = {
            let mut state = self.state();
            let changed = state.status != status;
            state.status = status;
            changed
        };
        if changed {
            self.statuses.notify(status);
        }
    }

    /// Simulates a mid-playback failure: the item stops and failure
    /// listeners receive `description`.
    pub fn fail(&self, description: impl Into<String>) {
        self.transition(ResourceStatus::Paused);
        self.failures.notify(description.into());
    }

    pub fn current_item(&self) -> Option<Url> {
        self.state().item.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.state().disposed
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls.load(Ordering::SeqCst)
    }

    /// Number of registered listeners, both channels included.
    pub fn listener_count(&self) -> usize {
        self.failures.len() + self.statuses.len()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.state().disposed {
            Err(PlaybackError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl MediaResource for HeadlessResource {
    fn replace_item(&self, url: &Url) -> Result<()> {
        self.ensure_alive()?;
        self.state().item = Some(url.clone());
        self.transition(ResourceStatus::Idle);
        Ok(())
    }

    fn clear_item(&self) {
        self.state().item = None;
        self.transition(ResourceStatus::Idle);
    }

    fn play(&self) -> Result<()> {
        self.ensure_alive()?;
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        // Sans item, play ne fait rien
        if self.state().item.is_some() {
            self.transition(ResourceStatus::Playing);
        }
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.ensure_alive()?;
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        if self.state().item.is_some() {
            self.transition(ResourceStatus::Paused);
        }
        Ok(())
    }

    fn status(&self) -> ResourceStatus {
        self.state().status
    }

    fn on_failure(&self, callback: FailureCallback) -> Subscription {
        self.failures.add(callback)
    }

    fn on_status_change(&self, callback: StatusCallback) -> Subscription {
        self.statuses.add(callback)
    }

    fn dispose(&self) {
        {
            let mut state = self.state();
            state.disposed = true;
            state.item = None;
            state.status = ResourceStatus::Idle;
        }
        self.failures.clear();
        self.statuses.clear();
    }
}
