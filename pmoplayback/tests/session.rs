use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pmoplayback::{
    HeadlessEngine, HeadlessResource, MediaResource, NO_VIDEOS_MESSAGE, PlaybackSession,
    ResourceStatus, SessionOptions, SessionPhase, SessionSnapshot,
};
use pmovideo::{Author, Error, Video, VideoApiClient, VideoFetcher};
use tokio::sync::Notify;

type Response = Box<dyn Fn(usize) -> pmovideo::Result<Vec<Video>> + Send + Sync>;

/// Fetcher answering from a closure, counting its calls.
struct MockFetcher {
    calls: AtomicUsize,
    respond: Response,
}

impl MockFetcher {
    fn new(respond: impl Fn(usize) -> pmovideo::Result<Vec<Video>> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    fn videos(videos: Vec<Video>) -> Arc<Self> {
        Self::new(move |_| Ok(videos.clone()))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoFetcher for MockFetcher {
    async fn fetch_videos(&self) -> pmovideo::Result<Vec<Video>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(call)
    }
}

/// Fetcher blocking until released, to observe in-flight loads.
struct GatedFetcher {
    calls: AtomicUsize,
    release: Notify,
    videos: Vec<Video>,
}

impl GatedFetcher {
    fn new(videos: Vec<Video>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            release: Notify::new(),
            videos,
        })
    }
}

#[async_trait]
impl VideoFetcher for GatedFetcher {
    async fn fetch_videos(&self) -> pmovideo::Result<Vec<Video>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(self.videos.clone())
    }
}

fn video(id: &str, day: u32) -> Video {
    Video {
        id: id.to_string(),
        title: format!("Video {id}"),
        stream_url: format!("https://example.com/video{id}.m3u8"),
        download_url: format!("https://example.com/video{id}.mp4"),
        description: format!("Description of video {id}"),
        published_at: format!("2025-01-{day:02}T10:00:00Z"),
        author: Author {
            id: "author1".to_string(),
            name: "John Doe".to_string(),
        },
    }
}

/// Three videos, already newest first.
fn catalogue() -> Vec<Video> {
    vec![video("1", 3), video("2", 2), video("3", 1)]
}

fn immediate() -> SessionOptions {
    SessionOptions::default().with_autoplay_delay(Duration::ZERO)
}

fn session_with(
    fetcher: Arc<dyn VideoFetcher>,
    options: SessionOptions,
) -> (PlaybackSession, HeadlessEngine) {
    let engine = HeadlessEngine::new();
    let session = PlaybackSession::new(fetcher, Arc::new(engine.clone()), options);
    (session, engine)
}

fn ids(session: &PlaybackSession) -> Vec<String> {
    session.playlist().iter().map(|v| v.id.clone()).collect()
}

fn resource(engine: &HeadlessEngine) -> Arc<HeadlessResource> {
    engine.last_resource().expect("no media resource created")
}

/// Attend qu'un snapshot vérifie `predicate`
async fn wait_until(
    session: &PlaybackSession,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut rx = session.subscribe();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session state")
        .expect("session dropped")
        .clone()
}

#[tokio::test]
async fn test_fresh_session_defaults() {
    let (session, _engine) = session_with(MockFetcher::videos(catalogue()), immediate());

    let snapshot = session.snapshot();
    assert!(snapshot.playlist.is_empty());
    assert_eq!(snapshot.current_index, 0);
    assert!(!snapshot.is_loading);
    assert!(!snapshot.is_playing);
    assert!(snapshot.error_message.is_none());
    assert!(!snapshot.has_active_resource);
    assert!(session.current_video().is_none());
    assert!(!session.can_go_next());
    assert!(!session.can_go_previous());
    assert_eq!(session.phase(), SessionPhase::Empty);
}

#[tokio::test]
async fn test_load_playlist_success() {
    let fetcher = MockFetcher::videos(catalogue());
    let (session, engine) = session_with(fetcher.clone(), immediate());

    session.load_playlist().await;

    assert_eq!(ids(&session), vec!["1", "2", "3"]);
    assert_eq!(session.current_index(), 0);
    assert!(session.error_message().is_none());
    assert!(!session.is_loading());
    assert!(session.has_active_resource());
    assert_eq!(fetcher.calls(), 1);

    let resource = resource(&engine);
    assert_eq!(engine.created_count(), 1);
    assert_eq!(
        resource.current_item().unwrap().as_str(),
        "https://example.com/video1.m3u8"
    );
}

#[tokio::test]
async fn test_first_video_autoplays() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());

    session.load_playlist().await;

    assert!(session.is_playing());
    let resource = resource(&engine);
    assert_eq!(resource.play_calls(), 1);
    assert_eq!(resource.status(), ResourceStatus::Playing);

    // L'événement Playing ne doit pas faire repasser is_playing à false
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(session.is_playing());
}

#[tokio::test]
async fn test_empty_catalogue() {
    let (session, engine) = session_with(MockFetcher::videos(Vec::new()), immediate());

    session.load_playlist().await;

    assert!(session.playlist().is_empty());
    assert_eq!(session.error_message().as_deref(), Some(NO_VIDEOS_MESSAGE));
    assert_eq!(session.current_index(), 0);
    assert!(!session.has_active_resource());
    assert!(!session.is_loading());
    assert_eq!(engine.created_count(), 0);
    assert_eq!(
        session.phase(),
        SessionPhase::Error {
            reason: "No videos available".to_string()
        }
    );
}

#[tokio::test]
async fn test_network_error_from_http_client() {
    // Port libéré juste avant : la connexion est refusée
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = VideoApiClient::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let (session, _engine) = session_with(Arc::new(client), immediate());

    session.load_playlist().await;

    let message = session.error_message().unwrap();
    assert!(message.starts_with("Network error: "), "{message}");
    assert!(message.contains("\n\nError code: "), "{message}");
    assert!(session.playlist().is_empty());
    assert!(!session.has_active_resource());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_decode_error_uses_generic_message() {
    let fetcher = MockFetcher::new(|_| {
        let err = serde_json::from_str::<Vec<Video>>("{").unwrap_err();
        Err(Error::Decode(err))
    });
    let (session, _engine) = session_with(fetcher, immediate());

    session.load_playlist().await;

    let message = session.error_message().unwrap();
    assert!(message.starts_with("Failed to load videos\n\n"), "{message}");
    assert!(session.playlist().is_empty());
}

#[tokio::test]
async fn test_error_after_success_resets_session() {
    let fetcher = MockFetcher::new(|call| {
        if call == 0 {
            Ok(catalogue())
        } else {
            Err(Error::HttpStatus(500))
        }
    });
    let (session, engine) = session_with(fetcher, immediate());

    session.load_playlist().await;
    session.select_video(2, false);
    session.load_playlist().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(session.playlist().is_empty());
    assert_eq!(session.current_index(), 0);
    assert!(!session.has_active_resource());
    assert!(!session.is_playing());
    assert!(resource(&engine).is_disposed());
    assert_eq!(
        session.error_message().as_deref(),
        Some("Network error: Bad server response (HTTP status 500)\n\nError code: bad-server-response")
    );
}

#[tokio::test]
async fn test_current_video_follows_index() {
    let (session, _engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;

    session.set_current_index(1);
    assert_eq!(session.current_video().unwrap().id, "2");

    session.set_current_index(10);
    assert!(session.current_video().is_none());
    assert!(!session.can_go_next());
}

#[tokio::test]
async fn test_navigation_bounds() {
    let (session, _engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;

    assert!(session.can_go_next());
    assert!(!session.can_go_previous());

    session.select_video(2, false);
    assert!(!session.can_go_next());
    assert!(session.can_go_previous());

    // Sans effet en bout de liste
    session.go_next();
    assert_eq!(session.current_index(), 2);

    session.select_video(0, false);
    session.go_previous();
    assert_eq!(session.current_index(), 0);
}

#[tokio::test]
async fn test_reload_is_idempotent() {
    let fetcher = MockFetcher::videos(catalogue());
    let (session, engine) = session_with(fetcher.clone(), immediate());

    session.load_playlist().await;
    let first = session.snapshot();
    session.retry().await;
    let second = session.snapshot();

    assert_eq!(first.playlist, second.playlist);
    assert_eq!(second.current_index, 0);
    assert!(second.error_message.is_none());
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(engine.created_count(), 1);
    assert_eq!(resource(&engine).listener_count(), 2);
}

#[tokio::test]
async fn test_stale_deferred_play_is_dropped() {
    let options = SessionOptions::default().with_autoplay_delay(Duration::from_millis(50));
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), options);

    session.load_playlist().await;
    session.select_video(1, false);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let resource = resource(&engine);
    assert_eq!(resource.play_calls(), 1);
    assert_eq!(
        resource.current_item().unwrap().as_str(),
        "https://example.com/video2.m3u8"
    );
    assert_eq!(session.current_index(), 1);
    assert!(session.is_playing());
}

#[tokio::test]
async fn test_deferred_play_skipped_after_shutdown() {
    let options = SessionOptions::default().with_autoplay_delay(Duration::from_millis(50));
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), options);

    session.load_playlist().await;
    assert!(session.is_playing());
    session.shutdown();

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(resource(&engine).play_calls(), 0);
    assert!(!session.is_playing());
}

#[tokio::test]
async fn test_deferred_play_skipped_when_catalogue_empties() {
    let options = SessionOptions::default().with_autoplay_delay(Duration::from_millis(50));
    let fetcher = MockFetcher::new(|call| if call == 0 { Ok(catalogue()) } else { Ok(Vec::new()) });
    let (session, engine) = session_with(fetcher, options);

    session.load_playlist().await;
    session.load_playlist().await;

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(resource(&engine).play_calls(), 0);
    assert!(!session.is_playing());
    assert_eq!(session.error_message().as_deref(), Some(NO_VIDEOS_MESSAGE));
}

#[tokio::test]
async fn test_queued_events_dropped_by_failed_reload() {
    let fetcher = MockFetcher::new(|call| {
        if call == 0 {
            Ok(catalogue())
        } else {
            Err(Error::HttpStatus(500))
        }
    });
    let (session, engine) = session_with(fetcher, immediate());
    session.load_playlist().await;
    let resource = resource(&engine);

    // Émis avant le rechargement, encore dans la file d'événements
    resource.fail("decoder crashed");
    resource.play().unwrap();
    session.load_playlist().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let message = session.error_message().unwrap();
    assert!(message.starts_with("Network error: "), "{message}");
    assert!(!session.is_playing());
    assert!(!session.has_active_resource());
    assert!(session.playlist().is_empty());
}

#[tokio::test]
async fn test_queued_events_dropped_by_empty_reload() {
    let fetcher = MockFetcher::new(|call| if call == 0 { Ok(catalogue()) } else { Ok(Vec::new()) });
    let (session, engine) = session_with(fetcher, immediate());
    session.load_playlist().await;
    let resource = resource(&engine);

    resource.fail("decoder crashed");
    session.load_playlist().await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(session.error_message().as_deref(), Some(NO_VIDEOS_MESSAGE));
    assert!(!session.is_playing());
    assert_eq!(
        session.phase(),
        SessionPhase::Error {
            reason: NO_VIDEOS_MESSAGE.to_string()
        }
    );
}

#[tokio::test]
async fn test_resource_creation_failure() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    engine.refuse_creation(true);

    session.load_playlist().await;

    let message = session.error_message().unwrap();
    assert!(
        message.starts_with("Video playback error: Cannot create media resource: "),
        "{message}"
    );
    assert_eq!(session.playlist().len(), 3);
    assert!(!session.has_active_resource());
    assert!(!session.is_playing());
    assert_eq!(engine.created_count(), 0);

    engine.refuse_creation(false);
    session.select_video(1, false);
    assert!(session.has_active_resource());
    assert_eq!(engine.created_count(), 1);
}

#[tokio::test]
async fn test_invalid_stream_url() {
    let mut videos = catalogue();
    videos[1].stream_url = "not a url".to_string();
    let (session, engine) = session_with(MockFetcher::videos(videos), immediate());

    session.load_playlist().await;
    session.select_video(1, false);

    assert_eq!(
        session.error_message().as_deref(),
        Some("Invalid video URL: not a url")
    );
    assert_eq!(session.current_index(), 1);
    assert!(!session.has_active_resource());
    assert!(!session.is_playing());
    assert!(resource(&engine).is_disposed());

    // Une sélection valide recrée une ressource
    session.select_video(2, false);
    assert!(session.has_active_resource());
    assert_eq!(engine.created_count(), 2);
}

#[tokio::test]
async fn test_invalid_first_video_creates_nothing() {
    let mut videos = catalogue();
    videos[0].stream_url = String::new();
    let (session, engine) = session_with(MockFetcher::videos(videos), immediate());

    session.load_playlist().await;

    assert_eq!(session.error_message().as_deref(), Some("Invalid video URL: "));
    assert_eq!(session.playlist().len(), 3);
    assert_eq!(engine.created_count(), 0);
}

#[tokio::test]
async fn test_out_of_range_selection_resets_index() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;
    session.select_video(1, false);

    session.select_video(5, false);

    assert_eq!(session.current_index(), 0);
    assert!(session.error_message().is_none());
    assert_eq!(engine.created_count(), 1);
    assert_eq!(
        resource(&engine).current_item().unwrap().as_str(),
        "https://example.com/video2.m3u8"
    );
}

#[tokio::test]
async fn test_playback_failure_sets_error() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;

    resource(&engine).fail("The network connection was lost.");

    let snapshot = wait_until(&session, |s| s.error_message.is_some()).await;
    assert_eq!(
        snapshot.error_message.as_deref(),
        Some("Video playback error: The network connection was lost.")
    );
    assert_eq!(snapshot.playlist.len(), 3);
    assert_eq!(snapshot.current_index, 0);
    assert_eq!(snapshot.phase(), SessionPhase::Ready { index: 0 });

    let snapshot = wait_until(&session, |s| !s.is_playing).await;
    assert!(snapshot.has_active_resource);
}

#[tokio::test]
async fn test_status_changes_drive_is_playing() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;
    let resource = resource(&engine);

    resource.pause().unwrap();
    wait_until(&session, |s| !s.is_playing).await;

    resource.play().unwrap();
    wait_until(&session, |s| s.is_playing).await;
}

#[tokio::test]
async fn test_events_of_previous_video_are_ignored() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;
    let resource = resource(&engine);

    // Événements émis pour la vidéo 0, appliqués après la sélection suivante
    resource.fail("late failure");
    session.select_video(1, false);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(session.error_message().is_none());
    assert_eq!(session.current_index(), 1);
    assert!(session.is_playing());
    assert_eq!(resource.listener_count(), 2);

    // Ceux de la sélection courante passent
    resource.fail("current failure");
    let snapshot = wait_until(&session, |s| s.error_message.is_some()).await;
    assert_eq!(
        snapshot.error_message.as_deref(),
        Some("Video playback error: current failure")
    );
}

#[tokio::test]
async fn test_play_pause_toggles() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());

    // Sans ressource
    session.play_pause();
    assert!(!session.is_playing());

    session.load_playlist().await;
    let resource = resource(&engine);

    session.play_pause();
    assert_eq!(resource.status(), ResourceStatus::Paused);
    wait_until(&session, |s| !s.is_playing).await;

    session.play_pause();
    assert_eq!(resource.status(), ResourceStatus::Playing);
    wait_until(&session, |s| s.is_playing).await;
}

#[tokio::test]
async fn test_navigation_keeps_playing_state() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;
    let resource = resource(&engine);

    session.go_next();
    assert_eq!(session.current_index(), 1);
    assert!(session.is_playing());
    assert_eq!(resource.play_calls(), 2);
    assert_eq!(
        resource.current_item().unwrap().as_str(),
        "https://example.com/video2.m3u8"
    );

    session.play_pause();
    wait_until(&session, |s| !s.is_playing).await;

    session.go_next();
    assert_eq!(session.current_index(), 2);
    assert!(!session.is_playing());
    assert_eq!(resource.play_calls(), 2);

    session.go_previous();
    assert_eq!(session.current_index(), 1);
    assert!(!session.is_playing());
}

#[tokio::test]
async fn test_listeners_released_between_selections() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;

    session.select_video(1, false);
    session.select_video(2, true);
    session.select_video(0, false);

    assert_eq!(engine.created_count(), 1);
    assert_eq!(resource(&engine).listener_count(), 2);
}

#[tokio::test]
async fn test_is_loading_while_fetching() {
    let fetcher = GatedFetcher::new(catalogue());
    let (session, _engine) = session_with(fetcher.clone(), immediate());

    let load = tokio::spawn({
        let session = session.clone();
        async move { session.load_playlist().await }
    });

    let snapshot = wait_until(&session, |s| s.is_loading).await;
    assert_eq!(snapshot.phase(), SessionPhase::Loading);
    assert!(snapshot.error_message.is_none());

    fetcher.release.notify_one();
    load.await.unwrap();

    assert!(!session.is_loading());
    assert_eq!(session.playlist().len(), 3);
}

#[tokio::test]
async fn test_dropped_load_clears_loading_flag() {
    let fetcher = GatedFetcher::new(catalogue());
    let (session, _engine) = session_with(fetcher, immediate());

    let outcome = tokio::time::timeout(Duration::from_millis(50), session.load_playlist()).await;

    assert!(outcome.is_err());
    assert!(!session.is_loading());
    assert!(session.playlist().is_empty());
    assert!(session.error_message().is_none());
}

#[tokio::test]
async fn test_concurrent_loads_are_serialized() {
    let fetcher = GatedFetcher::new(catalogue());
    let (session, _engine) = session_with(fetcher.clone(), immediate());

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.load_playlist().await }
    });
    let second = tokio::spawn({
        let session = session.clone();
        async move { session.load_playlist().await }
    });

    wait_until(&session, |s| s.is_loading).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    fetcher.release.notify_one();
    fetcher.release.notify_one();
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert!(!session.is_loading());
    assert_eq!(session.playlist().len(), 3);
}

#[tokio::test]
async fn test_shutdown_releases_resource() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;
    let resource = resource(&engine);

    session.shutdown();

    assert!(!session.has_active_resource());
    assert!(!session.is_playing());
    assert!(resource.is_disposed());
    assert_eq!(resource.listener_count(), 0);
    assert_eq!(session.playlist().len(), 3);

    session.select_video(1, false);
    assert!(session.has_active_resource());
    assert_eq!(engine.created_count(), 2);
}

#[tokio::test]
async fn test_dropping_session_disposes_resource() {
    let (session, engine) = session_with(MockFetcher::videos(catalogue()), immediate());
    session.load_playlist().await;

    drop(session);

    assert!(resource(&engine).is_disposed());
}

#[tokio::test]
async fn test_autoload() {
    let fetcher = MockFetcher::videos(catalogue());
    let options = immediate().with_autoload(true);
    let (session, _engine) = session_with(fetcher.clone(), options);

    let snapshot = wait_until(&session, |s| !s.playlist.is_empty() && !s.is_loading).await;

    assert_eq!(snapshot.current_index, 0);
    assert!(snapshot.is_playing);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_phases() {
    let fetcher = MockFetcher::new(|call| {
        if call == 0 {
            Ok(catalogue())
        } else {
            Err(Error::other("catalogue unavailable"))
        }
    });
    let (session, _engine) = session_with(fetcher, immediate());
    assert_eq!(session.phase(), SessionPhase::Empty);

    session.load_playlist().await;
    assert_eq!(session.phase(), SessionPhase::Ready { index: 0 });

    session.select_video(2, false);
    assert_eq!(session.phase(), SessionPhase::Ready { index: 2 });

    session.load_playlist().await;
    assert_eq!(
        session.phase(),
        SessionPhase::Error {
            reason: "Failed to load videos\n\ncatalogue unavailable".to_string()
        }
    );
}
