//! BDD test world for notice sentinel service

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use cucumber::World;
use tokio::sync::Mutex;
use tokio::time::Instant;

use notice_sentinel::announcement::Announcement;
use notice_sentinel::config::{Config, LatestSelection, MarkerPolicy};
use notice_sentinel::engine::{Engine, EngineSettings, TickOutcome};
use notice_sentinel::fetcher::AnnouncementSource;
use notice_sentinel::io::{HttpClient, HttpResponse};
use notice_sentinel::notifier::{Email, Notifier};
use notice_sentinel::state::new_state_handle;
use notice_sentinel::NoticeError;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(300);

// --- Test doubles ---

/// A feed that replays scripted responses, then repeats the last one
#[derive(Debug, Default)]
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<Option<Vec<Announcement>>>>,
    fetches: Mutex<u32>,
}

impl ScriptedFeed {
    /// Queue a successful response listing `identifiers`, latest first
    pub async fn push_listing(&self, identifiers: &[&str]) {
        let items = identifiers
            .iter()
            .map(|id| Announcement::new(*id, format!("<p>Notice {}</p>", id)))
            .collect();
        self.responses.lock().await.push_back(Some(items));
    }

    /// Queue a fetch failure
    pub async fn push_failure(&self) {
        self.responses.lock().await.push_back(None);
    }

    pub async fn fetch_count(&self) -> u32 {
        *self.fetches.lock().await
    }
}

#[async_trait::async_trait]
impl AnnouncementSource for ScriptedFeed {
    fn describe(&self) -> &str {
        "scripted feed"
    }

    async fn fetch(&self) -> notice_sentinel::Result<Vec<Announcement>> {
        *self.fetches.lock().await += 1;
        let mut responses = self.responses.lock().await;
        let response = if responses.len() > 1 {
            responses.pop_front().flatten()
        } else {
            responses.front().cloned().flatten()
        };
        response.ok_or_else(|| NoticeError::Fetch("connection refused".to_string()))
    }
}

/// A notifier that records every email and succeeds or fails on demand
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub reject: bool,
    pub sent: Mutex<Vec<Email>>,
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn type_name(&self) -> &str {
        "recording"
    }

    async fn send(&self, email: &Email) -> notice_sentinel::Result<()> {
        self.sent.lock().await.push(email.clone());
        if self.reject {
            Err(NoticeError::Send("535 authentication failed".to_string()))
        } else {
            Ok(())
        }
    }
}

/// An HTTP client that answers every GET with a canned response
#[derive(Debug, Clone)]
pub struct CannedHttpClient {
    pub response: Option<HttpResponse>,
}

#[async_trait::async_trait]
impl HttpClient for CannedHttpClient {
    async fn get(&self, url: &str) -> notice_sentinel::Result<HttpResponse> {
        self.response
            .clone()
            .ok_or_else(|| NoticeError::Http(format!("GET {} failed: connection refused", url)))
    }
}

// --- World ---

#[derive(Debug, Default, World)]
pub struct NoticeWorld {
    // Ordinal extraction
    pub ordinal: Option<u64>,

    // Monitor loop
    pub baseline: Option<String>,
    pub marker_policy: MarkerPolicy,
    pub latest_selection: LatestSelection,
    pub feed: Arc<ScriptedFeed>,
    pub notifier: Option<Arc<RecordingNotifier>>,
    pub engine: Option<Arc<Engine>>,
    pub clock_origin: Option<Instant>,
    pub last_outcome: Option<TickOutcome>,
    pub start_result: Option<notice_sentinel::Result<()>>,

    // Fetching
    pub http: Option<CannedHttpClient>,
    pub fetch_result: Option<notice_sentinel::Result<Vec<Announcement>>>,

    // Notification
    pub announcement: Option<Announcement>,
    pub smtp_notifier: Option<Arc<dyn Notifier>>,
    pub email: Option<Email>,
    pub send_result: Option<notice_sentinel::Result<()>>,

    // Lifecycle
    pub lifecycle_config: Option<Config>,
    pub lifecycle_cancel: Option<tokio_util::sync::CancellationToken>,
    pub lifecycle_build_succeeded: Option<bool>,
    pub lifecycle_build_error: Option<String>,
    pub lifecycle_running: Option<bool>,
    pub lifecycle_start_succeeded: Option<bool>,
}

impl NoticeWorld {
    pub fn notifier(&mut self) -> Arc<RecordingNotifier> {
        self.notifier
            .get_or_insert_with(|| Arc::new(RecordingNotifier::default()))
            .clone()
    }

    /// The engine under test, built on first use from the scenario's settings
    pub fn engine(&mut self) -> Arc<Engine> {
        if let Some(engine) = &self.engine {
            return Arc::clone(engine);
        }
        let notifier = self.notifier();
        let baseline = self.baseline.clone().unwrap_or_else(|| "23.txt".to_string());
        let engine = Arc::new(Engine::new(
            Arc::clone(&self.feed) as Arc<dyn AnnouncementSource>,
            notifier,
            EngineSettings {
                feed_name: "XI Admission".to_string(),
                check_interval: CHECK_INTERVAL,
                idle_pause: Duration::from_millis(10),
                latest_selection: self.latest_selection,
                marker_policy: self.marker_policy,
            },
            new_state_handle(&baseline, 10),
        ));
        self.engine = Some(Arc::clone(&engine));
        engine
    }

    /// Scenario time `seconds` after the first tick
    pub fn at(&mut self, seconds: u64) -> Instant {
        *self.clock_origin.get_or_insert_with(Instant::now) + Duration::from_secs(seconds)
    }
}
