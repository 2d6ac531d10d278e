//! Engine: the check / compare / notify loop

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::announcement::select_latest;
use crate::config::{Config, LatestSelection, MarkerPolicy};
use crate::fetcher::AnnouncementSource;
use crate::notifier::{compose_email, NotificationRecord, Notifier};
use crate::state::{LogLevel, StateHandle};

/// Engine timing and policy knobs
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub feed_name: String,
    pub check_interval: Duration,
    pub idle_pause: Duration,
    pub latest_selection: LatestSelection,
    pub marker_policy: MarkerPolicy,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            feed_name: config.feed.name.clone(),
            check_interval: config.feed.check_interval(),
            idle_pause: config.feed.idle_pause(),
            latest_selection: config.feed.latest_selection,
            marker_policy: config.feed.marker_policy,
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Monitoring is not running
    Stopped,
    /// The check interval has not elapsed yet
    Waiting { remaining: Duration },
    /// The feed could not be fetched
    FetchFailed,
    /// The feed returned no announcements
    Empty,
    /// The latest announcement is not newer than the marker
    NoChange { latest: String },
    /// A new announcement was found and an email attempted
    NewAnnouncement {
        identifier: String,
        ordinal: u64,
        delivered: bool,
    },
}

/// The engine owns the session state and is the only thing that mutates it
pub struct Engine {
    source: Arc<dyn AnnouncementSource>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
    state: StateHandle,
    // Held from the marker comparison until the marker is updated
    delivery: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("source", &self.source)
            .field("notifier", &self.notifier)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Engine {
    pub fn new(
        source: Arc<dyn AnnouncementSource>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
        state: StateHandle,
    ) -> Self {
        Self {
            source,
            notifier,
            settings,
            state,
            delivery: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Start (or restart) monitoring for `recipient`.
    ///
    /// The recipient must be non-empty and contain an `@`; otherwise the state
    /// is left untouched. The first check of the session is due immediately.
    pub async fn start(&self, recipient: &str) -> crate::Result<()> {
        let recipient = recipient.trim();
        validate_recipient(recipient)?;

        let mut state = self.state.write().await;
        state.begin_session(recipient);
        state.push_log(LogLevel::Info, "Monitoring started.", current_epoch_ms());
        tracing::info!("Monitoring started, alerts go to {}", recipient);
        Ok(())
    }

    /// Stop monitoring. A tick already past its fetch runs to completion.
    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        if state.end_session() {
            state.push_log(LogLevel::Info, "Monitoring stopped.", current_epoch_ms());
            tracing::info!("Monitoring stopped");
        } else {
            tracing::debug!("Stop requested while already stopped");
        }
    }

    pub async fn clear_log(&self) {
        self.state.write().await.clear_log();
        tracing::debug!("Session log cleared");
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }

    /// Countdown to the next check, `None` while stopped
    pub async fn time_until_next_check(&self, now: Instant) -> Option<Duration> {
        self.state
            .read()
            .await
            .time_until_next_check(now, self.settings.check_interval)
    }

    /// Evaluate one scheduling opportunity at `now`
    pub async fn tick(&self, now: Instant) -> TickOutcome {
        let recipient = {
            let mut state = self.state.write().await;
            if !state.running {
                return TickOutcome::Stopped;
            }
            if let Err(remaining) = state.try_claim_check(now, self.settings.check_interval) {
                return TickOutcome::Waiting { remaining };
            }
            state.recipient.clone().unwrap_or_default()
        };

        tracing::debug!("Checking {}", self.source.describe());

        let announcements = match self.source.fetch().await {
            Ok(announcements) => announcements,
            Err(e) => {
                tracing::warn!("Fetching announcements failed: {}", e);
                self.state
                    .write()
                    .await
                    .push_log(LogLevel::Error, e.to_string(), current_epoch_ms());
                return TickOutcome::FetchFailed;
            }
        };

        let Some(latest) = select_latest(&announcements, self.settings.latest_selection) else {
            tracing::debug!("Feed returned no announcements");
            return TickOutcome::Empty;
        };
        let ordinal = latest.ordinal();

        let _delivery = self.delivery.lock().await;
        {
            let mut state = self.state.write().await;
            if ordinal <= state.last_known_ordinal {
                tracing::debug!(
                    "Latest '{}' ({}) is not newer than marker {}",
                    latest.identifier,
                    ordinal,
                    state.last_known_ordinal
                );
                state.push_log(
                    LogLevel::Info,
                    format!(
                        "No new announcements. Current latest is still `{}`.",
                        latest.identifier
                    ),
                    current_epoch_ms(),
                );
                return TickOutcome::NoChange {
                    latest: latest.identifier.clone(),
                };
            }
            state.push_log(
                LogLevel::Success,
                format!(
                    "New Announcement Found! Filename: `{}`. Sending email.",
                    latest.identifier
                ),
                current_epoch_ms(),
            );
        }

        tracing::info!(
            "New announcement '{}' (ordinal {})",
            latest.identifier,
            ordinal
        );

        let email = compose_email(&self.settings.feed_name, latest, &recipient);
        let result = self.notifier.send(&email).await;
        let now_ms = current_epoch_ms();
        let delivered = result.is_ok();

        let mut state = self.state.write().await;
        match &result {
            Ok(()) => state.push_log(
                LogLevel::Success,
                format!("Notification email sent to {}.", recipient),
                now_ms,
            ),
            Err(e) => {
                tracing::warn!(
                    "Notification via '{}' for '{}' failed: {}",
                    self.notifier.type_name(),
                    latest.identifier,
                    e
                );
                state.push_log(LogLevel::Error, e.to_string(), now_ms);
            }
        }
        state.add_notification(NotificationRecord {
            identifier: latest.identifier.clone(),
            recipient,
            subject: email.subject,
            success: delivered,
            error: result.as_ref().err().map(|e| e.to_string()),
            timestamp_epoch_ms: now_ms,
        });

        if delivered || self.settings.marker_policy == MarkerPolicy::Always {
            state.advance_marker(&latest.identifier, ordinal);
        } else {
            tracing::info!(
                "Keeping marker at '{}' so '{}' is retried",
                state.last_known_identifier,
                latest.identifier
            );
        }

        TickOutcome::NewAnnouncement {
            identifier: latest.identifier.clone(),
            ordinal,
            delivered,
        }
    }

    /// Tick until the cancellation token is triggered
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            let outcome = self.tick(Instant::now()).await;
            tracing::trace!("Tick: {:?}", outcome);

            tokio::select! {
                _ = tokio::time::sleep(self.settings.idle_pause) => {}
                _ = cancel.cancelled() => {
                    tracing::debug!("Engine loop cancelled");
                    break;
                }
            }
        }
    }
}

/// Check that a recipient looks like an email address
pub fn validate_recipient(recipient: &str) -> crate::Result<()> {
    if recipient.is_empty() || !recipient.contains('@') {
        return Err(crate::NoticeError::Validation(
            "Please enter a valid recipient email address before starting.".to_string(),
        ));
    }
    Ok(())
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
