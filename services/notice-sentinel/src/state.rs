//! Monitoring session state: marker, schedule, log and notification history

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::announcement::extract_ordinal;
use crate::notifier::NotificationRecord;

/// Severity of a session log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One user-visible line of the session log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp_epoch_ms: u64,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Render as `[hh:mm:ss AM] message` in local time
    pub fn formatted(&self) -> String {
        let time = i64::try_from(self.timestamp_epoch_ms)
            .ok()
            .and_then(|ms| Local.timestamp_millis_opt(ms).single())
            .map(|t| t.format("%I:%M:%S %p").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        format!("[{}] {}", time, self.message)
    }
}

/// State of one monitoring process.
///
/// Only the engine mutates this; everything else reads it through a
/// [`StateHandle`].
#[derive(Debug)]
pub struct SessionState {
    pub running: bool,
    pub recipient: Option<String>,
    pub last_known_identifier: String,
    pub last_known_ordinal: u64,
    /// `None` until the first check of a session, so that check is due at once
    pub last_check: Option<Instant>,
    /// Oldest entry first
    pub log: Vec<LogEntry>,
    pub history: VecDeque<NotificationRecord>,
    pub history_max_size: usize,
    pub started_at: Instant,
}

impl SessionState {
    pub fn new(baseline_identifier: &str, history_max_size: usize) -> Self {
        Self {
            running: false,
            recipient: None,
            last_known_identifier: baseline_identifier.to_string(),
            last_known_ordinal: extract_ordinal(baseline_identifier),
            last_check: None,
            log: Vec::new(),
            history: VecDeque::with_capacity(history_max_size),
            history_max_size,
            started_at: Instant::now(),
        }
    }

    /// Enter the running state for `recipient`; the next check is due at once
    pub fn begin_session(&mut self, recipient: &str) {
        self.running = true;
        self.recipient = Some(recipient.to_string());
        self.last_check = None;
    }

    /// Leave the running state, returning whether it was running
    pub fn end_session(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Time left until the next check is due, `None` while stopped
    pub fn time_until_next_check(&self, now: Instant, interval: Duration) -> Option<Duration> {
        if !self.running {
            return None;
        }
        Some(match self.last_check {
            Some(last) => (last + interval).saturating_duration_since(now),
            None => Duration::ZERO,
        })
    }

    /// Claim the check slot at `now` if one is due.
    ///
    /// Returns the remaining wait when the interval has not elapsed yet. The
    /// slot is recorded before any fetch starts so two callers can never both
    /// claim the same interval.
    pub fn try_claim_check(&mut self, now: Instant, interval: Duration) -> Result<(), Duration> {
        if let Some(last) = self.last_check {
            let elapsed = now.saturating_duration_since(last);
            if elapsed <= interval {
                return Err(interval - elapsed);
            }
        }
        self.last_check = Some(now);
        Ok(())
    }

    /// Move the marker forward; lower or equal ordinals are ignored
    pub fn advance_marker(&mut self, identifier: &str, ordinal: u64) -> bool {
        if ordinal <= self.last_known_ordinal {
            return false;
        }
        self.last_known_ordinal = ordinal;
        self.last_known_identifier = identifier.to_string();
        true
    }

    pub fn push_log(&mut self, level: LogLevel, message: impl Into<String>, now_ms: u64) {
        self.log.push(LogEntry {
            timestamp_epoch_ms: now_ms,
            level,
            message: message.into(),
        });
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Add a notification to history
    pub fn add_notification(&mut self, record: NotificationRecord) {
        if self.history_max_size == 0 {
            return;
        }
        while self.history.len() >= self.history_max_size {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SessionState>>;

pub fn new_state_handle(baseline_identifier: &str, history_max_size: usize) -> StateHandle {
    Arc::new(RwLock::new(SessionState::new(
        baseline_identifier,
        history_max_size,
    )))
}
