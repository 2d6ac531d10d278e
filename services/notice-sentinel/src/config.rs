//! Configuration types for the notice sentinel service

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Recipient to start monitoring for right away; monitoring waits for a
    /// `start` request when absent
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Announcement feed and polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_name")]
    pub name: String,
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    #[serde(default = "default_idle_pause")]
    pub idle_pause_millis: u64,
    /// Identifier of the newest announcement already known at process start
    #[serde(default = "default_baseline_identifier")]
    pub baseline_identifier: String,
    #[serde(default)]
    pub latest_selection: LatestSelection,
    #[serde(default)]
    pub marker_policy: MarkerPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            name: default_feed_name(),
            url: default_feed_url(),
            timeout_seconds: default_timeout(),
            check_interval_seconds: default_check_interval(),
            idle_pause_millis: default_idle_pause(),
            baseline_identifier: default_baseline_identifier(),
            latest_selection: LatestSelection::default(),
            marker_policy: MarkerPolicy::default(),
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn idle_pause(&self) -> Duration {
        Duration::from_millis(self.idle_pause_millis)
    }
}

/// How the latest announcement is picked out of a feed response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatestSelection {
    /// Trust the feed's latest-first ordering
    #[default]
    First,
    /// Pick the announcement with the greatest ordinal
    MaxOrdinal,
}

/// When the last-known marker advances after a new announcement is found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// Advance regardless of the send outcome (at-most-once delivery)
    #[default]
    Always,
    /// Advance only once the email was accepted (at-least-once delivery)
    OnSuccess,
}

/// SMTP delivery configuration (implicit TLS)
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub sender_address: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Environment variable consulted by [`Config::resolve_secrets`]
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            sender_address: String::new(),
            password: None,
            password_env: default_password_env(),
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender_address", &self.sender_address)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

/// Control API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
            history_size: default_history_size(),
        }
    }
}

impl Config {
    /// Fill in secrets that are not part of the config file
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        if self.smtp.password.is_some() {
            return Ok(());
        }
        match std::env::var(&self.smtp.password_env) {
            Ok(password) => {
                tracing::debug!("SMTP password read from ${}", self.smtp.password_env);
                self.smtp.password = Some(password);
                Ok(())
            }
            Err(_) => Err(crate::NoticeError::Config(format!(
                "SMTP password not configured; set ${} or smtp.password",
                self.smtp.password_env
            ))),
        }
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.feed.url.trim().is_empty() {
            return Err(crate::NoticeError::Config("feed.url is empty".to_string()));
        }
        if self.feed.check_interval_seconds == 0 {
            return Err(crate::NoticeError::Config(
                "feed.check_interval_seconds must be greater than zero".to_string(),
            ));
        }
        if self.feed.timeout_seconds == 0 {
            return Err(crate::NoticeError::Config(
                "feed.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.smtp.host.trim().is_empty() {
            return Err(crate::NoticeError::Config("smtp.host is empty".to_string()));
        }
        if self.smtp.sender_address.trim().is_empty() {
            return Err(crate::NoticeError::Config(
                "smtp.sender_address is empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_feed_name() -> String {
    "XI Admission".to_string()
}

fn default_feed_url() -> String {
    "https://xiclassadmission.gov.bd/api/home/api/announcements".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_check_interval() -> u64 {
    300
}

fn default_idle_pause() -> u64 {
    1000
}

fn default_baseline_identifier() -> String {
    "23.txt".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_password_env() -> String {
    "NOTICE_SENTINEL_SMTP_PASSWORD".to_string()
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

fn default_history_size() -> usize {
    100
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::NoticeError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
