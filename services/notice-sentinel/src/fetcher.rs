//! Announcement feed fetcher

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::announcement::Announcement;
use crate::config::FeedConfig;
use crate::io::HttpClient;

/// Feed response body
#[derive(Debug, Deserialize)]
struct FeedResponse {
    announcements: Vec<Announcement>,
}

/// Trait for retrieving the current list of announcements
#[async_trait]
pub trait AnnouncementSource: Send + Sync + std::fmt::Debug {
    /// Where the announcements come from, for logs
    fn describe(&self) -> &str;

    /// Fetch the announcements, latest first as published by the feed.
    ///
    /// Every failure is reported as [`crate::NoticeError::Fetch`].
    async fn fetch(&self) -> crate::Result<Vec<Announcement>>;
}

/// Fetches announcements from the JSON feed endpoint
pub struct HttpAnnouncementFetcher {
    url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for HttpAnnouncementFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAnnouncementFetcher")
            .field("url", &self.url)
            .finish()
    }
}

impl HttpAnnouncementFetcher {
    pub fn new(config: &FeedConfig, http: Arc<dyn HttpClient>) -> Self {
        tracing::debug!("Created HttpAnnouncementFetcher for {}", config.url);
        Self {
            url: config.url.clone(),
            http,
        }
    }
}

#[async_trait]
impl AnnouncementSource for HttpAnnouncementFetcher {
    fn describe(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> crate::Result<Vec<Announcement>> {
        let response = self
            .http
            .get(&self.url)
            .await
            .map_err(|e| crate::NoticeError::Fetch(e.to_string()))?;

        if !response.is_success() {
            tracing::debug!("Non-2xx response from {}: {}", self.url, response.status);
            return Err(crate::NoticeError::Fetch(format!(
                "{} returned status {}",
                self.url, response.status
            )));
        }

        let parsed: FeedResponse = serde_json::from_str(&response.body).map_err(|e| {
            crate::NoticeError::Fetch(format!("Malformed feed from {}: {}", self.url, e))
        })?;

        tracing::debug!(
            "Fetched {} announcements from {}",
            parsed.announcements.len(),
            self.url
        );
        Ok(parsed.announcements)
    }
}
