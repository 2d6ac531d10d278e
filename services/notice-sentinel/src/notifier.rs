//! Notifier trait for sending alerts

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::announcement::Announcement;

/// A fully composed email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

/// Record of an attempted notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub identifier: String,
    pub recipient: String,
    pub subject: String,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp_epoch_ms: u64,
}

/// Trait for delivering emails
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Get the notifier type name (e.g. "smtp")
    fn type_name(&self) -> &str;

    /// Send one email. Failures are reported as [`crate::NoticeError::Send`].
    async fn send(&self, email: &Email) -> crate::Result<()>;
}

/// Build the alert email for a newly found announcement
pub fn compose_email(feed_name: &str, announcement: &Announcement, recipient: &str) -> Email {
    let subject = format!(
        "New {} Announcement: {}",
        feed_name, announcement.identifier
    );
    let html_body = format!(
        r#"<html><body>
    <h2>A new announcement has been posted on the {feed_name} feed.</h2>
    <p><strong>Filename:</strong> {identifier}</p><hr>
    <p><strong>Content:</strong></p><div>{content}</div>
</body></html>"#,
        feed_name = feed_name,
        identifier = announcement.identifier,
        content = announcement.content,
    );

    Email {
        recipient: recipient.to_string(),
        subject,
        html_body,
    }
}
