//! SMTP email notifier (implicit TLS)

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::notifier::{Email, Notifier};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends emails through an authenticated SMTPS relay
pub struct SmtpNotifier {
    sender: String,
    host: String,
    port: u16,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("sender", &self.sender)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> crate::Result<Self> {
        let password = match config.password.as_deref() {
            Some(password) if !password.is_empty() => password.to_string(),
            _ => {
                return Err(crate::NoticeError::Config(format!(
                    "SMTP password not configured for {}",
                    config.sender_address
                )))
            }
        };
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| {
                crate::NoticeError::Config(format!("SMTP relay {}: {}", config.host, e))
            })?
            .port(config.port)
            .credentials(Credentials::new(config.sender_address.clone(), password))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        tracing::debug!(
            "Created SmtpNotifier for {}:{} as {}",
            config.host,
            config.port,
            config.sender_address
        );

        Ok(Self {
            sender: config.sender_address.clone(),
            host: config.host.clone(),
            port: config.port,
            transport,
        })
    }

    /// Build the MIME message for an email
    pub fn build_message(&self, email: &Email) -> crate::Result<Message> {
        let from: Mailbox = self.sender.parse().map_err(|e| {
            crate::NoticeError::Send(format!("Invalid sender address {}: {}", self.sender, e))
        })?;
        let to: Mailbox = email.recipient.parse().map_err(|e| {
            crate::NoticeError::Send(format!(
                "Invalid recipient address {}: {}",
                email.recipient, e
            ))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| crate::NoticeError::Send(format!("Building message: {}", e)))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    fn type_name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, email: &Email) -> crate::Result<()> {
        let message = self.build_message(email)?;

        tracing::debug!(
            "Sending email to {} via {}:{}: '{}'",
            email.recipient,
            self.host,
            self.port,
            email.subject
        );

        self.transport.send(message).await.map_err(|e| {
            crate::NoticeError::Send(format!(
                "SMTP delivery via {}:{} failed: {}",
                self.host, self.port, e
            ))
        })?;

        tracing::debug!("Email to {} accepted by {}", email.recipient, self.host);
        Ok(())
    }
}
