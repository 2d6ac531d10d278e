//! Notice Sentinel - announcement feed watcher
//!
//! Polls a JSON announcement feed, detects announcements newer than the last
//! known one, and sends a single email alert for each.

pub mod announcement;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod io;
pub mod notifier;
pub mod smtp;
pub mod state;

pub use config::{load_config, Config};
pub use error::{NoticeError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::DashboardConfig;
use crate::engine::{Engine, EngineSettings};
use crate::fetcher::{AnnouncementSource, HttpAnnouncementFetcher};
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::notifier::Notifier;
use crate::smtp::SmtpNotifier;

/// Assembles a [`NoticeSentinel`] from configuration, with optional injected
/// collaborators
pub struct NoticeSentinelBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    source: Option<Arc<dyn AnnouncementSource>>,
    notifier: Option<Arc<dyn Notifier>>,
    cancel: Option<CancellationToken>,
}

impl NoticeSentinelBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            source: None,
            notifier: None,
            cancel: None,
        }
    }

    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_source(mut self, source: Arc<dyn AnnouncementSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Validate the configuration and wire up the engine.
    ///
    /// When the configuration names a recipient, monitoring is started right
    /// away and an invalid recipient fails the build.
    pub async fn build(self) -> Result<NoticeSentinel> {
        self.config.validate()?;

        let source: Arc<dyn AnnouncementSource> = match self.source {
            Some(source) => source,
            None => {
                let http: Arc<dyn HttpClient> = match self.http {
                    Some(http) => http,
                    None => Arc::new(ReqwestHttpClient::with_timeout(
                        self.config.feed.timeout(),
                    )?),
                };
                Arc::new(HttpAnnouncementFetcher::new(&self.config.feed, http))
            }
        };

        let notifier: Arc<dyn Notifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(SmtpNotifier::new(&self.config.smtp)?),
        };

        let state = state::new_state_handle(
            &self.config.feed.baseline_identifier,
            self.config.dashboard.history_size,
        );
        let engine = Arc::new(Engine::new(
            source,
            notifier,
            EngineSettings::from_config(&self.config),
            state,
        ));

        if let Some(recipient) = &self.config.recipient {
            engine.start(recipient).await?;
        }

        Ok(NoticeSentinel {
            engine,
            dashboard: self.config.dashboard,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

/// A wired-up service ready to run
pub struct NoticeSentinel {
    engine: Arc<Engine>,
    dashboard: DashboardConfig,
    cancel: CancellationToken,
}

impl NoticeSentinel {
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the engine and the control API until cancelled or Ctrl-C
    pub async fn start(self) -> Result<()> {
        let cancel_for_signal = self.cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    cancel_for_signal.cancel();
                }
                Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
            }
        });

        if self.dashboard.enabled {
            let dashboard_port = self.dashboard.port;
            let engine = Arc::clone(&self.engine);
            let cancel_for_dashboard = self.cancel.clone();

            tokio::spawn(async move {
                let router = dashboard::build_router(engine);
                let addr = SocketAddr::from(([0, 0, 0, 0], dashboard_port));
                tracing::info!("Control API listening on http://{}", addr);

                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::error!(
                            "Failed to bind control API to port {}: {}. Continuing without it.",
                            dashboard_port,
                            e
                        );
                        return;
                    }
                };

                axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        cancel_for_dashboard.cancelled().await;
                    })
                    .await
                    .ok();

                tracing::debug!("Control API stopped");
            });
        }

        tracing::info!("Notice sentinel engine started");

        // Blocks until cancelled
        self.engine.run(self.cancel.clone()).await;

        tracing::info!("Notice sentinel engine stopped");
        Ok(())
    }
}
