//! BDD step definitions for builder and lifecycle feature

use std::sync::Arc;

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use notice_sentinel::config::{Config, DashboardConfig};
use notice_sentinel::fetcher::AnnouncementSource;
use notice_sentinel::notifier::Notifier;
use notice_sentinel::NoticeSentinelBuilder;

use crate::world::NoticeWorld;

fn base_config() -> Config {
    let mut config = Config {
        dashboard: DashboardConfig {
            enabled: false,
            ..DashboardConfig::default()
        },
        ..Config::default()
    };
    config.smtp.sender_address = "notice@example.com".to_string();
    config.smtp.password = Some("secret".to_string());
    config
}

fn build_notice_builder(world: &mut NoticeWorld) -> NoticeSentinelBuilder {
    let config = world.lifecycle_config.take().unwrap_or_else(base_config);
    let notifier = world.notifier();

    let mut builder = NoticeSentinelBuilder::new(config)
        .with_source(Arc::clone(&world.feed) as Arc<dyn AnnouncementSource>)
        .with_notifier(notifier as Arc<dyn Notifier>);

    if let Some(cancel) = world.lifecycle_cancel.take() {
        builder = builder.with_cancellation_token(cancel);
    }

    builder
}

// --- Given steps ---

#[given("a sentinel config without a recipient")]
fn config_without_recipient(world: &mut NoticeWorld) {
    world.lifecycle_config = Some(base_config());
}

#[given(expr = "a sentinel config with recipient {string}")]
fn config_with_recipient(world: &mut NoticeWorld, recipient: String) {
    let mut config = base_config();
    config.recipient = Some(recipient);
    world.lifecycle_config = Some(config);
}

#[given("a sentinel config without a sender address")]
fn config_without_sender(world: &mut NoticeWorld) {
    let mut config = base_config();
    config.smtp.sender_address = String::new();
    world.lifecycle_config = Some(config);
}

#[given("a pre-cancelled cancellation token")]
fn pre_cancelled_token(world: &mut NoticeWorld) {
    let token = CancellationToken::new();
    token.cancel();
    world.lifecycle_cancel = Some(token);
}

// --- When steps ---

#[when("the sentinel is built")]
async fn sentinel_is_built(world: &mut NoticeWorld) {
    let builder = build_notice_builder(world);
    match builder.build().await {
        Ok(sentinel) => {
            world.lifecycle_build_succeeded = Some(true);
            world.lifecycle_running = Some(sentinel.engine().is_running().await);
        }
        Err(e) => {
            world.lifecycle_build_succeeded = Some(false);
            world.lifecycle_build_error = Some(e.to_string());
        }
    }
}

#[when("the sentinel is built and started")]
async fn sentinel_is_built_and_started(world: &mut NoticeWorld) {
    let builder = build_notice_builder(world);
    match builder.build().await {
        Ok(sentinel) => {
            world.lifecycle_build_succeeded = Some(true);
            world.lifecycle_start_succeeded = Some(sentinel.start().await.is_ok());
        }
        Err(e) => {
            world.lifecycle_build_succeeded = Some(false);
            world.lifecycle_build_error = Some(e.to_string());
            world.lifecycle_start_succeeded = Some(false);
        }
    }
}

// --- Then steps ---

#[then("the build should succeed")]
fn build_should_succeed(world: &mut NoticeWorld) {
    assert_eq!(
        world.lifecycle_build_succeeded,
        Some(true),
        "Expected build to succeed, got error {:?}",
        world.lifecycle_build_error
    );
}

#[then(expr = "the build should fail mentioning {string}")]
fn build_should_fail(world: &mut NoticeWorld, text: String) {
    assert_eq!(world.lifecycle_build_succeeded, Some(false));
    let error = world.lifecycle_build_error.as_deref().unwrap_or_default();
    assert!(error.contains(&text), "error {:?} lacks {:?}", error, text);
}

#[then("the built sentinel should be monitoring")]
fn built_sentinel_monitoring(world: &mut NoticeWorld) {
    assert_eq!(world.lifecycle_running, Some(true));
}

#[then("the built sentinel should be idle")]
fn built_sentinel_idle(world: &mut NoticeWorld) {
    assert_eq!(world.lifecycle_running, Some(false));
}

#[then("the lifecycle should complete successfully")]
fn lifecycle_should_complete(world: &mut NoticeWorld) {
    assert_eq!(
        world.lifecycle_build_succeeded,
        Some(true),
        "Expected build to succeed"
    );
    assert_eq!(
        world.lifecycle_start_succeeded,
        Some(true),
        "Expected start to succeed"
    );
}
