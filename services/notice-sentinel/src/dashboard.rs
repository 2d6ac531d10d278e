//! Control API and status page

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::time::Instant;

use crate::engine::Engine;

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub engine: Arc<Engine>,
}

/// Body of a start request
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub recipient: String,
}

/// Build the dashboard axum router
pub fn build_router(engine: Arc<Engine>) -> Router {
    let dashboard_state = DashboardState { engine };

    Router::new()
        .route("/", get(index_handler))
        .route("/api/status", get(status_handler))
        .route("/api/log", get(log_handler))
        .route("/api/history", get(history_handler))
        .route("/api/start", post(start_handler))
        .route("/api/stop", post(stop_handler))
        .route("/api/clear-log", post(clear_log_handler))
        .route("/health", get(health_handler))
        .with_state(dashboard_state)
}

/// Escape text for placement inside HTML element content or attribute values
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let engine = &dashboard.engine;
    let countdown = engine.time_until_next_check(Instant::now()).await;
    let state = engine.state().read().await;

    let status = if state.running {
        format!(
            r#"<p style="color: #155724; background-color: #d4edda; padding: 0.5rem;">Monitoring is ACTIVE. Last known notice: <code>{}</code></p>"#,
            escape_html(&state.last_known_identifier)
        )
    } else {
        r#"<p style="color: #721c24; background-color: #f8d7da; padding: 0.5rem;">Monitoring is STOPPED.</p>"#
            .to_string()
    };

    let next_check = match countdown {
        Some(remaining) => format_countdown(remaining.as_secs()),
        None => "--:--".to_string(),
    };

    let log_rows: String = state
        .log
        .iter()
        .rev()
        .map(|entry| format!("<li>{}</li>", escape_html(&entry.formatted())))
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="1">
    <title>Notice Sentinel</title>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>Notice Sentinel</h1>
    {status}
    <p>Next Check In: <strong>{next_check}</strong></p>
    <h2>Log</h2>
    <ul>{log_rows}</ul>
</body>
</html>"#,
        status = status,
        next_check = next_check,
        log_rows = log_rows,
    );

    Html(html)
}

async fn status_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let engine = &dashboard.engine;
    let countdown = engine.time_until_next_check(Instant::now()).await;
    let state = engine.state().read().await;

    Json(serde_json::json!({
        "running": state.running,
        "recipient": state.recipient,
        "last_known_identifier": state.last_known_identifier,
        "last_known_ordinal": state.last_known_ordinal,
        "check_interval_seconds": engine.settings().check_interval.as_secs(),
        "seconds_until_next_check": countdown.map(|d| d.as_secs()),
    }))
}

async fn log_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.engine.state().read().await;
    Json(state.log.clone())
}

async fn history_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.engine.state().read().await;
    Json(state.history.iter().cloned().collect::<Vec<_>>())
}

async fn start_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<StartRequest>,
) -> Response {
    match dashboard.engine.start(&request.recipient).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn stop_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    dashboard.engine.stop().await;
    StatusCode::OK
}

async fn clear_log_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    dashboard.engine.clear_log().await;
    StatusCode::OK
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
