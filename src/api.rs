//! HTTP surface: request shapes, handlers and the failure-to-status mapping.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::probe::{ProbeError, Prober};
use crate::telegram::{DeliveryResult, TelegramNotifier};

/// Shared handler state. Both members hold their own `reqwest::Client`, so
/// cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    prober: Prober,
    notifier: TelegramNotifier,
}

impl AppState {
    pub fn new(prober: Prober, notifier: TelegramNotifier) -> Self {
        Self { prober, notifier }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/send_message", post(send_message))
        // historical spelling, part of the public contract
        .route("/check_sourse", post(check_source))
        .route("/test-telegram", post(test_telegram))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub text: String,
}

fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Source Checker API",
        "endpoints": {
            "POST /check_sourse": "Check source availability",
            "POST /send_message": "Send a message to Telegram",
            "POST /test-telegram": "Send a diagnostic message to Telegram",
            "GET /health": "Service liveness",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": now_stamp(),
        "telegram_configured": state.notifier.is_configured(),
    }))
}

async fn send_message(
    State(state): State<AppState>,
    Json(message): Json<Message>,
) -> Json<DeliveryResult> {
    Json(state.notifier.send(&message.text).await)
}

async fn test_telegram(State(state): State<AppState>) -> Json<DeliveryResult> {
    let text = format!(
        "<b>Test message</b>\nTime: {}\nSource checker service is operating normally",
        now_stamp()
    );
    Json(state.notifier.send(&text).await)
}

async fn check_source(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<serde_json::Value>, ProbeFailure> {
    info!(url = %req.url, "Checking source");

    match state.prober.check(&req.url).await {
        Ok(code) => Ok(Json(json!({
            "status": "ok",
            "code": code,
            "url": req.url,
            "timestamp": now_stamp(),
        }))),
        Err(err) => {
            warn!(url = %req.url, error = %err, "Source check failed");
            // Best effort: the caller's error response does not depend on
            // whether the alert got through.
            let alert = err.alert_text(&req.url, &now_stamp());
            if !state.notifier.send(&alert).await.is_success() {
                warn!(url = %req.url, "Alert delivery failed");
            }
            Err(ProbeFailure(err))
        }
    }
}

/// Maps the probe failure taxonomy onto the caller-facing HTTP response:
/// upstream 4xx/5xx codes are mirrored, network-level failures generalize to
/// 502/504.
pub struct ProbeFailure(pub ProbeError);

impl IntoResponse for ProbeFailure {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ProbeError::Client(code) | ProbeError::Server(code) => {
                StatusCode::from_u16(*code).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProbeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProbeError::Unreachable { .. } | ProbeError::Unknown { .. } => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
