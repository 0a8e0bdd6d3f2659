use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TelegramConfig;

const TELEGRAM_TIMEOUT_SECS: u64 = 10;

/// Outcome of one delivery attempt. Always returned, never thrown: callers
/// treat alerting as fire-and-forget and must not fail because Telegram did.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeliveryResult {
    Success {
        response: serde_json::Value,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl DeliveryResult {
    fn api_error(code: u16) -> Self {
        Self::Error {
            code: Some(code),
            message: None,
        }
    }

    fn transport_error(message: impl Into<String>) -> Self {
        Self::Error {
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(TELEGRAM_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send one message to the configured chat, HTML parse mode. Every
    /// failure mode collapses into an error `DeliveryResult`.
    pub async fn send(&self, text: &str) -> DeliveryResult {
        if !self.config.is_configured() {
            warn!("Telegram credentials not configured, dropping message");
            return DeliveryResult::transport_error("telegram credentials not configured");
        }

        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.token
        );
        let form = [
            ("chat_id", self.config.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "HTML"),
        ];

        let resp = match self.http.post(&url).form(&form).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Telegram request failed");
                return DeliveryResult::transport_error(format!("{:#}", anyhow::Error::new(e)));
            }
        };

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            warn!(code = status.as_u16(), body = %body, "Telegram API returned an error");
            return DeliveryResult::api_error(status.as_u16());
        }

        match resp.json::<serde_json::Value>().await {
            Ok(json) => {
                debug!("Telegram message sent");
                DeliveryResult::Success { response: json }
            }
            Err(e) => {
                warn!(error = %e, "Telegram response was not JSON");
                DeliveryResult::transport_error(format!("{:#}", anyhow::Error::new(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notifier(api_base: String) -> TelegramNotifier {
        TelegramNotifier::new(TelegramConfig {
            token: "123:abc".to_string(),
            chat_id: "42".to_string(),
            api_base,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_echoes_telegram_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_string_contains("chat_id=42"))
            .and(body_string_contains("parse_mode=HTML"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": true, "result": {"message_id": 7}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = notifier(server.uri()).send("hello").await;
        match result {
            DeliveryResult::Success { response } => {
                assert_eq!(response["ok"], json!(true));
                assert_eq!(response["result"]["message_id"], json!(7));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_api_error_carries_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let result = notifier(server.uri()).send("hello").await;
        assert!(matches!(
            result,
            DeliveryResult::Error {
                code: Some(401),
                message: None
            }
        ));
    }

    #[tokio::test]
    async fn test_transport_error_carries_message() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let api_base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let result = notifier(api_base).send("hello").await;
        match result {
            DeliveryResult::Error {
                code: None,
                message: Some(msg),
            } => assert!(!msg.is_empty()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_credentials_skip_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let unconfigured = TelegramNotifier::new(TelegramConfig {
            token: String::new(),
            chat_id: "42".to_string(),
            api_base: server.uri(),
        })
        .unwrap();

        assert!(!unconfigured.is_configured());
        let result = unconfigured.send("hello").await;
        assert!(!result.is_success());
    }

    #[test]
    fn test_delivery_result_wire_shapes() {
        let success = DeliveryResult::Success {
            response: json!({"ok": true}),
        };
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            json!({"status": "success", "response": {"ok": true}})
        );

        assert_eq!(
            serde_json::to_value(DeliveryResult::api_error(401)).unwrap(),
            json!({"status": "error", "code": 401})
        );

        assert_eq!(
            serde_json::to_value(DeliveryResult::transport_error("boom")).unwrap(),
            json!({"status": "error", "message": "boom"})
        );
    }
}
