use crate::alerts::{PriceAlert, DEFAULT_MARKET_LINK_BASE};
use crate::clients::AlertSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    link_base: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

/// Telegram answered, but not with a 2xx.
#[derive(Debug, Error)]
#[error("Telegram API non-2xx: {status} body={body}")]
pub struct SendRejected {
    pub status: StatusCode,
    pub body: String,
}

impl TelegramClient {
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Telegram HTTP client")?;

        Ok(Self {
            http,
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            bot_token,
            chat_id,
            link_base: DEFAULT_MARKET_LINK_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_link_base(mut self, link_base: impl Into<String>) -> Self {
        self.link_base = link_base.into();
        self
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }

    /// Send a Markdown message to the configured chat.
    ///
    /// Errors never carry the request URL, which embeds the bot token.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        self.post_message(text, Some("Markdown")).await
    }

    /// Send without a parse mode; Telegram shows the text verbatim.
    pub async fn send_plain_message(&self, text: &str) -> Result<()> {
        self.post_message(text, None).await
    }

    async fn post_message(&self, text: &str, parse_mode: Option<&'static str>) -> Result<()> {
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };

        let resp = self
            .http
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Telegram sendMessage request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SendRejected { status, body }.into());
        }
        Ok(())
    }

    async fn deliver(&self, alert: &PriceAlert) -> Result<()> {
        let markdown = self.send_message(&alert.format_message(&self.link_base)).await;

        // 400 is Telegram refusing to parse the entities; resend unformatted
        let unparseable = matches!(
            markdown.as_ref().map_err(|e| e.downcast_ref::<SendRejected>()),
            Err(Some(rejected)) if rejected.status == StatusCode::BAD_REQUEST
        );
        if !unparseable {
            return markdown;
        }

        warn!(
            "Telegram rejected Markdown for {} / {}, resending as plain text",
            alert.market_title, alert.outcome_name
        );
        self.send_plain_message(&alert.format_plain_message(&self.link_base)).await
    }
}

#[async_trait]
impl AlertSink for TelegramClient {
    async fn notify(&self, alert: &PriceAlert) -> bool {
        match self.deliver(alert).await {
            Ok(()) => {
                info!(
                    "Sent alert: {} / {} {:+.2}%",
                    alert.market_title,
                    alert.outcome_name,
                    alert.change_pct()
                );
                true
            }
            Err(e) => {
                error!("Telegram send failed: {:#}", e);
                false
            }
        }
    }
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("link_base", &self.link_base)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::PriceMove;
    use crate::models::Market;
    use crate::clients::test_server;
    use chrono::Utc;
    use serde_json::Value;

    fn sample_alert(title: &str) -> PriceAlert {
        let market = Market {
            id: "M1".to_string(),
            title: title.to_string(),
            slug: "t".to_string(),
            outcomes: vec![],
        };
        let mv = PriceMove {
            old_price: 0.5,
            new_price: 0.6,
            relative_change: 0.2,
        };
        PriceAlert::new(&market, "Yes", &mv, Utc::now())
    }

    fn client(api_base: &str) -> TelegramClient {
        TelegramClient::new(
            "123:secret".to_string(),
            "-100200".to_string(),
            Duration::from_secs(2),
        )
        .unwrap()
        .with_api_base(api_base)
    }

    #[test]
    fn test_send_message_url() {
        let c = client("https://api.telegram.org/");
        assert_eq!(
            c.send_message_url(),
            "https://api.telegram.org/bot123:secret/sendMessage"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = SendMessageRequest {
            chat_id: "-100200",
            text: "*hi*",
            parse_mode: Some("Markdown"),
            disable_web_page_preview: true,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "chat_id": "-100200",
                "text": "*hi*",
                "parse_mode": "Markdown",
                "disable_web_page_preview": true
            })
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", client(DEFAULT_TELEGRAM_API_BASE));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("-100200"));
    }

    #[tokio::test]
    async fn test_delivery_failure_returns_false() {
        let c = client("http://127.0.0.1:9");
        let alert = sample_alert("T");

        assert!(!c.notify(&alert).await);

        let err = c.send_message("hello").await.unwrap_err();
        assert!(!format!("{:#}", err).contains("secret"));
    }

    #[test]
    fn test_plain_body_omits_parse_mode() {
        let body = SendMessageRequest {
            chat_id: "-100200",
            text: "hi",
            parse_mode: None,
            disable_web_page_preview: true,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("parse_mode").is_none());
    }

    #[tokio::test]
    async fn test_successful_delivery() {
        let (base, server) = test_server::serve(vec![(200, r#"{"ok":true}"#)]).await;
        let c = client(&base);

        assert!(c.notify(&sample_alert("Rain in Paris")).await);

        let bodies = server.await.unwrap();
        let sent: Value = serde_json::from_str(&bodies[0]).unwrap();
        assert_eq!(sent["chat_id"], "-100200");
        assert_eq!(sent["parse_mode"], "Markdown");
        assert!(sent["text"].as_str().unwrap().starts_with("*Polymarket Update — Rain in Paris*"));
    }

    #[tokio::test]
    async fn test_server_error_returns_false() {
        let (base, server) = test_server::serve(vec![(500, r#"{"ok":false}"#)]).await;
        let c = client(&base);

        assert!(!c.notify(&sample_alert("T")).await);

        // No plain-text retry for anything but 400
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_send_is_typed() {
        let (base, server) = test_server::serve(vec![(403, r#"{"ok":false}"#)]).await;
        let c = client(&base);

        let err = c.send_message("hello").await.unwrap_err();
        let rejected = err.downcast_ref::<SendRejected>().unwrap();
        assert_eq!(rejected.status, StatusCode::FORBIDDEN);
        assert!(!format!("{:#}", err).contains("secret"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unparseable_markdown_falls_back_to_plain_text() {
        let (base, server) = test_server::serve(vec![
            (400, r#"{"ok":false,"description":"Bad Request: can't parse entities"}"#),
            (200, r#"{"ok":true}"#),
        ])
        .await;
        let c = client(&base);

        assert!(c.notify(&sample_alert("Will *BTC hit_100k?")).await);

        let bodies = server.await.unwrap();
        assert_eq!(bodies.len(), 2);
        let retry: Value = serde_json::from_str(&bodies[1]).unwrap();
        assert!(retry.get("parse_mode").is_none());
        assert!(retry["text"]
            .as_str()
            .unwrap()
            .starts_with("Polymarket Update — Will *BTC hit_100k?"));
    }

    #[tokio::test]
    async fn test_plain_text_rejection_returns_false() {
        let (base, server) = test_server::serve(vec![(400, "{}"), (400, "{}")]).await;
        let c = client(&base);

        assert!(!c.notify(&sample_alert("T")).await);
        assert_eq!(server.await.unwrap().len(), 2);
    }
}
