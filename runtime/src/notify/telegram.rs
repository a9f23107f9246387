//! Telegram Bot API delivery.

use super::NotificationSink;
use crate::config::TelegramCredentials;
use crate::error::DeliveryError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Public Bot API endpoint.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Sends alerts with `sendMessage`.
pub struct TelegramSink {
    client: reqwest::Client,
    api_base: String,
    credentials: TelegramCredentials,
}

impl TelegramSink {
    pub fn new(credentials: TelegramCredentials) -> Result<Self, DeliveryError> {
        Self::with_api_base(credentials, TELEGRAM_API_BASE)
    }

    /// Point the sink at a different API host (used by tests).
    pub fn with_api_base(
        credentials: TelegramCredentials,
        api_base: impl Into<String>,
    ) -> Result<Self, DeliveryError> {
        Self::with_timeout(credentials, api_base, SEND_TIMEOUT)
    }

    /// Like [`with_api_base`](Self::with_api_base) with a custom per-send timeout.
    pub fn with_timeout(
        credentials: TelegramCredentials,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.credentials.token)
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        let body = SendMessage {
            chat_id: &self.credentials.chat_id,
            text,
            parse_mode: "HTML",
        };

        // Strip the URL so the bot token never ends up in logs.
        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
