use crate::events::AlertRecord;
use crate::rpc::truncate;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Request(String),
    #[error("delivery rejected with status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl DeliveryError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        DeliveryError::Status {
            status,
            body: truncate(body, 200).to_string(),
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        // The bot token is part of the URL
        DeliveryError::Request(e.without_url().to_string())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

pub struct TelegramNotifier {
    http: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, bot_token: &str, chat_id: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(TelegramNotifier {
            http,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_url.trim_end_matches('/'),
                bot_token
            ),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), DeliveryError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let resp = self.http.post(&self.endpoint).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::from_status(status, &body));
        }
        Ok(())
    }
}

/// Renders the Telegram HTML message for one alert.
pub fn format_alert(watched_address: &str, alert: &AlertRecord) -> String {
    format!(
        "New activity on <b>{}</b>\n\
         • <b>Token:</b> {} ({})\n\
         • <b>Mint:</b> {}\n\
         • <b>Time (UTC):</b> {}\n\
         • <b>Sig:</b> {}",
        escape_html(watched_address),
        escape_html(&alert.token_name),
        escape_html(&alert.ticker),
        escape_html(&alert.mint),
        escape_html(&alert.time),
        escape_html(&alert.signature),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
