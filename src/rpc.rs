use crate::events::{RawTransaction, TokenIdentity, UNKNOWN};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const METADATA_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited by upstream (status {0})")]
    RateLimited(StatusCode),
    #[error("transient upstream failure: {0}")]
    Transient(String),
    #[error("fatal upstream failure: {0}")]
    Fatal(String),
}

impl FetchError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = format!("status {status}: {}", truncate(body, 200));
        if status == StatusCode::TOO_MANY_REQUESTS {
            FetchError::RateLimited(status)
        } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            FetchError::Transient(detail)
        } else {
            FetchError::Fatal(detail)
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key
        let e = e.without_url();
        match e.status() {
            Some(status) => FetchError::from_status(status, ""),
            None if e.is_builder() => FetchError::Fatal(e.to_string()),
            None => FetchError::Transient(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("metadata request failed: {0}")]
    Request(String),
    #[error("metadata endpoint returned status {0}")]
    Status(StatusCode),
    #[error("no metadata returned for mint")]
    Empty,
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        LookupError::Request(e.without_url().to_string())
    }
}

/// Recent-activity feed for one address, newest first. Without `before` the
/// newest window is returned; with it, the page strictly older than that
/// signature.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn fetch_recent(
        &self,
        address: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<RawTransaction>, FetchError>;
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn token_metadata(&self, mint: &str) -> Result<TokenIdentity, LookupError>;
}

#[derive(Clone)]
pub struct HeliusClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HeliusClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HeliusClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl TransactionSource for HeliusClient {
    async fn fetch_recent(
        &self,
        address: &str,
        limit: usize,
        before: Option<&str>,
    ) -> Result<Vec<RawTransaction>, FetchError> {
        let url = format!("{}/v0/addresses/{}/transactions", self.base_url, address);
        let limit = limit.to_string();
        let mut query = vec![("api-key", self.api_key.as_str()), ("limit", limit.as_str())];
        if let Some(before) = before {
            query.push(("before", before));
        }

        let resp = self
            .http
            .get(&url)
            .query(&query)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::from_status(status, &body));
        }

        let body = resp.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) || &body[..] == b"null" {
            return Ok(Vec::new());
        }
        let txs: Vec<RawTransaction> = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Transient(format!("undecodable feed body: {e}")))?;

        debug!("Fetched {} transactions for {}", txs.len(), address);
        Ok(txs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataEntry {
    #[serde(default)]
    on_chain_metadata: Option<OnChainMetadata>,
    #[serde(default)]
    legacy_metadata: Option<NameSymbol>,
}

#[derive(Debug, Deserialize)]
struct OnChainMetadata {
    #[serde(default)]
    metadata: Option<OnChainMetadataAccount>,
}

#[derive(Debug, Deserialize)]
struct OnChainMetadataAccount {
    #[serde(default)]
    data: Option<NameSymbol>,
}

#[derive(Debug, Default, Deserialize)]
struct NameSymbol {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

/// Reduces a token-metadata response to a name/symbol pair. Each field falls
/// back to legacy metadata, then to the unknown placeholder.
fn identity_from_entries(entries: Vec<MetadataEntry>) -> Result<TokenIdentity, LookupError> {
    let entry = entries.into_iter().next().ok_or(LookupError::Empty)?;

    let on_chain = entry
        .on_chain_metadata
        .and_then(|m| m.metadata)
        .and_then(|m| m.data)
        .unwrap_or_default();
    let legacy = entry.legacy_metadata.unwrap_or_default();

    let pick = |primary: Option<String>, fallback: Option<String>| {
        clean(primary)
            .or_else(|| clean(fallback))
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    Ok(TokenIdentity::new(
        pick(on_chain.name, legacy.name),
        pick(on_chain.symbol, legacy.symbol),
    ))
}

/// On-chain metadata strings are fixed-width and NUL padded.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl MetadataSource for HeliusClient {
    async fn token_metadata(&self, mint: &str) -> Result<TokenIdentity, LookupError> {
        let url = format!("{}/v0/token-metadata", self.base_url);

        let resp = self
            .http
            .post(&url)
            .query(&[("api-key", self.api_key.as_str())])
            .json(&json!({ "mintAccounts": [mint] }))
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let entries: Option<Vec<MetadataEntry>> = resp.json().await?;
        identity_from_entries(entries.unwrap_or_default())
    }
}

/// Cuts `s` to at most `max` characters for log-friendly error detail.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
