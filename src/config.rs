use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_STATE_FILE: &str = "last_sig.json";
const DEFAULT_HELIUS_API_URL: &str = "https://api.helius.xyz";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub helius_api_key: String,
    pub helius_api_url: String,
    pub watch_wallet: String,
    pub bot_token: String,
    pub chat_id: String,
    pub telegram_api_url: String,
    pub state_file: String,
    pub fetch_limit: usize,
    pub poll_interval: Duration,
    pub max_backoff: Duration,
    pub heartbeat_interval: Duration,
    pub transient_retry: Duration,
    pub fatal_retry: Duration,
}

/// Feed settings alone, for tools that read the upstream without alerting.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub helius_api_key: String,
    pub helius_api_url: String,
    pub watch_wallet: String,
}

impl FeedConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(&lookup, key);

        Ok(FeedConfig {
            helius_api_key: require(&get, "HELIUS_API_KEY")?,
            watch_wallet: require(&get, "WATCH_WALLET")?.trim().to_string(),
            helius_api_url: get("HELIUS_API_URL")
                .unwrap_or_else(|| DEFAULT_HELIUS_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Cursor file location from `STATE_FILE`, without requiring anything else.
    pub fn state_file_from_env() -> String {
        dotenv::dotenv().ok();
        let env = |key: &str| std::env::var(key).ok();
        state_file(&|key: &str| non_blank(&env, key))
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(&lookup, key);

        let FeedConfig {
            helius_api_key,
            helius_api_url,
            watch_wallet,
        } = FeedConfig::from_lookup(&lookup)?;
        let bot_token = require(&get, "BOT_TOKEN")?;
        let chat_id = require(&get, "CHAT_ID")?;

        let telegram_api_url = get("TELEGRAM_API_URL")
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let state_file = state_file(&get);

        let fetch_limit = parse_or(&get, "FETCH_LIMIT", 20usize)?;
        if fetch_limit == 0 {
            anyhow::bail!("FETCH_LIMIT must be greater than zero");
        }

        let poll_interval = Duration::from_secs(parse_or(&get, "POLL_INTERVAL_SEC", 20u64)?);
        let max_backoff = Duration::from_secs(parse_or(&get, "MAX_BACKOFF_SEC", 300u64)?);
        if max_backoff < poll_interval {
            anyhow::bail!("MAX_BACKOFF_SEC must not be smaller than POLL_INTERVAL_SEC");
        }

        Ok(Config {
            helius_api_key,
            helius_api_url,
            watch_wallet,
            bot_token,
            chat_id,
            telegram_api_url,
            state_file,
            fetch_limit,
            poll_interval,
            max_backoff,
            heartbeat_interval: Duration::from_secs(parse_or(
                &get,
                "HEARTBEAT_INTERVAL_SEC",
                300u64,
            )?),
            transient_retry: Duration::from_secs(parse_or(&get, "TRANSIENT_RETRY_SEC", 10u64)?),
            fatal_retry: Duration::from_secs(parse_or(&get, "FATAL_RETRY_SEC", 5u64)?),
        })
    }
}

fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn require<G>(get: &G, key: &str) -> Result<String>
where
    G: Fn(&str) -> Option<String>,
{
    get(key).with_context(|| format!("{key} must be set in .env or the environment"))
}

fn state_file<G>(get: &G) -> String
where
    G: Fn(&str) -> Option<String>,
{
    get("STATE_FILE").unwrap_or_else(|| DEFAULT_STATE_FILE.to_string())
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key} value: {raw}")),
        None => Ok(default),
    }
}
