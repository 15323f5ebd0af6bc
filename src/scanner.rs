use crate::backoff::BackoffState;
use crate::config::Config;
use crate::enricher::Enricher;
use crate::events::RawTransaction;
use crate::notifier::{Notifier, format_alert};
use crate::novelty::select_new;
use crate::repository::CursorStore;
use crate::rpc::{FetchError, TransactionSource};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ScannerSettings {
    pub watched_address: String,
    pub fetch_limit: usize,
    pub poll_interval: Duration,
    pub max_backoff: Duration,
    pub heartbeat_interval: Duration,
    pub transient_retry: Duration,
    pub fatal_retry: Duration,
}

impl ScannerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            watched_address: config.watch_wallet.clone(),
            fetch_limit: config.fetch_limit,
            poll_interval: config.poll_interval,
            max_backoff: config.max_backoff,
            heartbeat_interval: config.heartbeat_interval,
            transient_retry: config.transient_retry,
            fatal_retry: config.fatal_retry,
        }
    }
}

/// Result of one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Success { alerts: usize },
    RateLimited,
    Transient,
    Fatal,
}

/// Fires at most once per interval, checked from the poll loop.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    last: Instant,
}

impl Heartbeat {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    pub fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

pub struct Scanner {
    source: Box<dyn TransactionSource>,
    enricher: Enricher,
    notifier: Box<dyn Notifier>,
    store: CursorStore,
    settings: ScannerSettings,
    cursor: Option<String>,
    backoff: BackoffState,
    heartbeat: Heartbeat,
}

impl Scanner {
    pub fn new(
        source: Box<dyn TransactionSource>,
        enricher: Enricher,
        notifier: Box<dyn Notifier>,
        store: CursorStore,
        settings: ScannerSettings,
    ) -> Self {
        let cursor = store.load();
        let backoff = BackoffState::new(settings.poll_interval, settings.max_backoff);
        let heartbeat = Heartbeat::new(settings.heartbeat_interval, Instant::now());

        Scanner {
            source,
            enricher,
            notifier,
            store,
            settings,
            cursor,
            backoff,
            heartbeat,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn backoff(&self) -> &BackoffState {
        &self.backoff
    }

    /// Polls forever. Every error is handled inside the cycle; only killing
    /// the process stops the loop.
    pub async fn run(&mut self) {
        info!(
            "Watching {} (last seen signature: {})",
            self.settings.watched_address,
            self.cursor.as_deref().unwrap_or("none")
        );

        loop {
            let (outcome, delay) = self.poll_once().await;

            if self.heartbeat.due(Instant::now()) {
                info!(
                    cursor = self.cursor.as_deref().unwrap_or("none"),
                    last_outcome = ?outcome,
                    "Watcher is alive"
                );
            }

            sleep(delay).await;
        }
    }

    /// Runs a single fetch cycle and returns its outcome together with the
    /// delay to wait before the next one.
    pub async fn poll_once(&mut self) -> (PollOutcome, Duration) {
        let fetched = self
            .source
            .fetch_recent(
                &self.settings.watched_address,
                self.settings.fetch_limit,
                None,
            )
            .await;

        match fetched {
            Ok(window) => {
                let delay = self.backoff.on_success();
                let alerts = self.process_window(window).await;
                (PollOutcome::Success { alerts }, delay)
            }
            Err(FetchError::RateLimited(status)) => {
                let delay = self.backoff.on_rate_limited();
                warn!(
                    "Rate limited ({}). Backing off for {}s...",
                    status,
                    delay.as_secs()
                );
                (PollOutcome::RateLimited, delay)
            }
            Err(FetchError::Transient(e)) => {
                let delay = self.settings.transient_retry;
                warn!("Network error: {}. Retrying in {}s...", e, delay.as_secs());
                (PollOutcome::Transient, delay)
            }
            Err(FetchError::Fatal(e)) => {
                let delay = self.settings.fatal_retry;
                error!(
                    "Fetch failed and will not recover without operator action: {}. Retrying in {}s...",
                    e,
                    delay.as_secs()
                );
                (PollOutcome::Fatal, delay)
            }
        }
    }

    async fn process_window(&mut self, window: Vec<RawTransaction>) -> usize {
        let fetched = window.len();
        let new_batch = select_new(window, self.cursor.as_deref());
        if new_batch.is_empty() {
            return 0;
        }

        info!(
            "Received {} transactions, {} new since {}",
            fetched,
            new_batch.len(),
            self.cursor.as_deref().unwrap_or("start")
        );

        let mut dispatched = 0;
        for tx in new_batch {
            let alert = self.enricher.enrich(&tx).await;
            let text = format_alert(&self.settings.watched_address, &alert);

            info!(
                signature = %alert.signature,
                token = %alert.token_name,
                ticker = %alert.ticker,
                mint = %alert.mint,
                time = %alert.time,
                "New activity"
            );

            if let Err(e) = self.notifier.notify(&text).await {
                warn!(signature = %alert.signature, "Alert delivery failed: {}", e);
            }
            dispatched += 1;

            self.advance_cursor(tx.signature);
        }

        dispatched
    }

    fn advance_cursor(&mut self, signature: String) {
        if let Err(e) = self.store.save(&signature) {
            error!(
                "Failed to persist cursor {} to {}: {}",
                signature,
                self.store.path().display(),
                e
            );
        }
        self.cursor = Some(signature);
    }
}
