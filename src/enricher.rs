use crate::events::{AlertRecord, RawTransaction, TokenTransfer, UNKNOWN};
use crate::repository::TokenCache;
use chrono::{DateTime, Utc};

/// Turns raw feed entries into alert records for one watched address.
pub struct Enricher {
    watched_address: String,
    cache: TokenCache,
}

impl Enricher {
    pub fn new(watched_address: impl Into<String>, cache: TokenCache) -> Self {
        Self {
            watched_address: watched_address.into(),
            cache,
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub async fn enrich(&mut self, tx: &RawTransaction) -> AlertRecord {
        let mut token_name = UNKNOWN.to_string();
        let mut ticker = UNKNOWN.to_string();
        let mut mint = UNKNOWN.to_string();

        if let Some(transfer) = select_transfer(&tx.token_transfers, &self.watched_address) {
            if let Some(m) = transfer.mint() {
                mint = m.to_string();
            }
            if let Some(name) = transfer.inline_name() {
                token_name = name.to_string();
            }
            if let Some(symbol) = transfer.inline_symbol() {
                ticker = symbol.to_string();
            }
        }

        if mint != UNKNOWN && (token_name == UNKNOWN || ticker == UNKNOWN) {
            let identity = self.cache.resolve(&mint).await;
            if token_name == UNKNOWN {
                token_name = identity.name;
            }
            if ticker == UNKNOWN {
                ticker = identity.symbol;
            }
        }

        AlertRecord {
            signature: tx.signature.clone(),
            time: format_timestamp(tx.timestamp),
            token_name,
            ticker,
            mint,
        }
    }
}

/// First transfer touching the watched address, else the first transfer at all.
pub fn select_transfer<'a>(transfers: &'a [TokenTransfer], address: &str) -> Option<&'a TokenTransfer> {
    transfers
        .iter()
        .find(|t| t.touches(address))
        .or_else(|| transfers.first())
}

/// RFC 3339 in UTC, e.g. `2023-11-14T22:13:20+00:00`.
pub fn format_timestamp(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
