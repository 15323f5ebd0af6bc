use crate::enricher::Enricher;
use crate::novelty::select_new;
use crate::query::formatters::{OutputFormat, PreviewRow, format_alerts, format_cursor};
use crate::repository::{CursorStore, TokenCache};
use crate::rpc::{MetadataSource, TransactionSource};
use anyhow::{Context, Result};

pub fn cmd_cursor(store: &CursorStore, format: &OutputFormat) -> Result<()> {
    let cursor = store.load();
    println!("{}", format_cursor(cursor.as_deref(), format));
    Ok(())
}

pub fn cmd_set_cursor(store: &CursorStore, signature: &str) -> Result<()> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(anyhow::anyhow!("Signature must not be empty"));
    }

    store
        .save(signature)
        .with_context(|| format!("Failed to write {}", store.path().display()))?;
    println!("Cursor set to {signature}");
    Ok(())
}

pub fn cmd_clear_cursor(store: &CursorStore) -> Result<()> {
    store
        .clear()
        .with_context(|| format!("Failed to remove {}", store.path().display()))?;
    println!("Cursor cleared. The next watcher run alerts on the whole recent window.");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PreviewQuery {
    pub address: String,
    pub limit: usize,
    pub before: Option<String>,
}

/// Shows what the watcher would send next without sending it or moving the cursor.
pub async fn cmd_preview(
    source: &dyn TransactionSource,
    metadata: Box<dyn MetadataSource>,
    store: &CursorStore,
    query: PreviewQuery,
    format: &OutputFormat,
) -> Result<()> {
    let rows = pending_rows(source, metadata, store, &query).await?;
    println!("{}", format_alerts(&rows, format));
    Ok(())
}

/// Fetch, filter against the stored cursor and enrich. The store is only read.
pub async fn pending_rows(
    source: &dyn TransactionSource,
    metadata: Box<dyn MetadataSource>,
    store: &CursorStore,
    query: &PreviewQuery,
) -> Result<Vec<PreviewRow>> {
    let window = source
        .fetch_recent(&query.address, query.limit, query.before.as_deref())
        .await
        .context("Failed to fetch transactions")?;

    let cursor = store.load();
    let pending = select_new(window, cursor.as_deref());

    let mut enricher = Enricher::new(query.address.clone(), TokenCache::new(metadata));
    let mut rows = Vec::with_capacity(pending.len());
    for tx in &pending {
        let alert = enricher.enrich(tx).await;
        rows.push(PreviewRow::new(tx, alert, &query.address));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{RawTransaction, TokenIdentity};
    use crate::rpc::{FetchError, LookupError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    const WATCHED: &str = "Watched111";

    struct FixedWindow {
        window: Vec<RawTransaction>,
        requested_before: Mutex<Option<String>>,
    }

    #[async_trait]
    impl TransactionSource for FixedWindow {
        async fn fetch_recent(
            &self,
            _address: &str,
            _limit: usize,
            before: Option<&str>,
        ) -> Result<Vec<RawTransaction>, FetchError> {
            *self.requested_before.lock().unwrap() = before.map(str::to_string);
            Ok(self.window.clone())
        }
    }

    struct NamedMints;

    #[async_trait]
    impl MetadataSource for NamedMints {
        async fn token_metadata(&self, mint: &str) -> Result<TokenIdentity, LookupError> {
            Ok(TokenIdentity::new(format!("{mint} Token"), mint))
        }
    }

    fn tx(signature: &str, timestamp: i64) -> RawTransaction {
        serde_json::from_value(json!({
            "signature": signature,
            "timestamp": timestamp,
            "type": "TRANSFER",
            "fee": 5000,
            "tokenTransfers": [{
                "fromUserAccount": "Sender",
                "toUserAccount": WATCHED,
                "mint": format!("M{signature}"),
                "tokenAmount": 2.5
            }]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn preview_lists_only_post_cursor_activity_and_leaves_cursor_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("last_sig.json"));
        store.save("B").unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let source = FixedWindow {
            window: vec![tx("D", 400), tx("C", 300), tx("B", 200), tx("A", 100)],
            requested_before: Mutex::new(None),
        };
        let query = PreviewQuery {
            address: WATCHED.to_string(),
            limit: 20,
            before: Some("OLDER".to_string()),
        };

        let rows = pending_rows(&source, Box::new(NamedMints), &store, &query)
            .await
            .unwrap();

        let signatures: Vec<&str> = rows.iter().map(|r| r.alert.signature.as_str()).collect();
        assert_eq!(signatures, vec!["C", "D"]);
        assert_eq!(rows[0].alert.token_name, "MC Token");
        assert_eq!(rows[0].kind.as_deref(), Some("TRANSFER"));
        assert_eq!(rows[0].fee, Some(5000));
        assert_eq!(rows[0].amount, Some(2.5));
        assert_eq!(
            source.requested_before.lock().unwrap().as_deref(),
            Some("OLDER")
        );

        assert_eq!(store.load().as_deref(), Some("B"));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn preview_without_cursor_does_not_create_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path().join("last_sig.json"));
        let source = FixedWindow {
            window: vec![tx("A", 100)],
            requested_before: Mutex::new(None),
        };
        let query = PreviewQuery {
            address: WATCHED.to_string(),
            limit: 20,
            before: None,
        };

        let rows = pending_rows(&source, Box::new(NamedMints), &store, &query)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert!(!store.path().exists());
    }
}
