use crate::events::TokenIdentity;
use crate::rpc::MetadataSource;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Memoized mint -> identity lookup. Entries are never evicted: mint identity
/// is immutable, and failed lookups are remembered as unknown.
pub struct TokenCache {
    source: Box<dyn MetadataSource>,
    entries: HashMap<String, TokenIdentity>,
}

impl TokenCache {
    pub fn new(source: Box<dyn MetadataSource>) -> Self {
        Self {
            source,
            entries: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, mint: &str) -> TokenIdentity {
        if let Some(identity) = self.entries.get(mint) {
            debug!("Token cache hit for {}", mint);
            return identity.clone();
        }

        // Lookup errors stop here and become the unknown placeholder.
        let identity = match self.source.token_metadata(mint).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Failed to fetch metadata for {}: {}", mint, e);
                TokenIdentity::unknown()
            }
        };

        self.entries.insert(mint.to_string(), identity.clone());
        identity
    }

    pub fn get(&self, mint: &str) -> Option<&TokenIdentity> {
        self.entries.get(mint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::LookupError;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        result: fn() -> Result<TokenIdentity, LookupError>,
    }

    #[async_trait]
    impl MetadataSource for CountingSource {
        async fn token_metadata(&self, _mint: &str) -> Result<TokenIdentity, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn cache_with(result: fn() -> Result<TokenIdentity, LookupError>) -> (TokenCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            calls: calls.clone(),
            result,
        };
        (TokenCache::new(Box::new(source)), calls)
    }

    #[tokio::test]
    async fn hit_does_not_call_source_again() {
        let (mut cache, calls) = cache_with(|| Ok(TokenIdentity::new("Bonk", "BONK")));

        assert_eq!(cache.resolve("Mint1").await, TokenIdentity::new("Bonk", "BONK"));
        assert_eq!(cache.resolve("Mint1").await, TokenIdentity::new("Bonk", "BONK"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.resolve("Mint2").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn failed_lookup_is_cached_as_unknown() {
        let (mut cache, calls) = cache_with(|| Err(LookupError::Empty));

        assert_eq!(cache.resolve("Mx").await, TokenIdentity::unknown());
        assert_eq!(cache.resolve("Mx").await, TokenIdentity::unknown());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("Mx"), Some(&TokenIdentity::unknown()));
    }
}
