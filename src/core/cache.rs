use crate::core::error::CacheError;
use crate::core::quote::Quote;
use async_trait::async_trait;
use std::time::Duration;

/// Cached quotes are served without a network call up to this age.
pub const STALE_AFTER: Duration = Duration::from_secs(2 * 60 * 60);

/// A snapshot of quotes read back from the cache together with its age.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedQuotes {
    pub quotes: Vec<Quote>,
    pub age: Duration,
}

impl CachedQuotes {
    pub fn is_stale(&self) -> bool {
        self.age > STALE_AFTER
    }
}

/// Per-symbol snapshot storage for search results.
#[async_trait]
pub trait QuoteCache: Send + Sync {
    /// Returns `Ok(None)` when nothing was ever stored for `symbol`.
    async fn load(&self, symbol: &str) -> Result<Option<CachedQuotes>, CacheError>;

    /// Replaces the snapshot for `symbol`.
    async fn store(&self, symbol: &str, quotes: &[Quote]) -> Result<(), CacheError>;
}
