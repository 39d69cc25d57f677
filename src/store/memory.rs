use crate::core::cache::{CachedQuotes, QuoteCache};
use crate::core::error::CacheError;
use crate::core::quote::Quote;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::debug;

struct StoredQuotes {
    quotes: Vec<Quote>,
    stored_at: SystemTime,
    /// Reported instead of the elapsed time when set
    pinned_age: Option<Duration>,
}

impl StoredQuotes {
    fn age(&self) -> Duration {
        self.pinned_age.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(self.stored_at)
                .unwrap_or_default()
        })
    }
}

/// In-memory quote cache with controllable entry ages.
///
/// Used in tests where the age of a snapshot has to be set explicitly instead
/// of waiting for a file to grow old.
#[derive(Default)]
pub struct MemoryQuoteCache {
    inner: Mutex<HashMap<String, StoredQuotes>>,
}

impl MemoryQuoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a snapshot that reports exactly `age` on every load.
    pub async fn insert_with_age(&self, symbol: &str, quotes: Vec<Quote>, age: Duration) {
        let stored_at = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut cache = self.inner.lock().await;
        cache.insert(
            symbol.to_string(),
            StoredQuotes {
                quotes,
                stored_at,
                pinned_age: Some(age),
            },
        );
    }
}

#[async_trait]
impl QuoteCache for MemoryQuoteCache {
    async fn load(&self, symbol: &str) -> Result<Option<CachedQuotes>, CacheError> {
        let cache = self.inner.lock().await;
        let Some(entry) = cache.get(symbol) else {
            debug!("Cache MISS for symbol: {}", symbol);
            return Ok(None);
        };

        debug!("Cache HIT for symbol: {}", symbol);
        Ok(Some(CachedQuotes {
            quotes: entry.quotes.clone(),
            age: entry.age(),
        }))
    }

    async fn store(&self, symbol: &str, quotes: &[Quote]) -> Result<(), CacheError> {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for symbol: {}", symbol);
        cache.insert(
            symbol.to_string(),
            StoredQuotes {
                quotes: quotes.to_vec(),
                stored_at: SystemTime::now(),
                pinned_age: None,
            },
        );
        Ok(())
    }
}
