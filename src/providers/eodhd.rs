use crate::core::cache::QuoteCache;
use crate::core::error::QuoteError;
use crate::core::quote::{Quote, QuoteProvider};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://eodhistoricaldata.com/api";
const SEARCH_PATH: &str = "/search/";

const SEARCH_RESULT_SAMPLE: &str = r#"[
    {
        "Code": "SE0001192618",
        "Exchange": "EUFUND",
        "Name": "Handelsbanken Multi Asset 50 (A1 SEK)",
        "Type": "FUND",
        "Country": "Unknown",
        "Currency": "SEK",
        "ISIN": "SE0001192618",
        "previousClose": 237.15,
        "previousCloseDate": "2023-05-03"
    }
]"#;

/// The fixed search result served when no API token is configured.
pub fn sample_quotes() -> Result<Vec<Quote>, QuoteError> {
    serde_json::from_str(SEARCH_RESULT_SAMPLE).map_err(QuoteError::Decode)
}

/// Quote lookups against the EOD Historical Data search endpoint, read
/// through a [`QuoteCache`].
pub struct EodhdProvider {
    base_url: String,
    api_token: Option<String>,
    cache: Arc<dyn QuoteCache>,
}

impl EodhdProvider {
    /// An empty token counts as no token, which puts the provider in sample mode.
    pub fn new(base_url: &str, api_token: Option<String>, cache: Arc<dyn QuoteCache>) -> Self {
        EodhdProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|token| !token.is_empty()),
            cache,
        }
    }

    pub fn is_sample_mode(&self) -> bool {
        self.api_token.is_none()
    }

    async fn fetch_remote(&self, symbol: &str, api_token: &str) -> Result<Vec<Quote>, QuoteError> {
        let network_error = |source: reqwest::Error| QuoteError::Network {
            symbol: symbol.to_string(),
            // the request URL carries the token
            source: source.without_url(),
        };

        let url = format!("{}{}{}", self.base_url, SEARCH_PATH, symbol);
        debug!("Requesting quote data from {}", url);

        let client = reqwest::Client::builder()
            .user_agent(concat!("quotebadge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(network_error)?;
        let response = client
            .get(&url)
            .query(&[("api_token", api_token)])
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        serde_json::from_str(&body).map_err(|e| {
            warn!(%status, "Failed to decode search response for {}", symbol);
            QuoteError::Decode(e)
        })
    }
}

#[async_trait]
impl QuoteProvider for EodhdProvider {
    #[instrument(name = "EodhdSearch", skip(self), fields(symbol = %symbol))]
    async fn search(&self, symbol: &str) -> Result<Vec<Quote>, QuoteError> {
        let Some(api_token) = self.api_token.as_deref() else {
            debug!("No API token configured, serving sample data");
            return sample_quotes();
        };

        match self.cache.load(symbol).await.map_err(QuoteError::CacheLoad)? {
            Some(cached) if !cached.is_stale() => {
                debug!("Serving cached quotes for {} (age {:?})", symbol, cached.age);
                return Ok(cached.quotes);
            }
            Some(cached) => debug!("Cached quotes for {} are stale (age {:?})", symbol, cached.age),
            None => debug!("No cached quotes for {}", symbol),
        }

        let quotes = self.fetch_remote(symbol, api_token).await?;
        debug!("Fetched {} quote(s) for {}", quotes.len(), symbol);

        if let Err(source) = self.cache.store(symbol, &quotes).await {
            return Err(QuoteError::CacheStore { quotes, source });
        }

        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::CachedQuotes;
    use crate::core::error::CacheError;
    use crate::store::disk::DiskQuoteCache;
    use crate::store::memory::MemoryQuoteCache;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SYMBOL: &str = "SE0001192618";
    const TOKEN: &str = "demo-token";

    const REMOTE_RESPONSE: &str = r#"[
        {
            "Code": "SE0001192618",
            "Exchange": "EUFUND",
            "Name": "Handelsbanken Multi Asset 50 (A1 SEK)",
            "Type": "FUND",
            "Country": "Unknown",
            "Currency": "SEK",
            "ISIN": "SE0001192618",
            "previousClose": 241.8,
            "previousCloseDate": "2023-06-12"
        }
    ]"#;

    // Helper function to create a mock search endpoint expecting `calls` requests
    async fn create_search_mock_server(body: &str, status_code: u16, calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/search/{SYMBOL}")))
            .and(query_param("api_token", TOKEN))
            .respond_with(ResponseTemplate::new(status_code).set_body_string(body))
            .expect(calls)
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn hours(h: u64) -> Duration {
        Duration::from_secs(h * 60 * 60)
    }

    struct ReadOnlyCache;

    #[async_trait]
    impl QuoteCache for ReadOnlyCache {
        async fn load(&self, _symbol: &str) -> Result<Option<CachedQuotes>, CacheError> {
            Ok(None)
        }

        async fn store(&self, symbol: &str, _quotes: &[Quote]) -> Result<(), CacheError> {
            Err(CacheError::Write {
                path: format!("{symbol}.json").into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[tokio::test]
    async fn test_sample_mode_without_token() {
        let cache = Arc::new(MemoryQuoteCache::new());
        let provider = EodhdProvider::new("http://127.0.0.1:9", None, cache.clone());
        assert!(provider.is_sample_mode());

        let quotes = provider.search(SYMBOL).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].isin, "SE0001192618");
        assert_eq!(quotes[0].currency, "SEK");
        assert_eq!(quotes[0].previous_close, 237.15);

        // Sample mode never touches the cache
        assert!(cache.load(SYMBOL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_token_means_sample_mode() {
        let cache = Arc::new(MemoryQuoteCache::new());
        let provider = EodhdProvider::new("http://127.0.0.1:9", Some(String::new()), cache);
        assert!(provider.is_sample_mode());
        assert_eq!(provider.search(SYMBOL).await.unwrap(), sample_quotes().unwrap());
    }

    #[tokio::test]
    async fn test_missing_cache_fetches_and_stores() {
        let mock_server = create_search_mock_server(REMOTE_RESPONSE, 200, 1).await;
        let cache = Arc::new(MemoryQuoteCache::new());

        let provider = EodhdProvider::new(&mock_server.uri(), Some(TOKEN.to_string()), cache.clone());
        let quotes = provider.search(SYMBOL).await.unwrap();
        assert_eq!(quotes[0].previous_close, 241.8);

        let cached = cache.load(SYMBOL).await.unwrap().unwrap();
        assert_eq!(cached.quotes, quotes);
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_network() {
        for age in [Duration::ZERO, hours(1), hours(2)] {
            let mock_server = create_search_mock_server(REMOTE_RESPONSE, 200, 0).await;
            let cache = Arc::new(MemoryQuoteCache::new());
            cache
                .insert_with_age(SYMBOL, sample_quotes().unwrap(), age)
                .await;

            let provider = EodhdProvider::new(&mock_server.uri(), Some(TOKEN.to_string()), cache);
            let quotes = provider.search(SYMBOL).await.unwrap();
            assert_eq!(quotes, sample_quotes().unwrap(), "age {age:?}");
        }
    }

    #[tokio::test]
    async fn test_stale_cache_refetches() {
        for age in [hours(2) + Duration::from_secs(5), hours(3), hours(72)] {
            let mock_server = create_search_mock_server(REMOTE_RESPONSE, 200, 1).await;
            let cache = Arc::new(MemoryQuoteCache::new());
            cache
                .insert_with_age(SYMBOL, sample_quotes().unwrap(), age)
                .await;

            let provider =
                EodhdProvider::new(&mock_server.uri(), Some(TOKEN.to_string()), cache.clone());
            let quotes = provider.search(SYMBOL).await.unwrap();
            assert_eq!(quotes[0].previous_close, 241.8, "age {age:?}");

            // The refreshed snapshot replaces the stale one
            let cached = cache.load(SYMBOL).await.unwrap().unwrap();
            assert!(!cached.is_stale());
            assert_eq!(cached.quotes[0].previous_close, 241.8);
        }
    }

    #[tokio::test]
    async fn test_disk_cache_read_through() {
        let dir = tempfile::tempdir().unwrap();
        let mock_server = create_search_mock_server(REMOTE_RESPONSE, 200, 1).await;
        let cache = Arc::new(DiskQuoteCache::new(dir.path()));

        let provider = EodhdProvider::new(&mock_server.uri(), Some(TOKEN.to_string()), cache);
        let first = provider.search(SYMBOL).await.unwrap();
        let second = provider.search(SYMBOL).await.unwrap();

        assert_eq!(first, second);
        assert!(dir.path().join(format!("{SYMBOL}.json")).exists());
    }

    #[tokio::test]
    async fn test_malformed_response_is_decode_error() {
        let mock_server = create_search_mock_server(r#"{ "error": "nope" }"#, 200, 1).await;
        let cache = Arc::new(MemoryQuoteCache::new());

        let provider = EodhdProvider::new(&mock_server.uri(), Some(TOKEN.to_string()), cache.clone());
        let result = provider.search(SYMBOL).await;

        assert!(matches!(result, Err(QuoteError::Decode(_))));
        assert!(result.unwrap_err().to_string().starts_with("decoding result"));
        assert!(cache.load(SYMBOL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_api_error_status_is_decode_error() {
        let mock_server = create_search_mock_server("Unauthenticated", 401, 1).await;
        let cache = Arc::new(MemoryQuoteCache::new());

        let provider = EodhdProvider::new(&mock_server.uri(), Some(TOKEN.to_string()), cache);
        let result = provider.search(SYMBOL).await;
        assert!(matches!(result, Err(QuoteError::Decode(_))));
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let mock_server = create_search_mock_server("[]", 200, 1).await;
        let cache = Arc::new(MemoryQuoteCache::new());

        let provider = EodhdProvider::new(&mock_server.uri(), Some(TOKEN.to_string()), cache);
        assert!(provider.search(SYMBOL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_with_null_isin_is_served() {
        let body = r#"[
            {"Code": "SE0001192618", "Exchange": "EUFUND", "Name": "Handelsbanken Multi Asset 50 (A1 SEK)",
             "Type": "FUND", "Country": "Unknown", "Currency": "SEK", "ISIN": null,
             "previousClose": 241.8, "previousCloseDate": "2023-06-12"},
            {"Code": "HMA50", "Currency": "SEK", "previousCloseDate": "2023-06-12"}
        ]"#;
        let mock_server = create_search_mock_server(body, 200, 1).await;
        let cache = Arc::new(MemoryQuoteCache::new());

        let provider = EodhdProvider::new(&mock_server.uri(), Some(TOKEN.to_string()), cache);
        let quotes = provider.search(SYMBOL).await.unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].isin, "");
        assert_eq!(quotes[0].previous_close, 241.8);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Nothing listens on a port once its listener is gone
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let uri = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let cache = Arc::new(MemoryQuoteCache::new());
        let provider = EodhdProvider::new(&uri, Some(TOKEN.to_string()), cache);
        let result = provider.search(SYMBOL).await;

        let err = result.unwrap_err();
        assert!(matches!(err, QuoteError::Network { .. }));
        assert!(!err.to_string().contains(TOKEN));
    }

    #[tokio::test]
    async fn test_cache_store_failure_keeps_fetched_quotes() {
        let mock_server = create_search_mock_server(REMOTE_RESPONSE, 200, 1).await;

        let provider = EodhdProvider::new(
            &mock_server.uri(),
            Some(TOKEN.to_string()),
            Arc::new(ReadOnlyCache),
        );
        let err = provider.search(SYMBOL).await.unwrap_err();

        assert!(err.to_string().starts_with("caching data"));
        let quotes = err.fetched_quotes().unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].previous_close, 241.8);
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(format!("{SYMBOL}.json")), "garbage").unwrap();
        let mock_server = create_search_mock_server(REMOTE_RESPONSE, 200, 0).await;

        let provider = EodhdProvider::new(
            &mock_server.uri(),
            Some(TOKEN.to_string()),
            Arc::new(DiskQuoteCache::new(dir.path())),
        );
        let result = provider.search(SYMBOL).await;
        assert!(matches!(result, Err(QuoteError::CacheLoad(_))));
    }
}
