//! Error kinds surfaced by the quote cache and the quote fetcher

use crate::core::quote::Quote;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("open cache file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading cached data from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unmarshalling cached data from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("re-encoding for cache file: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("writing cache file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("loading cached results: {0}")]
    CacheLoad(#[source] CacheError),

    #[error("searching for {symbol:?}: {source}")]
    Network {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decoding result: {0}")]
    Decode(#[source] serde_json::Error),

    /// The fetch succeeded but persisting it did not; the fresh quotes are kept.
    #[error("caching data: {source}")]
    CacheStore {
        quotes: Vec<Quote>,
        #[source]
        source: CacheError,
    },
}

impl QuoteError {
    /// Quotes that were fetched before the error happened, if any.
    pub fn fetched_quotes(&self) -> Option<&[Quote]> {
        match self {
            QuoteError::CacheStore { quotes, .. } => Some(quotes),
            _ => None,
        }
    }
}
