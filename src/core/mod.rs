//! Core abstractions: quotes, their cache, errors, configuration and logging

pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod quote;

// Re-export main types for cleaner imports
pub use cache::{CachedQuotes, QuoteCache, STALE_AFTER};
pub use error::{CacheError, QuoteError};
pub use quote::{Quote, QuoteProvider};
