//! Quote model and provider abstraction

use crate::core::error::QuoteError;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// A single search result from the quote API.
///
/// Field names on the wire follow the remote API, and the same names are used
/// for the on-disk cache so a cached file reads exactly like a response body.
/// Listings often leave fields out or set them to `null`; those read as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "Code", default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(rename = "Exchange", default, deserialize_with = "null_as_default")]
    pub exchange: String,
    #[serde(rename = "Name", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "Type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(rename = "Country", default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(rename = "Currency", default, deserialize_with = "null_as_default")]
    pub currency: String,
    #[serde(rename = "ISIN", default, deserialize_with = "null_as_default")]
    pub isin: String,
    #[serde(rename = "previousClose", default, deserialize_with = "null_as_default")]
    pub previous_close: f64,
    #[serde(rename = "previousCloseDate")]
    pub previous_close_date: NaiveDate,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Quote {
    /// Returns true when the previous close lies more than `max_age` before `today`.
    pub fn close_is_older_than(&self, max_age: Duration, today: NaiveDate) -> bool {
        self.previous_close_date < today - max_age
    }
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn search(&self, symbol: &str) -> Result<Vec<Quote>, QuoteError>;
}
