//! Strands board cache
//!
//! Daily puzzle metadata and full board payloads, fetched from the upstream
//! puzzle source on first request and persisted to a JSON file. There is no
//! expiry: once a date is cached it is served from memory forever.

pub mod cache;
pub mod error;
pub mod fetch;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

pub use cache::{BoardCache, BoardCacheConfig};
pub use error::BoardError;
pub use fetch::{BoardFetcher, HttpFetcher};

/// Date format used for cache keys and upstream URLs.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Summary of one day's puzzle, as published upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    #[serde(rename = "printDate")]
    pub date: String,
    pub clue: String,
    pub editor: String,
}

/// Anything that can resolve a date to puzzle data.
///
/// Both lookups fetch and persist on a miss; a failure of any kind is
/// reported as `None`.
pub trait BoardSource: Send + Sync + 'static {
    /// Summary for `date` (`YYYY-MM-DD`).
    fn summary(&self, date: &str) -> impl std::future::Future<Output = Option<BoardSummary>> + Send;

    /// Base64 of the raw upstream board JSON for `date`.
    fn payload(&self, date: &str) -> impl std::future::Future<Output = Option<String>> + Send;
}

/// `days` distinct dates ending at `today`, newest first.
pub fn recent_dates(today: NaiveDate, days: usize) -> Vec<String> {
    (0..days as u64)
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| date.format(DATE_FORMAT).to_string())
        .collect()
}
