//! In-memory board cache backed by a JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::BoardError;
use crate::fetch::{BoardFetcher, HttpFetcher};
use crate::{BoardSource, BoardSummary, DATE_FORMAT};

/// Board cache configuration.
#[derive(Debug, Clone)]
pub struct BoardCacheConfig {
    /// JSON file the cache is loaded from and persisted to (None keeps it in memory)
    pub path: Option<PathBuf>,
    /// Upstream base URL; boards live at `<base_url>/<date>.json`
    pub base_url: String,
}

impl Default for BoardCacheConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("boards.json")),
            base_url: "https://www.nytimes.com/games-assets/strands".into(),
        }
    }
}

/// On-disk layout of the cache file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(rename = "Summaries", default)]
    summaries: HashMap<String, BoardSummary>,
    #[serde(rename = "Boards", default)]
    boards: HashMap<String, String>,
}

/// Fetch-and-persist-on-miss cache of daily boards.
pub struct BoardCache<F: BoardFetcher = HttpFetcher> {
    path: Option<PathBuf>,
    fetcher: F,
    entries: RwLock<CacheFile>,
    /// Serializes writers of the cache file.
    persist_lock: tokio::sync::Mutex<()>,
}

impl BoardCache<HttpFetcher> {
    /// Open the cache described by `config`, fetching over HTTP.
    pub fn open(config: &BoardCacheConfig) -> Self {
        Self::with_fetcher(config.path.clone(), HttpFetcher::new(config.base_url.clone()))
    }
}

impl<F: BoardFetcher> BoardCache<F> {
    /// Create a cache with a custom fetcher, loading `path` if it exists.
    pub fn with_fetcher(path: Option<PathBuf>, fetcher: F) -> Self {
        let entries = path.as_deref().map(load).unwrap_or_default();
        Self {
            path,
            fetcher,
            entries: RwLock::new(entries),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Number of dates with a cached board.
    pub fn len(&self) -> usize {
        self.entries.read().boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch `date` upstream, store both views of it and persist.
    async fn fill(&self, date: &str) -> Option<(BoardSummary, String)> {
        if NaiveDate::parse_from_str(date, DATE_FORMAT).is_err() {
            debug!("Ignoring board request for malformed date {date:?}");
            return None;
        }

        let (summary, encoded) = match self.fetch_board(date).await {
            Ok(board) => board,
            Err(e) => {
                warn!("Board {date} unavailable: {e}");
                return None;
            }
        };

        {
            let mut entries = self.entries.write();
            entries.summaries.insert(date.to_string(), summary.clone());
            entries.boards.insert(date.to_string(), encoded.clone());
        }
        info!("Cached board {date}");

        if let Err(e) = self.persist().await {
            warn!("Failed to store boards: {e}");
        }

        Some((summary, encoded))
    }

    async fn fetch_board(&self, date: &str) -> Result<(BoardSummary, String), BoardError> {
        let bytes = self.fetcher.fetch(date).await?;
        let summary: BoardSummary = serde_json::from_slice(&bytes)?;
        Ok((summary, STANDARD.encode(&bytes)))
    }

    async fn persist(&self) -> Result<(), BoardError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let _guard = self.persist_lock.lock().await;
        let json = {
            let entries = self.entries.read();
            serde_json::to_vec(&*entries)?
        };
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

impl<F: BoardFetcher> BoardSource for BoardCache<F> {
    async fn summary(&self, date: &str) -> Option<BoardSummary> {
        let cached = self.entries.read().summaries.get(date).cloned();
        if cached.is_some() {
            return cached;
        }
        self.fill(date).await.map(|(summary, _)| summary)
    }

    async fn payload(&self, date: &str) -> Option<String> {
        let cached = self.entries.read().boards.get(date).cloned();
        if cached.is_some() {
            return cached;
        }
        self.fill(date).await.map(|(_, board)| board)
    }
}

fn load(path: &Path) -> CacheFile {
    let Ok(content) = std::fs::read(path) else {
        return CacheFile::default();
    };
    match serde_json::from_slice(&content) {
        Ok(file) => file,
        Err(e) => {
            warn!("Ignoring unreadable board cache {}: {e}", path.display());
            CacheFile::default()
        }
    }
}
