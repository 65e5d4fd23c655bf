//! Board cache errors. These never reach clients; the cache logs them and
//! reports the board as absent.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {0}")]
    Status(u16),

    #[error("invalid board json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache file: {0}")]
    Io(#[from] std::io::Error),
}
