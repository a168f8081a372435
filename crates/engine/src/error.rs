//! Engine error types.

use std::path::PathBuf;

/// Errors produced by the artwork cache engine.
#[derive(Debug, thiserror::Error)]
pub enum ArtError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SteamGridDB error: {0}")]
    SteamGridDb(#[from] gridcache_steamgriddb::Error),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("offline: remote lookups are disabled")]
    Offline,

    #[error("download finished but {} is missing", .0.display())]
    MissingAfterDownload(PathBuf),

    #[error("cache directory not available")]
    NoCacheDir,
}
