//! Error types for filtersync.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to fetch a filter body.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status code: {0}")]
    Status(u16),

    #[error("Response too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Filter with this name or URL already exists: {name} ({url})")]
    Duplicate { name: String, url: String },

    #[error("Couldn't download filter from {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: DownloadError,
    },

    #[error("File system error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rename {from:?} to {to:?}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FilterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
