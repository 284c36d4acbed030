/// Error types for the catalog engine
///
/// Per-file errors (scan, thumbnail) are absorbed by an ingestion pass and
/// collected into its report. Store and engine errors are returned to the
/// caller of the operation that failed.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A single entry could not be read while walking a folder
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

impl ScanError {
    /// Path of the entry that failed, when known
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            ScanError::Io { path, .. } => Some(path),
            ScanError::Walk(err) => err.path(),
        }
    }
}

/// Thumbnail generation failed; the entry is still cataloged without one
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("cannot decode RAW image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("cannot write thumbnail {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode thumbnail {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Structural catalog failures, always surfaced to the caller
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a catalog already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("no catalog found at {0}")]
    NotFound(PathBuf),

    #[error("{0} is not a media catalog (missing Files table)")]
    NotACatalog(PathBuf),

    #[error("catalog query failed: {0}")]
    QueryFailed(#[from] rusqlite::Error),

    #[error("catalog I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures starting or awaiting an ingestion pass
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("an ingestion pass is already running")]
    Busy,

    #[error("ingestion requires a running tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("ingestion worker stopped before reporting completion")]
    WorkerLost,
}

/// Loading or saving catalog settings failed
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine a configuration directory")]
    NoConfigDir,
}

/// A per-file failure recorded in an ingestion report
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error("failed to catalog file: {0}")]
    Store(#[from] StoreError),
}
