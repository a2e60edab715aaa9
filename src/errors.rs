//! Error types for the WMS tile fetcher
//!
//! Errors are split by domain: configuration problems that abort the run
//! before any work starts, source-enumeration problems, per-tile fetch
//! failures that are counted but never propagated, and queue faults.

use std::path::PathBuf;

use thiserror::Error;

/// Server-spec and startup configuration errors. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Server spec file could not be read
    #[error("Cannot read server spec file: {path}")]
    SpecNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Server spec is not valid JSON or misses required fields
    #[error("Invalid server spec document")]
    InvalidSpec(#[from] serde_json::Error),

    /// Server URL is not a valid http(s) URL
    #[error("Invalid server URL: {url}")]
    InvalidUrl { url: String },

    /// Coordinate reference system is not one of the supported identifiers
    #[error("Unsupported SRS: {srs}. Only EPSG:3857 and EPSG:4326 are supported")]
    UnsupportedSrs { srs: String },

    /// Response format has no known file extension
    #[error("Unknown image format: {format}")]
    UnknownFormat { format: String },

    /// Concurrency must be a positive integer
    #[error("Invalid concurrency: {value}. Must be at least 1")]
    InvalidConcurrency { value: usize },

    /// Required parameter missing from the spec's parameter map
    #[error("Server spec parameter missing: {name}")]
    MissingParameter { name: String },

    /// No tile selection mode was chosen on the command line
    #[error("No tile selection: provide --tiles, or --zoom with --bbox or --geojson")]
    NoModeSelected,

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}

/// Tile source enumeration errors. The source is lazy, so these can surface
/// mid-run; they abort the dispatcher.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Tile list file could not be opened
    #[error("Cannot read tile list file: {path}")]
    ListNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tile list line did not parse as "col,row,zoom,xmin,ymin,xmax,ymax"
    #[error("Malformed tile definition at {path}:{line}: {content:?}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// A zoom specification was not "Z" or "Zlo-Zhi"
    #[error("Invalid zoom specification: {spec:?}")]
    InvalidZoomSpec { spec: String },

    /// A bbox string was not four comma-separated numbers
    #[error("Invalid bbox: {bbox:?}. Expected xmin,ymin,xmax,ymax")]
    InvalidBbox { bbox: String },

    /// GeoJSON area document could not be read
    #[error("Cannot read GeoJSON file: {path}")]
    GeoJsonNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// GeoJSON document was invalid or held no polygon features
    #[error("Invalid GeoJSON in {path}: {reason}")]
    InvalidGeoJson { path: PathBuf, reason: String },
}

/// Per-tile fetch and write errors. Recorded as failed attempts, never fatal.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport failure
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned HTTP {status}")]
    Status { status: u16 },

    /// Writing the tile to disk failed
    #[error("Failed to write tile to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Work queue faults. Treated as unrecoverable setup-class failures.
#[derive(Error, Debug)]
pub enum QueueError {
    /// A worker task panicked or was cancelled before publishing its counters
    #[error("Worker {worker_id} terminated abnormally")]
    WorkerLost { worker_id: usize },
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Source(_) => "source",
            AppError::Queue(_) => "queue",
            AppError::Io(_) => "io",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Source result type alias
pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = AppError::Config(ConfigError::NoModeSelected);
        assert_eq!(err.category(), "config");

        let err = AppError::Queue(QueueError::WorkerLost { worker_id: 3 });
        assert_eq!(err.category(), "queue");
    }

    #[test]
    fn test_unsupported_srs_message() {
        let err = ConfigError::UnsupportedSrs {
            srs: "EPSG:27700".to_string(),
        };
        assert!(err.to_string().contains("EPSG:3857"));
    }
}
