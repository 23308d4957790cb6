//! Error types for podcastify operations.
//!
//! Defines error types for every subsystem:
//! - Startup configuration
//! - Queue lanes and the worker pool
//! - Upload backends and their transport
//! - External process execution
//! - Audio downloads

use thiserror::Error;

/// Errors that can occur while building the startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid proxy URL '{value}': {reason}")]
    InvalidProxyUrl { value: String, reason: String },

    #[error("Invalid upload attempts {0}: must be at least 1")]
    InvalidUploadAttempts(u32),

    #[error("Unknown upload backend '{0}'")]
    UnknownBackend(String),

    #[error("Temp directory '{0}' does not exist or is not a directory")]
    InvalidTempDir(String),
}

/// Errors that can occur when submitting work to a queue lane.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("No workers available to submit a task")]
    NoWorkers,

    #[error("Queue lane is closed")]
    QueueClosed,

    #[error("Task panicked: {0}")]
    TaskPanicked(String),
}

/// Errors that can occur during a single upload attempt.
///
/// These never leave an upload backend; the backend converts them to `None`.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Upload rejected with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid upload URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Errors that can occur while running an external process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while downloading audio.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download of '{url}' failed")]
    Failed { url: String },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_display() {
        assert_eq!(
            PoolError::NoWorkers.to_string(),
            "No workers available to submit a task"
        );
        assert!(PoolError::TaskPanicked("boom".to_string())
            .to_string()
            .contains("boom"));
    }

    #[test]
    fn test_upload_error_display() {
        let err = UploadError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_download_error_from_pool_error() {
        let err: DownloadError = PoolError::QueueClosed.into();
        assert!(matches!(err, DownloadError::Pool(PoolError::QueueClosed)));
    }
}
