//! podcastify: extract podcast audio from video links and deliver it.
//!
//! This library provides a bounded worker pool for blocking download jobs, a
//! process-wide panic bus for fatal conditions, and a fallback chain of file
//! hosts for artifacts too large to hand over directly.

// Core modules
pub mod cli;
pub mod config;
pub mod delivery;
pub mod download;
pub mod error;
pub mod panic_bus;
pub mod process;
pub mod scheduler;
pub mod title;
pub mod upload;

// Re-export commonly used error types
pub use error::{ConfigError, DownloadError, PoolError, ProcessError, UploadError};
