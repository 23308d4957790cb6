//! Startup configuration.
//!
//! Raw values arrive as [`Settings`] (filled by the CLI from flags or
//! environment variables) and are validated once into an [`AppConfig`].
//! Components receive the typed sub-configs by reference and never read the
//! environment themselves.

use std::path::PathBuf;
use std::time::Duration;

use crate::delivery::DEFAULT_DIRECT_LIMIT_BYTES;
use crate::download::{DownloaderConfig, DEFAULT_PROGRAM};
use crate::error::ConfigError;
use crate::scheduler::WorkerPoolConfig;
use crate::upload::retry::DEFAULT_MAX_ATTEMPTS;
use crate::upload::transport::DEFAULT_REQUEST_TIMEOUT;
use crate::upload::{default_backend_names, UploaderPoolConfig};

/// Unvalidated settings as supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Raw `WORKERS` value; parsed leniently.
    pub workers: Option<String>,
    pub proxy_url: Option<String>,
    pub temp_dir: Option<PathBuf>,
    pub direct_limit_bytes: u64,
    pub upload_attempts: u32,
    pub upload_timeout_secs: u64,
    pub disabled_backends: Vec<String>,
    pub program: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workers: None,
            proxy_url: None,
            temp_dir: None,
            direct_limit_bytes: DEFAULT_DIRECT_LIMIT_BYTES,
            upload_attempts: DEFAULT_MAX_ATTEMPTS,
            upload_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            disabled_backends: Vec::new(),
            program: DEFAULT_PROGRAM.to_string(),
        }
    }
}

/// Validated configuration for every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub worker: WorkerPoolConfig,
    pub downloader: DownloaderConfig,
    pub direct_limit_bytes: u64,
    pub upload: UploaderPoolConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker: WorkerPoolConfig::default(),
            downloader: DownloaderConfig::default(),
            direct_limit_bytes: DEFAULT_DIRECT_LIMIT_BYTES,
            upload: UploaderPoolConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validates `settings` and builds the typed configuration.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidProxyUrl` if the proxy is not an absolute URL with a host
    /// - `ConfigError::InvalidTempDir` if the temp directory does not exist
    /// - `ConfigError::InvalidUploadAttempts` if attempts is zero
    /// - `ConfigError::UnknownBackend` if a disabled backend is not in the catalog
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let proxy_url = match settings.proxy_url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(validate_proxy_url(raw)?),
        };

        let temp_dir = match &settings.temp_dir {
            Some(dir) if !dir.as_os_str().is_empty() => {
                if !dir.is_dir() {
                    return Err(ConfigError::InvalidTempDir(dir.display().to_string()));
                }
                dir.clone()
            }
            _ => std::env::temp_dir(),
        };

        if settings.upload_attempts == 0 {
            return Err(ConfigError::InvalidUploadAttempts(settings.upload_attempts));
        }

        let known = default_backend_names();
        if let Some(unknown) = settings
            .disabled_backends
            .iter()
            .find(|name| !known.contains(name))
        {
            return Err(ConfigError::UnknownBackend(unknown.clone()));
        }

        let downloader = DownloaderConfig {
            proxy_url,
            temp_dir,
            program: settings.program.clone(),
            ..DownloaderConfig::default()
        };

        Ok(Self {
            worker: WorkerPoolConfig::from_raw(settings.workers.as_deref()),
            downloader,
            direct_limit_bytes: settings.direct_limit_bytes,
            upload: UploaderPoolConfig {
                max_attempts: settings.upload_attempts,
                request_timeout: Duration::from_secs(settings.upload_timeout_secs),
                disabled_backends: settings.disabled_backends.clone(),
            },
        })
    }
}

fn validate_proxy_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidProxyUrl {
        value: raw.to_string(),
        reason,
    };
    let url = reqwest::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(raw.to_string())
}
