//! Fallback chain across upload backends.
//!
//! Given a file and its size, [`UploaderPool::upload`]:
//!
//! 1. keeps the backends whose capacity is at least the file size;
//! 2. shuffles them uniformly, so load spreads across hosts;
//! 3. tries them one at a time, stopping at the first URL;
//! 4. returns `None` if none was eligible or every attempt failed.
//!
//! Selection is memoryless: past successes never bias the order.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::error::UploadError;

use super::backend::UploadBackend;
use super::catalog::{build_backends, default_backend_specs};
use super::retry::{RetryingTransport, DEFAULT_MAX_ATTEMPTS};
use super::transport::{ReqwestTransport, Transport, DEFAULT_REQUEST_TIMEOUT};

/// Configuration for the uploader pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderPoolConfig {
    /// Attempts per backend, first try included.
    pub max_attempts: u32,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Catalog backends to leave out, by name.
    pub disabled_backends: Vec<String>,
}

impl Default for UploaderPoolConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            disabled_backends: Vec::new(),
        }
    }
}

/// All configured upload backends.
pub struct UploaderPool {
    backends: Vec<Arc<dyn UploadBackend>>,
    max_upload_size_in_bytes: u64,
}

impl std::fmt::Debug for UploaderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploaderPool")
            .field("backends", &self.backend_names())
            .field("max_upload_size_in_bytes", &self.max_upload_size_in_bytes)
            .finish()
    }
}

impl UploaderPool {
    /// Creates a pool over a fixed backend list.
    pub fn new(backends: Vec<Arc<dyn UploadBackend>>) -> Self {
        let max_upload_size_in_bytes = backends
            .iter()
            .map(|backend| backend.max_upload_size_in_bytes())
            .max()
            .unwrap_or(0);
        Self {
            backends,
            max_upload_size_in_bytes,
        }
    }

    /// Builds the catalog backends over a reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Client` if the HTTP client cannot be built.
    pub fn from_config(config: &UploaderPoolConfig) -> Result<Self, UploadError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.request_timeout)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Builds the catalog backends over the given transport.
    pub fn with_transport(config: &UploaderPoolConfig, transport: Arc<dyn Transport>) -> Self {
        let specs = default_backend_specs()
            .into_iter()
            .filter(|spec| !config.disabled_backends.contains(&spec.name))
            .collect();
        let backends = build_backends(specs, transport, RetryingTransport::new(config.max_attempts));
        Self::new(backends)
    }

    /// Largest capacity across all backends; 0 when there are none.
    pub fn max_upload_size_in_bytes(&self) -> u64 {
        self.max_upload_size_in_bytes
    }

    pub fn backends(&self) -> &[Arc<dyn UploadBackend>] {
        &self.backends
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|backend| backend.name()).collect()
    }

    /// Backends able to take a file of `file_size_in_bytes`, in configured order.
    pub fn eligible_backends(&self, file_size_in_bytes: u64) -> Vec<Arc<dyn UploadBackend>> {
        self.backends
            .iter()
            .filter(|backend| backend.max_upload_size_in_bytes() >= file_size_in_bytes)
            .cloned()
            .collect()
    }

    /// Uploads the file through the first backend that accepts it.
    pub async fn upload(&self, file_path: &Path, file_size_in_bytes: u64) -> Option<String> {
        let mut candidates = self.eligible_backends(file_size_in_bytes);
        if candidates.is_empty() {
            warn!(
                file = %file_path.display(),
                size = file_size_in_bytes,
                max = self.max_upload_size_in_bytes,
                "No upload backend can accept this file"
            );
            return None;
        }

        candidates.shuffle(&mut rand::rng());

        let total = candidates.len();
        for (position, backend) in candidates.iter().enumerate() {
            info!(
                backend = backend.name(),
                attempt = position + 1,
                of = total,
                size = file_size_in_bytes,
                "Trying upload backend"
            );
            match backend.upload(file_path, file_size_in_bytes).await {
                Some(url) => {
                    info!(backend = backend.name(), url = %url, "Upload delivered");
                    return Some(url);
                }
                None => {
                    warn!(backend = backend.name(), "Upload backend returned no URL, falling back");
                }
            }
        }

        warn!(
            file = %file_path.display(),
            tried = total,
            "All eligible upload backends failed"
        );
        None
    }
}
