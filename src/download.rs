//! Audio extraction through the worker pool.
//!
//! Every extraction is one blocking `yt-dlp` run submitted to the
//! [`WorkerPool`], so the number of concurrent runs never exceeds the lane
//! count. A failed run is retried once through the configured proxy, if any.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{DownloadError, PoolError};
use crate::process::ProcessRunner;
use crate::scheduler::WorkerPool;

/// Default external tool.
pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// Configuration for downloads and metadata lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Program to run.
    pub program: String,
    /// Proxy used for the second attempt when the direct one fails.
    pub proxy_url: Option<String>,
    /// Directory that receives extracted audio files.
    pub temp_dir: PathBuf,
    /// Target audio format.
    pub audio_format: String,
    /// Target audio quality.
    pub audio_quality: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            proxy_url: None,
            temp_dir: std::env::temp_dir(),
            audio_format: "mp3".to_string(),
            audio_quality: "96K".to_string(),
        }
    }
}

impl DownloaderConfig {
    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }
}

/// An extracted audio file on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    path: PathBuf,
}

impl DownloadedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file in bytes.
    pub async fn size(&self) -> std::io::Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }

    /// Deletes the file. Failures are logged and otherwise ignored.
    pub async fn remove(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            debug!(path = %self.path.display(), error = %e, "Could not remove downloaded file");
        }
    }
}

/// Downloads audio for a URL using the external tool.
pub struct Downloader {
    pool: WorkerPool,
    runner: Arc<dyn ProcessRunner>,
    config: DownloaderConfig,
}

impl Downloader {
    pub fn new(pool: WorkerPool, runner: Arc<dyn ProcessRunner>, config: &DownloaderConfig) -> Self {
        Self {
            pool,
            runner,
            config: config.clone(),
        }
    }

    /// Extracts the audio of `url` into the temp directory.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Failed` when the direct attempt and, if a proxy
    /// is configured, the proxied attempt both fail.
    pub async fn download(&self, url: &str) -> Result<DownloadedFile, DownloadError> {
        info!(url, "Downloading audio");
        if let Some(file) = self.attempt(url, None).await? {
            return Ok(file);
        }

        if let Some(proxy_url) = self.config.proxy_url.as_deref() {
            info!(url, "Retrying download through proxy");
            if let Some(file) = self.attempt(url, Some(proxy_url)).await? {
                return Ok(file);
            }
        }

        warn!(url, "Download failed");
        Err(DownloadError::Failed {
            url: url.to_string(),
        })
    }

    fn output_path(&self) -> PathBuf {
        self.config
            .temp_dir
            .join(format!("{}.{}", uuid::Uuid::new_v4(), self.config.audio_format))
    }

    fn args(&self, output: &Path, url: &str, proxy_url: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-x".to_string(),
            "--audio-format".to_string(),
            self.config.audio_format.clone(),
            "--audio-quality".to_string(),
            self.config.audio_quality.clone(),
        ];
        if let Some(proxy_url) = proxy_url {
            args.push("--proxy".to_string());
            args.push(proxy_url.to_string());
        }
        args.push("--output".to_string());
        args.push(output.display().to_string());
        args.push(url.to_string());
        args
    }

    async fn attempt(&self, url: &str, proxy_url: Option<&str>) -> Result<Option<DownloadedFile>, PoolError> {
        let output = self.output_path();
        let args = self.args(&output, url, proxy_url);
        let runner = Arc::clone(&self.runner);
        let program = self.config.program.clone();
        let proxied = proxy_url.is_some();

        let succeeded = self
            .pool
            .submit(move || async move {
                match runner.run(&program, &args).await {
                    Ok(result) if result.success => true,
                    Ok(result) => {
                        warn!(proxied, stderr = %result.stderr.trim(), "Extraction exited unsuccessfully");
                        false
                    }
                    Err(e) => {
                        warn!(proxied, error = %e, "Extraction could not run");
                        false
                    }
                }
            })
            .await?;

        Ok(succeeded.then(|| DownloadedFile::new(output)))
    }
}
