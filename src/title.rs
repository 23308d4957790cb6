//! Human-readable file names from video titles.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::download::DownloaderConfig;
use crate::error::PoolError;
use crate::process::ProcessRunner;
use crate::scheduler::WorkerPool;

/// Keeps ASCII letters, Cyrillic letters, digits, spaces and `,.!?`.
pub fn sanitize_title(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, 'А'..='я' | 'ё' | 'Ё')
                || matches!(c, ' ' | ',' | '.' | '!' | '?')
        })
        .collect()
}

/// Looks up video titles with the same tool used for downloads.
pub struct VideoTitleResolver {
    pool: WorkerPool,
    runner: Arc<dyn ProcessRunner>,
    program: String,
    proxy_url: Option<String>,
    audio_format: String,
}

impl VideoTitleResolver {
    pub fn new(pool: WorkerPool, runner: Arc<dyn ProcessRunner>, config: &DownloaderConfig) -> Self {
        Self {
            pool,
            runner,
            program: config.program.clone(),
            proxy_url: config.proxy_url.clone(),
            audio_format: config.audio_format.clone(),
        }
    }

    /// File name for `url`, e.g. `My Talk.mp3`.
    ///
    /// Returns `None` when the lookup fails or nothing printable is left after
    /// sanitizing.
    pub async fn resolve(&self, url: &str) -> Option<String> {
        let mut title = self.lookup(url, None).await;
        if title.is_none() {
            if let Some(proxy_url) = self.proxy_url.as_deref() {
                debug!(url, "Retrying title lookup through proxy");
                title = self.lookup(url, Some(proxy_url)).await;
            }
        }

        let clean = sanitize_title(&title?);
        if clean.is_empty() {
            info!(url, "Title has no usable characters");
            return None;
        }
        Some(format!("{}.{}", clean, self.audio_format))
    }

    async fn lookup(&self, url: &str, proxy_url: Option<&str>) -> Option<String> {
        let mut args = vec!["--get-title".to_string()];
        if let Some(proxy_url) = proxy_url {
            args.push("--proxy".to_string());
            args.push(proxy_url.to_string());
        }
        args.push(url.to_string());

        let runner = Arc::clone(&self.runner);
        let program = self.program.clone();
        let result: Result<Option<String>, PoolError> = self
            .pool
            .submit(move || async move {
                match runner.run(&program, &args).await {
                    Ok(output) if output.success => Some(output.stdout),
                    Ok(output) => {
                        debug!(stderr = %output.stderr.trim(), "Title lookup exited unsuccessfully");
                        None
                    }
                    Err(e) => {
                        warn!(error = %e, "Title lookup could not run");
                        None
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| {
            warn!(url, error = %e, "Title lookup task failed");
            None
        })
    }
}
