//! Bounded immediate retries around a single network operation.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::UploadError;

/// Default number of attempts (first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Runs an operation until it succeeds or the attempt budget is spent.
///
/// Attempts follow each other immediately; there is no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryingTransport {
    max_attempts: u32,
}

impl Default for RetryingTransport {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryingTransport {
    /// Creates a policy with `max_attempts` total attempts (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Calls `operation(attempt)` with `attempt` starting at 1.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt when every attempt failed.
    pub async fn execute<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T, UploadError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(backend = label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        backend = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Upload attempt failed, will retry"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        backend = label,
                        attempt,
                        error = %err,
                        "Upload attempt failed, no attempts left"
                    );
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failure(n: u32) -> UploadError {
        UploadError::Status {
            status: 503,
            body: format!("attempt {}", n),
        }
    }

    #[test]
    fn test_default_attempts() {
        assert_eq!(RetryingTransport::default().max_attempts(), 3);
        assert_eq!(RetryingTransport::new(0).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let result = RetryingTransport::default()
            .execute("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(failure(attempt))
                    } else {
                        Ok("https://host/get/file.mp3")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "https://host/get/file.mp3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), UploadError> = RetryingTransport::default()
            .execute("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(failure(attempt)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(UploadError::Status { body, .. }) => assert_eq!(body, "attempt 3"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_success_makes_single_call() {
        let calls = AtomicU32::new(0);
        let result = RetryingTransport::new(5)
            .execute("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, UploadError>(1) }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
