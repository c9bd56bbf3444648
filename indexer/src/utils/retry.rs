//! Retry handler for managing retry logic across operations

use std::future::Future;
use tokio::time::{sleep, Duration};

use log::{error, info, warn};

/// Handles retry logic for operations that may fail temporarily
#[derive(Debug, Clone)]
pub struct RetryHandler {
    max_retries: u32,
    base_delay_ms: u64,
}

impl RetryHandler {
    pub fn new() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1000,
        }
    }

    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
        }
    }

    /// Execute an operation with retry logic
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        operation: F,
        operation_name: &str,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut retry_count = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if retry_count > 0 {
                        info!(
                            "{} succeeded after {} retries",
                            operation_name, retry_count);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    retry_count += 1;

                    if retry_count >= self.max_retries {
                        error!(
                            "{} failed after {} attempts: {}",
                            operation_name, self.max_retries, e);
                        return Err(e);
                    }

                    let delay = self.calculate_delay(retry_count);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                        operation_name, retry_count, self.max_retries, e, delay);

                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    /// Exponential backoff capped at 30 seconds
    fn calculate_delay(&self, retry_count: u32) -> u64 {
        let delay = self.base_delay_ms * 2u64.saturating_pow(retry_count - 1);
        delay.min(30_000)
    }
}

impl Default for RetryHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_after_transient_failures() {
        let handler = RetryHandler::with_config(3, 1);
        let attempts = AtomicU32::new(0);

        let result: Result<u32, String> = handler
            .execute_with_retry(
                || async {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 1 {
                        Err("transient".to_string())
                    } else {
                        Ok(7)
                    }
                },
                "test operation",
            )
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let handler = RetryHandler::with_config(3, 1);
        let attempts = AtomicU32::new(0);

        let result: Result<u32, String> = handler
            .execute_with_retry(
                || async {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err("always".to_string())
                },
                "test operation",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn delay_grows_and_caps() {
        let handler = RetryHandler::with_config(10, 1000);
        assert_eq!(handler.calculate_delay(1), 1000);
        assert_eq!(handler.calculate_delay(2), 2000);
        assert_eq!(handler.calculate_delay(3), 4000);
        assert_eq!(handler.calculate_delay(8), 30_000);
    }
}
