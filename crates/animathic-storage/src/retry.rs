//! Exponential backoff retry, scoped to transient `io` failures against the
//! object store (spec §4.7: "`io` is retried with exponential backoff, max
//! 3 attempts").

use std::future::Future;
use std::time::Duration;

use tracing::debug;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.pow(attempt)).min(self.max_delay)
    }
}

/// Retries `operation` while `should_retry` holds for the returned error
/// (spec §4.7: only the genuine `io` failure mode is retried — `auth` and
/// `quota` must surface immediately).
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    should_retry: impl Fn(&E) -> bool,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_retries && should_retry(&e) => {
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                debug!("storage operation attempt {} failed, retrying in {:?}: {}", attempt, delay, e);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let calls = AtomicU32::new(0);
        let result = retry_async(&config, |_| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient")
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let config = RetryConfig {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_async(&config, |_| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_when_predicate_rejects() {
        let config = RetryConfig {
            base_delay: Duration::from_millis(1),
            ..Default::default()
        };
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_async(&config, |e| *e == "retryable", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("permanent") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
