use std::fmt::Display;
use std::future::Future;
use tokio::time::{sleep, Duration};

/// Bounded retry with exponential backoff. The policy is independent of the
/// operation being retried; adapters share one definition instead of each
/// carrying its own delay loop.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
        }
    }

    /// Three retries on top of the first attempt, starting at one second
    /// and doubling.
    pub const fn standard() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }

    /// Runs `op`, retrying on error until the retry budget is spent. The
    /// delay doubles after every failed attempt. The last error is
    /// returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.retries {
                        return Err(err);
                    }
                    tracing::warn!(
                        "attempt {attempt}/{} failed ({err}), retrying in {:?}",
                        self.retries,
                        delay
                    );
                    sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success_without_spending_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<u32, &str> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<&str, &str> = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("flaky")
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_the_last_error_after_the_budget_is_spent() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<(), String> = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {n}")) }
            })
            .await;
        assert_eq!(result, Err("failure 3".to_string()));
        // one initial attempt plus three retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
