use std::future::Future;
use std::time::Duration;

/// Delay strategy between retry attempts
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Same delay after every failed attempt
    Fixed(Duration),
    /// Base delay multiplied by the attempt number (1s, 2s, 3s, ...)
    Linear(Duration),
}

impl BackoffStrategy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Linear(base) => *base * attempt,
        }
    }
}

/// Runs `op` up to `max_attempts` times, sleeping between attempts.
///
/// `op` receives the 1-based attempt number. A failure is retried only while
/// attempts remain and `should_retry` accepts the error; the last error is
/// returned otherwise.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    backoff: BackoffStrategy,
    mut should_retry: impl FnMut(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && should_retry(&err) => {
                tokio::time::sleep(backoff.delay_for(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
