use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff: attempt `n` waits `base_delay * 2^(n-1)` before the next try
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// What to do with a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Stop,
    Retry,
    /// Retry, but not before the provider-advertised delay
    RetryAfter(Duration),
}

/// Run `op` until it succeeds, `classify` says stop, or attempts run out.
/// The last error is returned unchanged.
pub async fn retry_with_backoff<T, E, Op, Fut, C>(
    policy: &RetryPolicy,
    classify: C,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryDecision,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let decision = classify(&err);
                if decision == RetryDecision::Stop || attempt >= max_attempts {
                    return Err(err);
                }

                let backoff = policy.delay_for(attempt);
                let delay = match decision {
                    RetryDecision::RetryAfter(hint) => backoff.max(hint),
                    _ => backoff,
                };

                tracing::warn!(
                    error = %err,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retryable failure, backing off"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
