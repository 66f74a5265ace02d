use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Minimum spacing between two permitted requests
    pub min_interval: Duration,
    /// Requests allowed per rolling window
    pub max_requests_per_window: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(6_500),
            max_requests_per_window: 10,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct LimiterState {
    last_permit: Option<Instant>,
    window_start: Instant,
    window_count: u32,
}

/// Process-wide throttle in front of every outbound synthesis call.
///
/// One instance is created by the composition root and shared through `Arc`.
/// The state lock is held while waiting, so concurrent callers queue up and
/// are released one at a time.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState {
                last_permit: None,
                window_start: Instant::now(),
                window_count: 0,
            }),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until one more request fits both the spacing and the window budget
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        let window_end = state.window_start + self.config.window;
        if Instant::now() >= window_end {
            state.window_start = Instant::now();
            state.window_count = 0;
        } else if state.window_count >= self.config.max_requests_per_window.max(1) {
            tracing::info!(
                requests_in_window = state.window_count,
                wait_ms = (window_end - Instant::now()).as_millis() as u64,
                "Synthesis request budget for this window used up, waiting for reset"
            );
            sleep_until(window_end).await;
            state.window_start = Instant::now();
            state.window_count = 0;
        }

        if let Some(last) = state.last_permit {
            let earliest = last + self.config.min_interval;
            if Instant::now() < earliest {
                tracing::debug!(
                    wait_ms = (earliest - Instant::now()).as_millis() as u64,
                    "Spacing synthesis requests"
                );
                sleep_until(earliest).await;
            }
        }

        state.last_permit = Some(Instant::now());
        state.window_count += 1;
    }
}
