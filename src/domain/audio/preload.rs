use super::error::AudioServiceError;
use super::model::AudioRequest;
use super::service::AudioCacheApi;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadSettings {
    /// Requests resolved concurrently per batch
    pub batch_size: usize,
    /// Courtesy pause between batches, on top of the rate limiter
    pub batch_pause: Duration,
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            batch_pause: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadFailure {
    pub content_id: String,
    pub error: String,
}

/// Outcome of a preload run. `resolved` only holds the items that succeeded;
/// callers reconcile it against their request list to find gaps.
#[derive(Debug, Default)]
pub struct PreloadReport {
    pub resolved: HashMap<String, String>,
    pub failures: Vec<PreloadFailure>,
    /// Set when a process-fatal failure stopped the run early
    pub aborted: bool,
    pub not_attempted: usize,
}

pub struct PreloadOrchestrator {
    cache: Arc<dyn AudioCacheApi>,
    settings: PreloadSettings,
}

impl PreloadOrchestrator {
    pub fn new(cache: Arc<dyn AudioCacheApi>, settings: PreloadSettings) -> Self {
        Self { cache, settings }
    }

    /// Resolve every request through the cache in small concurrent batches.
    /// Single failures are recorded and skipped; an exhausted daily quota stops
    /// the remaining batches.
    pub async fn preload(&self, requests: Vec<AudioRequest>) -> PreloadReport {
        let start_time = std::time::Instant::now();
        let batch_size = self.settings.batch_size.max(1);
        let total = requests.len();
        let mut report = PreloadReport::default();
        let mut attempted = 0;

        tracing::info!(
            total_requests = total,
            batch_size = batch_size,
            "Starting audio preload"
        );

        for (index, batch) in requests.chunks(batch_size).enumerate() {
            if index > 0 && !self.settings.batch_pause.is_zero() {
                tokio::time::sleep(self.settings.batch_pause).await;
            }

            let outcomes = join_all(batch.iter().map(|request| async move {
                (request, self.cache.resolve(request).await)
            }))
            .await;
            attempted += batch.len();

            let mut fatal = false;
            for (request, outcome) in outcomes {
                match outcome {
                    Ok(locator) => {
                        report.resolved.insert(request.content_id.clone(), locator);
                    }
                    Err(err) => {
                        fatal |= err.is_fatal_for_process();
                        record_failure(&mut report, request, &err);
                    }
                }
            }

            tracing::info!(
                batch_index = index,
                resolved = report.resolved.len(),
                failed = report.failures.len(),
                remaining = total - attempted,
                "Preload batch finished"
            );

            if fatal {
                report.aborted = true;
                report.not_attempted = total - attempted;
                tracing::error!(
                    not_attempted = report.not_attempted,
                    "Daily synthesis quota exhausted, aborting preload"
                );
                break;
            }
        }

        tracing::info!(
            total_requests = total,
            resolved = report.resolved.len(),
            failed = report.failures.len(),
            aborted = report.aborted,
            latency_ms = start_time.elapsed().as_millis() as u64,
            "Audio preload completed"
        );

        report
    }
}

fn record_failure(report: &mut PreloadReport, request: &AudioRequest, err: &AudioServiceError) {
    tracing::warn!(
        content_id = %request.content_id,
        error = %err,
        "Audio preload failed for item"
    );
    report.failures.push(PreloadFailure {
        content_id: request.content_id.clone(),
        error: err.to_string(),
    });
}
