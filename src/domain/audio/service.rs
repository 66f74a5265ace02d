use super::cache_key::CacheKey;
use super::encoder::{duration_ms, encode_checked, CONTENT_TYPE};
use super::error::{AudioServiceError, SynthesisError};
use super::language::{detect_language, is_known_voice, LanguageCode};
use super::memory_tier::{MemoryKey, MemoryTier};
use super::model::{AudioRequest, NarratorConfig, SynthesisRequest, SynthesisResult};
use super::retry::{retry_with_backoff, RetryDecision, RetryPolicy};
use crate::error::AppError;
use crate::infrastructure::repositories::{
    AudioCacheRepository, AudioStore, CacheEntry, TtsRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingua::{LanguageDetector, LanguageDetectorBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Entry bound of the in-process tier
    pub memory_capacity: usize,
    /// Persistent entries older than this are treated as absent
    pub retention_days: i64,
    pub retry_policy: RetryPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            memory_capacity: 500,
            retention_days: 90,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Snapshot of cache counters since process start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub persistent_hits: u64,
    pub generations: u64,
    pub stale_evictions: u64,
    pub memory_entries: usize,
}

#[derive(Default)]
struct Counters {
    memory_hits: AtomicU64,
    persistent_hits: AtomicU64,
    generations: AtomicU64,
    stale_evictions: AtomicU64,
}

/// Two-tier content-addressable audio cache in front of the synthesis pipeline
pub struct AudioCacheService {
    tts_repo: Arc<dyn TtsRepository>,
    store: Arc<dyn AudioStore>,
    cache_repo: Arc<dyn AudioCacheRepository>,
    memory: MemoryTier,
    language_detector: LanguageDetector,
    settings: CacheSettings,
    counters: Counters,
}

impl AudioCacheService {
    pub fn new(
        tts_repo: Arc<dyn TtsRepository>,
        store: Arc<dyn AudioStore>,
        cache_repo: Arc<dyn AudioCacheRepository>,
        settings: CacheSettings,
    ) -> Self {
        // Create language detector with the languages we support in Cargo.toml
        let language_detector = LanguageDetectorBuilder::from_all_languages().build();

        Self {
            tts_repo,
            store,
            cache_repo,
            memory: MemoryTier::new(settings.memory_capacity),
            language_detector,
            settings,
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            persistent_hits: self.counters.persistent_hits.load(Ordering::Relaxed),
            generations: self.counters.generations.load(Ordering::Relaxed),
            stale_evictions: self.counters.stale_evictions.load(Ordering::Relaxed),
            memory_entries: self.memory.len(),
        }
    }

    /// Oldest creation time still served. A window too large to represent
    /// keeps everything.
    fn retention_cutoff(&self) -> DateTime<Utc> {
        chrono::Duration::try_days(self.settings.retention_days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Delete every persistent entry past the retention window.
    /// The memory tier is dropped as well, it refills from fresh persistent hits.
    pub async fn sweep_expired(&self) -> Result<u64, AudioServiceError> {
        let cutoff = self.retention_cutoff();
        let removed = self
            .cache_repo
            .delete_older_than(cutoff)
            .await
            .map_err(|e| infrastructure_failure("sweep", "*", e))?;
        self.memory.clear();

        tracing::info!(
            removed = removed,
            retention_days = self.settings.retention_days,
            cutoff = %cutoff,
            "Audio cache sweep completed"
        );
        Ok(removed)
    }
}

#[async_trait]
pub trait AudioCacheApi: Send + Sync {
    /// Return a locator for the audio of `request`, synthesizing it on a miss
    ///
    /// This operation:
    /// - Serves from the memory tier, then from fresh persistent entries whose blob still exists
    /// - Deletes persistent entries whose blob has disappeared
    /// - Otherwise synthesizes, encodes, uploads and writes both tiers
    async fn get_or_generate(
        &self,
        content_id: &str,
        request: &SynthesisRequest,
    ) -> Result<String, AudioServiceError>;

    /// Resolve a caller-facing request (language detection, narrator resolution) and serve it
    async fn resolve(&self, request: &AudioRequest) -> Result<String, AudioServiceError>;
}

#[async_trait]
impl AudioCacheApi for AudioCacheService {
    async fn get_or_generate(
        &self,
        content_id: &str,
        request: &SynthesisRequest,
    ) -> Result<String, AudioServiceError> {
        if content_id.trim().is_empty() {
            return Err(AudioServiceError::Invalid("content id is empty".to_string()));
        }
        if request.text.trim().is_empty() {
            return Err(AudioServiceError::Invalid(format!(
                "text for {} is empty",
                content_id
            )));
        }

        let key = CacheKey::compute_for_model(
            Some(self.tts_repo.model_id()),
            &request.text,
            &request.config,
        );
        let memory_key = MemoryKey::new(content_id, &key);

        // 1. Memory tier
        if let Some(locator) = self.memory.get(&memory_key) {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                content_id = content_id,
                cache_key = %key.short(),
                "Audio cache memory hit"
            );
            self.record_hit_in_background(content_id, &key);
            return Ok(locator);
        }

        // 2. Persistent tier, with blob liveness check
        let not_before = self.retention_cutoff();
        let entry = self
            .cache_repo
            .find_fresh(content_id, &key, not_before)
            .await
            .map_err(|e| infrastructure_failure("lookup", content_id, e))?;

        if let Some(entry) = entry {
            let exists = self
                .store
                .head(&entry.locator)
                .await
                .map_err(|e| infrastructure_failure("liveness check", content_id, e))?;

            if exists {
                self.counters.persistent_hits.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    content_id = content_id,
                    cache_key = %key.short(),
                    access_count = entry.access_count,
                    "Audio cache persistent hit"
                );
                self.memory.insert(memory_key, entry.locator.clone());
                self.record_hit_in_background(content_id, &key);
                return Ok(entry.locator);
            }

            tracing::warn!(
                content_id = content_id,
                cache_key = %key.short(),
                locator = %entry.locator,
                entry_id = %entry.id,
                "Cached audio blob is gone, evicting entry and regenerating"
            );
            self.cache_repo
                .delete(entry.id)
                .await
                .map_err(|e| infrastructure_failure("stale eviction", content_id, e))?;
            self.memory.remove(&memory_key);
            self.counters.stale_evictions.fetch_add(1, Ordering::Relaxed);
        }

        // 3. Generate
        self.generate(content_id, key, request).await
    }

    async fn resolve(&self, request: &AudioRequest) -> Result<String, AudioServiceError> {
        let language = match request.language {
            Some(language) => language,
            None => {
                let detected = detect_language(&self.language_detector, &request.text);
                tracing::info!(
                    content_id = %request.content_id,
                    language_detected = %detected,
                    "Language detected for audio request"
                );
                detected
            }
        };

        let synthesis = request.to_synthesis_request(language);
        self.get_or_generate(&request.content_id, &synthesis).await
    }
}

impl AudioCacheService {
    async fn generate(
        &self,
        content_id: &str,
        key: CacheKey,
        request: &SynthesisRequest,
    ) -> Result<String, AudioServiceError> {
        let start_time = std::time::Instant::now();
        let config = &request.config;

        for voice in config.narrator.voices() {
            if !is_known_voice(voice) {
                tracing::warn!(voice = voice, "Voice is not in the prebuilt catalog");
            }
        }

        tracing::info!(
            content_id = content_id,
            cache_key = %key.short(),
            language = %config.language,
            pace = config.style.pace.as_str(),
            dual = config.narrator.is_dual(),
            text_length = request.text.len(),
            "Audio cache miss, synthesizing"
        );

        let result = retry_with_backoff(&self.settings.retry_policy, classify_failure, || {
            self.synthesize(request)
        })
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                content_id = content_id,
                cache_key = %key.short(),
                "Audio synthesis failed"
            );
            e
        })?;

        let container = encode_checked(&result.samples).map_err(|e| {
            tracing::error!(
                error = %e,
                content_id = content_id,
                sample_bytes = result.samples.len(),
                finish_reason = ?result.finish_reason,
                "Synthesized audio rejected"
            );
            e
        })?;
        let byte_size = container.len();

        let path = blob_path(content_id, &key, config.language);
        let locator = self
            .store
            .put(&path, container, CONTENT_TYPE)
            .await
            .map_err(|e| infrastructure_failure("upload", content_id, e))?;

        let entry = CacheEntry::new(
            content_id,
            &key,
            locator.clone(),
            config.language.as_str(),
            byte_size,
        );
        self.cache_repo
            .upsert(&entry)
            .await
            .map_err(|e| infrastructure_failure("write-back", content_id, e))?;

        self.memory.insert(MemoryKey::new(content_id, &key), locator.clone());
        self.counters.generations.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            content_id = content_id,
            cache_key = %key.short(),
            locator = %locator,
            byte_size = byte_size,
            audio_duration_ms = duration_ms(result.samples.len()),
            latency_ms = start_time.elapsed().as_millis() as u64,
            "Audio generated and cached"
        );

        Ok(locator)
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, SynthesisError> {
        let style = &request.config.style;
        match &request.config.narrator {
            NarratorConfig::Single { voice } => {
                self.tts_repo
                    .synthesize_single(&request.text, voice, style)
                    .await
            }
            NarratorConfig::Dual(narrators) => {
                self.tts_repo
                    .synthesize_dual(&request.text, narrators, style)
                    .await
            }
        }
    }

    fn record_hit_in_background(&self, content_id: &str, key: &CacheKey) {
        let repo = Arc::clone(&self.cache_repo);
        let content_id = content_id.to_string();
        let key = key.clone();

        tokio::spawn(async move {
            if let Err(e) = repo.record_hit(&content_id, &key).await {
                tracing::warn!(
                    error = %e,
                    error_kind = e.kind(),
                    content_id = %content_id,
                    "Failed to record audio cache hit"
                );
            }
        });
    }
}

fn classify_failure(err: &SynthesisError) -> RetryDecision {
    if !err.is_retryable() {
        return RetryDecision::Stop;
    }
    match err.retry_after() {
        Some(delay) => RetryDecision::RetryAfter(delay),
        None => RetryDecision::Retry,
    }
}

fn infrastructure_failure(stage: &str, content_id: &str, err: AppError) -> AudioServiceError {
    tracing::error!(
        error = %err,
        error_kind = err.kind(),
        stage = stage,
        content_id = content_id,
        "Audio cache infrastructure failure"
    );
    AudioServiceError::from(err)
}

/// Object path of a generated container: `tts/{language}/{content_id}/{short key}.wav`
fn blob_path(content_id: &str, key: &CacheKey, language: LanguageCode) -> String {
    let safe_id: String = content_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("tts/{}/{}/{}.wav", language.as_str(), safe_id, key.short())
}
