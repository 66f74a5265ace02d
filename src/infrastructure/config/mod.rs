use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::domain::audio::preload::PreloadSettings;
use crate::domain::audio::retry::RetryPolicy;
use crate::domain::audio::service::CacheSettings;
use crate::infrastructure::rate_limiter::RateLimitConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub log_format: LogFormat,
    // Speech provider
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_tts_model: String,
    // Audio storage
    pub audio_bucket: String,
    pub audio_public_base_url: String,
    pub audio_storage_endpoint: Option<String>,
    pub aws_region: String,
    // Rate limiting
    pub tts_min_interval_ms: u64,
    pub tts_requests_per_minute: u32,
    // Retry
    pub tts_retry_max_attempts: u32,
    pub tts_retry_base_delay_ms: u64,
    // Cache
    pub audio_cache_capacity: usize,
    pub audio_cache_retention_days: i64,
    // Preload
    pub preload_batch_size: usize,
    pub preload_batch_pause_ms: u64,
}

/// A century of retention is effectively "keep forever"
const MAX_RETENTION_DAYS: i64 = 36_500;

fn retention_days(days: i64) -> Result<i64, String> {
    if (1..=MAX_RETENTION_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(format!(
            "AUDIO_CACHE_RETENTION_DAYS must be between 1 and {}, got {}",
            MAX_RETENTION_DAYS, days
        ))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
            gemini_api_key: env::var("GEMINI_API_KEY")?,
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            gemini_tts_model: env::var("GEMINI_TTS_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".to_string()),
            audio_bucket: env::var("AUDIO_BUCKET").unwrap_or_else(|_| "audio".to_string()),
            audio_public_base_url: env::var("AUDIO_PUBLIC_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            audio_storage_endpoint: env::var("AUDIO_STORAGE_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string()),
            tts_min_interval_ms: env::var("TTS_MIN_INTERVAL_MS")
                .unwrap_or_else(|_| "6500".to_string())
                .parse()?,
            tts_requests_per_minute: env::var("TTS_REQUESTS_PER_MINUTE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            tts_retry_max_attempts: env::var("TTS_RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            tts_retry_base_delay_ms: env::var("TTS_RETRY_BASE_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            audio_cache_capacity: env::var("AUDIO_CACHE_CAPACITY")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
            audio_cache_retention_days: retention_days(
                env::var("AUDIO_CACHE_RETENTION_DAYS")
                    .unwrap_or_else(|_| "90".to_string())
                    .parse()?,
            )?,
            preload_batch_size: env::var("PRELOAD_BATCH_SIZE")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            preload_batch_pause_ms: env::var("PRELOAD_BATCH_PAUSE_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
        };

        Ok(config)
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            min_interval: Duration::from_millis(self.tts_min_interval_ms),
            max_requests_per_window: self.tts_requests_per_minute,
            window: Duration::from_secs(60),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.tts_retry_max_attempts,
            base_delay: Duration::from_millis(self.tts_retry_base_delay_ms),
        }
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            memory_capacity: self.audio_cache_capacity,
            retention_days: self.audio_cache_retention_days,
            retry_policy: self.retry_policy(),
        }
    }

    pub fn preload_settings(&self) -> PreloadSettings {
        PreloadSettings {
            batch_size: self.preload_batch_size,
            batch_pause: Duration::from_millis(self.preload_batch_pause_ms),
        }
    }
}
