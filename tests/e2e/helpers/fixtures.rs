use anyhow::Result;
use chrono::{Duration, Utc};
use lingua_audio::domain::audio::{CacheKey, LanguageCode, SynthesisConfig};
use lingua_audio::infrastructure::db::DbPool;
use lingua_audio::infrastructure::repositories::{
    AudioCacheRepository, CacheEntry, PgAudioCacheRepository,
};
use std::sync::Arc;

pub struct TestFixtures {
    pool: Arc<DbPool>,
}

impl TestFixtures {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub fn key(text: &str) -> CacheKey {
        CacheKey::compute(text, &SynthesisConfig::single("Aoede", LanguageCode::Spanish))
    }

    /// Insert an entry whose retention clock started `age_days` ago
    pub async fn create_entry_aged(
        &self,
        content_id: &str,
        key: &CacheKey,
        age_days: i64,
    ) -> Result<CacheEntry> {
        let mut entry = CacheEntry::new(
            content_id,
            key,
            format!("https://cdn.test/audio/tts/es/{}/{}.wav", content_id, key.short()),
            "es",
            4_044,
        );
        entry.created_at = Utc::now() - Duration::days(age_days);
        entry.last_accessed_at = entry.created_at;

        let repo = PgAudioCacheRepository::new(self.pool.clone());
        Ok(repo.upsert(&entry).await?)
    }

    pub async fn count_entries(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audio_cache")
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(count.0)
    }

    pub async fn entries_for(&self, content_id: &str) -> Result<Vec<CacheEntry>> {
        let entries = sqlx::query_as::<_, CacheEntry>(
            r#"
            SELECT id, content_id, text_hash, config_hash, locator, language,
                   byte_size, access_count, created_at, last_accessed_at
            FROM audio_cache
            WHERE content_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(content_id)
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(entries)
    }
}
