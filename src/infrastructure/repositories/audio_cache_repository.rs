use crate::domain::audio::cache_key::CacheKey;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent-tier record of one synthesized audio blob
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CacheEntry {
    pub id: Uuid,
    pub content_id: String,
    pub text_hash: String,
    pub config_hash: String,
    pub locator: String,
    pub language: String,
    pub byte_size: i64,
    pub access_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(
        content_id: &str,
        key: &CacheKey,
        locator: String,
        language: &str,
        byte_size: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content_id: content_id.to_string(),
            text_hash: key.text_hash.clone(),
            config_hash: key.config_hash.clone(),
            locator,
            language: language.to_string(),
            byte_size: byte_size as i64,
            access_count: 0,
            created_at: now,
            last_accessed_at: now,
        }
    }
}

#[async_trait]
pub trait AudioCacheRepository: Send + Sync {
    /// Entry for `(content_id, key)` created after `not_before`; older rows count as absent
    async fn find_fresh(
        &self,
        content_id: &str,
        key: &CacheKey,
        not_before: DateTime<Utc>,
    ) -> AppResult<Option<CacheEntry>>;

    /// Bump access bookkeeping for a hit
    async fn record_hit(&self, content_id: &str, key: &CacheKey) -> AppResult<()>;

    /// Insert or replace the entry for its `(content_id, text_hash, config_hash)` key
    async fn upsert(&self, entry: &CacheEntry) -> AppResult<CacheEntry>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Maintenance sweep; returns the number of rows removed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

pub struct PgAudioCacheRepository {
    pool: Arc<DbPool>,
}

impl PgAudioCacheRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AudioCacheRepository for PgAudioCacheRepository {
    async fn find_fresh(
        &self,
        content_id: &str,
        key: &CacheKey,
        not_before: DateTime<Utc>,
    ) -> AppResult<Option<CacheEntry>> {
        let pool = self.pool.as_ref();

        let entry = sqlx::query_as::<_, CacheEntry>(
            r#"
            SELECT id, content_id, text_hash, config_hash, locator, language,
                   byte_size, access_count, created_at, last_accessed_at
            FROM audio_cache
            WHERE content_id = $1 AND text_hash = $2 AND config_hash = $3
              AND created_at >= $4
            "#,
        )
        .bind(content_id)
        .bind(&key.text_hash)
        .bind(&key.config_hash)
        .bind(not_before)
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    async fn record_hit(&self, content_id: &str, key: &CacheKey) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            UPDATE audio_cache
            SET access_count = access_count + 1, last_accessed_at = $4
            WHERE content_id = $1 AND text_hash = $2 AND config_hash = $3
            "#,
        )
        .bind(content_id)
        .bind(&key.text_hash)
        .bind(&key.config_hash)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn upsert(&self, entry: &CacheEntry) -> AppResult<CacheEntry> {
        let pool = self.pool.as_ref();

        // A regenerated entry restarts its retention window
        let stored = sqlx::query_as::<_, CacheEntry>(
            r#"
            INSERT INTO audio_cache (id, content_id, text_hash, config_hash, locator, language,
                                     byte_size, access_count, created_at, last_accessed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT ON CONSTRAINT audio_cache_key
            DO UPDATE SET
                locator = EXCLUDED.locator,
                language = EXCLUDED.language,
                byte_size = EXCLUDED.byte_size,
                created_at = EXCLUDED.created_at,
                last_accessed_at = EXCLUDED.last_accessed_at
            RETURNING id, content_id, text_hash, config_hash, locator, language,
                      byte_size, access_count, created_at, last_accessed_at
            "#,
        )
        .bind(entry.id)
        .bind(&entry.content_id)
        .bind(&entry.text_hash)
        .bind(&entry.config_hash)
        .bind(&entry.locator)
        .bind(&entry.language)
        .bind(entry.byte_size)
        .bind(entry.access_count)
        .bind(entry.created_at)
        .bind(entry.last_accessed_at)
        .fetch_one(pool)
        .await?;

        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query("DELETE FROM audio_cache WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let pool = self.pool.as_ref();

        let result = sqlx::query("DELETE FROM audio_cache WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
