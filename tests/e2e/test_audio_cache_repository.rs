use crate::helpers::fixtures::TestFixtures;
use crate::helpers::TestContext;
use chrono::{Duration, Utc};
use lingua_audio::infrastructure::repositories::{
    AudioCacheRepository, CacheEntry, PgAudioCacheRepository,
};
use pretty_assertions::assert_eq;

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_find_a_fresh_entry_by_content_and_key() {
    let ctx = TestContext::new().await.unwrap();
    let repo = PgAudioCacheRepository::new(ctx.pool.clone());
    let key = TestFixtures::key("hola");
    let stored = ctx.fixtures.create_entry_aged("vocab-1", &key, 0).await.unwrap();

    let found = repo
        .find_fresh("vocab-1", &key, Utc::now() - Duration::days(90))
        .await
        .unwrap()
        .expect("entry should be found");

    assert_eq!(found.id, stored.id);
    assert_eq!(found.locator, stored.locator);
    assert_eq!(found.language, "es");

    let other_content = repo
        .find_fresh("vocab-2", &key, Utc::now() - Duration::days(90))
        .await
        .unwrap();
    assert!(other_content.is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_treat_entries_past_retention_as_absent() {
    let ctx = TestContext::new().await.unwrap();
    let repo = PgAudioCacheRepository::new(ctx.pool.clone());
    let key = TestFixtures::key("hola");
    ctx.fixtures.create_entry_aged("vocab-1", &key, 120).await.unwrap();

    let found = repo
        .find_fresh("vocab-1", &key, Utc::now() - Duration::days(90))
        .await
        .unwrap();

    assert!(found.is_none());
    // Expiry is evaluated on read; the row is still there
    assert_eq!(ctx.fixtures.count_entries().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_upsert_on_the_cache_key() {
    let ctx = TestContext::new().await.unwrap();
    let repo = PgAudioCacheRepository::new(ctx.pool.clone());
    let key = TestFixtures::key("hola");
    let first = ctx.fixtures.create_entry_aged("vocab-1", &key, 10).await.unwrap();

    let replacement = CacheEntry::new(
        "vocab-1",
        &key,
        "https://cdn.test/audio/regenerated.wav".to_string(),
        "es",
        9_044,
    );
    let stored = repo.upsert(&replacement).await.unwrap();

    // Same row, new locator and restarted retention clock
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.locator, "https://cdn.test/audio/regenerated.wav");
    assert_eq!(stored.byte_size, 9_044);
    assert!(stored.created_at > first.created_at);
    assert_eq!(ctx.fixtures.count_entries().await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_record_hits() {
    let ctx = TestContext::new().await.unwrap();
    let repo = PgAudioCacheRepository::new(ctx.pool.clone());
    let key = TestFixtures::key("hola");
    let entry = ctx.fixtures.create_entry_aged("vocab-1", &key, 1).await.unwrap();

    repo.record_hit("vocab-1", &key).await.unwrap();
    repo.record_hit("vocab-1", &key).await.unwrap();

    let entries = ctx.fixtures.entries_for("vocab-1").await.unwrap();
    assert_eq!(entries[0].access_count, 2);
    assert!(entries[0].last_accessed_at > entry.last_accessed_at);
    assert_eq!(entries[0].created_at, entry.created_at);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_delete_by_id() {
    let ctx = TestContext::new().await.unwrap();
    let repo = PgAudioCacheRepository::new(ctx.pool.clone());
    let keep = ctx
        .fixtures
        .create_entry_aged("vocab-1", &TestFixtures::key("hola"), 0)
        .await
        .unwrap();
    let drop = ctx
        .fixtures
        .create_entry_aged("vocab-1", &TestFixtures::key("adiós"), 0)
        .await
        .unwrap();

    repo.delete(drop.id).await.unwrap();

    let remaining = ctx.fixtures.entries_for("vocab-1").await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_sweep_entries_older_than_cutoff() {
    let ctx = TestContext::new().await.unwrap();
    let repo = PgAudioCacheRepository::new(ctx.pool.clone());
    ctx.fixtures
        .create_entry_aged("vocab-1", &TestFixtures::key("uno"), 200)
        .await
        .unwrap();
    ctx.fixtures
        .create_entry_aged("vocab-2", &TestFixtures::key("dos"), 91)
        .await
        .unwrap();
    ctx.fixtures
        .create_entry_aged("vocab-3", &TestFixtures::key("tres"), 5)
        .await
        .unwrap();

    let removed = repo
        .delete_older_than(Utc::now() - Duration::days(90))
        .await
        .unwrap();

    assert_eq!(removed, 2);
    assert_eq!(ctx.fixtures.count_entries().await.unwrap(), 1);
    assert_eq!(ctx.fixtures.entries_for("vocab-3").await.unwrap().len(), 1);
}
