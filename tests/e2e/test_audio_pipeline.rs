use crate::helpers::audio_store::InMemoryAudioStore;
use crate::helpers::TestContext;
use base64::Engine;
use lingua_audio::domain::audio::{
    AudioCacheApi, AudioCacheService, AudioRequest, CacheSettings, Pace, PreloadOrchestrator,
    PreloadSettings, RetryPolicy,
};
use lingua_audio::infrastructure::rate_limiter::{RateLimitConfig, RateLimiter};
use lingua_audio::infrastructure::repositories::{GeminiTtsRepository, PgAudioCacheRepository};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const GENERATE_PATH: &str = "/v1beta/models/e2e-tts:generateContent";

fn audio_body(sample_bytes: usize) -> String {
    json!({
        "candidates": [{
            "content": { "parts": [{ "inlineData": {
                "mimeType": "audio/L16;codec=pcm;rate=24000",
                "data": base64::engine::general_purpose::STANDARD.encode(vec![3u8; sample_bytes])
            }}]},
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

fn service(ctx: &TestContext, base_url: &str, store: Arc<InMemoryAudioStore>) -> Arc<AudioCacheService> {
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        min_interval: Duration::from_millis(1),
        max_requests_per_window: 1_000,
        window: Duration::from_secs(60),
    }));
    let tts = GeminiTtsRepository::new(
        base_url.to_string(),
        "e2e-key".to_string(),
        "e2e-tts".to_string(),
        limiter,
    )
    .unwrap();

    Arc::new(AudioCacheService::new(
        Arc::new(tts),
        store,
        Arc::new(PgAudioCacheRepository::new(ctx.pool.clone())),
        CacheSettings {
            memory_capacity: 10,
            retention_days: 90,
            retry_policy: RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(5),
            },
        },
    ))
}

fn request(content_id: &str, text: &str, pace: Pace) -> AudioRequest {
    AudioRequest {
        content_id: content_id.to_string(),
        text: text.to_string(),
        language: Some(lingua_audio::domain::audio::LanguageCode::Spanish),
        voice: Some("Aoede".to_string()),
        speakers: vec![],
        tone: None,
        pace,
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_generate_once_and_serve_from_both_tiers() {
    let ctx = TestContext::new().await.unwrap();
    let mut server = mockito::Server::new_async().await;
    let provider = server
        .mock("POST", GENERATE_PATH)
        .with_status(200)
        .with_body(audio_body(4_800))
        .expect(1)
        .create_async()
        .await;
    let store = Arc::new(InMemoryAudioStore::default());

    let first_process = service(&ctx, &server.url(), store.clone());
    let locator = first_process
        .resolve(&request("vocab-1", "hola", Pace::Slow))
        .await
        .unwrap();
    let memory_hit = first_process
        .resolve(&request("vocab-1", "hola", Pace::Slow))
        .await
        .unwrap();
    assert_eq!(memory_hit, locator);

    // A new process only has the persistent tier
    let second_process = service(&ctx, &server.url(), store.clone());
    let persistent_hit = second_process
        .resolve(&request("vocab-1", "hola", Pace::Slow))
        .await
        .unwrap();
    assert_eq!(persistent_hit, locator);
    assert_eq!(second_process.stats().persistent_hits, 1);

    let (content_type, bytes) = store.object(&locator).unwrap();
    assert_eq!(content_type, "audio/wav");
    assert_eq!(bytes.len(), 44 + 4_800);
    assert_eq!(ctx.fixtures.count_entries().await.unwrap(), 1);
    provider.assert_async().await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_heal_an_entry_whose_blob_disappeared() {
    let ctx = TestContext::new().await.unwrap();
    let mut server = mockito::Server::new_async().await;
    let provider = server
        .mock("POST", GENERATE_PATH)
        .with_status(200)
        .with_body(audio_body(2_400))
        .expect(2)
        .create_async()
        .await;
    let store = Arc::new(InMemoryAudioStore::default());

    let locator = service(&ctx, &server.url(), store.clone())
        .resolve(&request("vocab-1", "hola", Pace::Normal))
        .await
        .unwrap();
    let stale = ctx.fixtures.entries_for("vocab-1").await.unwrap();
    store.remove(&locator);

    let restarted = service(&ctx, &server.url(), store.clone());
    let healed = restarted
        .resolve(&request("vocab-1", "hola", Pace::Normal))
        .await
        .unwrap();

    let entries = ctx.fixtures.entries_for("vocab-1").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_ne!(entries[0].id, stale[0].id);
    assert!(store.object(&healed).is_some());
    assert_eq!(restarted.stats().stale_evictions, 1);
    provider.assert_async().await;
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_not_cache_undersized_audio() {
    let ctx = TestContext::new().await.unwrap();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", GENERATE_PATH)
        .with_status(200)
        .with_body(audio_body(50))
        .create_async()
        .await;
    let store = Arc::new(InMemoryAudioStore::default());

    let result = service(&ctx, &server.url(), store.clone())
        .resolve(&request("vocab-1", "hola", Pace::Slow))
        .await;

    assert!(result.is_err());
    assert_eq!(store.len(), 0);
    assert_eq!(ctx.fixtures.count_entries().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn it_should_preload_and_stop_on_daily_quota() {
    let ctx = TestContext::new().await.unwrap();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", GENERATE_PATH)
        .with_status(429)
        .with_body(
            json!({ "error": {
                "code": 429,
                "message": "Quota exceeded for metric: generate_requests_per_model_per_day",
                "status": "RESOURCE_EXHAUSTED"
            }})
            .to_string(),
        )
        .create_async()
        .await;
    let store = Arc::new(InMemoryAudioStore::default());
    let orchestrator = PreloadOrchestrator::new(
        service(&ctx, &server.url(), store),
        PreloadSettings {
            batch_size: 2,
            batch_pause: Duration::from_millis(10),
        },
    );

    let requests = (0..6)
        .map(|n| request(&format!("vocab-{}", n), &format!("palabra {}", n), Pace::Normal))
        .collect();
    let report = orchestrator.preload(requests).await;

    assert!(report.aborted);
    assert!(report.resolved.is_empty());
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.not_attempted, 4);
}
