use anyhow::Context;
use clap::{Parser, Subcommand};
use lingua_audio::domain::audio::{AudioCacheService, AudioRequest, PreloadOrchestrator};
use lingua_audio::infrastructure::config::{Config, LogFormat};
use lingua_audio::infrastructure::db::{check_connection, create_pool, run_migrations};
use lingua_audio::infrastructure::rate_limiter::RateLimiter;
use lingua_audio::infrastructure::repositories::{
    GeminiTtsRepository, PgAudioCacheRepository, S3AudioStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lingua-audio", version, about = "Synthesized audio cache maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pre-generate audio for every request in a JSON manifest
    Preload {
        /// JSON array of audio requests
        manifest: PathBuf,
    },
    /// Delete cache entries older than the retention window
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection
    check_connection(&pool).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database connection verified and migrations applied");

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;

    let mut s3_config = aws_sdk_s3::config::Builder::from(&aws_config);
    if let Some(endpoint) = &config.audio_storage_endpoint {
        tracing::info!(endpoint = %endpoint, "Using custom S3-compatible storage endpoint");
        s3_config = s3_config.endpoint_url(endpoint).force_path_style(true);
    }
    let s3_client = Arc::new(aws_sdk_s3::Client::from_conf(s3_config.build()));
    tracing::info!(
        region = ?aws_config.region(),
        bucket = %config.audio_bucket,
        "Audio storage client initialized"
    );

    let pool = Arc::new(pool);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Process-wide rate limiter, shared by every synthesis call
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit()));
    tracing::info!(
        min_interval_ms = rate_limiter.config().min_interval.as_millis() as u64,
        requests_per_window = rate_limiter.config().max_requests_per_window,
        window_secs = rate_limiter.config().window.as_secs(),
        "Synthesis rate limiter configured"
    );

    // 2. Repositories
    let tts_repo = Arc::new(
        GeminiTtsRepository::new(
            config.gemini_base_url.clone(),
            config.gemini_api_key.clone(),
            config.gemini_tts_model.clone(),
            rate_limiter.clone(),
        )
        .context("failed to build speech provider client")?,
    );
    let store = Arc::new(S3AudioStore::new(
        s3_client,
        config.audio_bucket.clone(),
        config.audio_public_base_url.clone(),
    ));
    let cache_repo = Arc::new(PgAudioCacheRepository::new(pool.clone()));

    // 3. Services
    let cache_service = Arc::new(AudioCacheService::new(
        tts_repo,
        store,
        cache_repo,
        config.cache_settings(),
    ));

    match cli.command {
        Command::Preload { manifest } => {
            let raw = tokio::fs::read_to_string(&manifest)
                .await
                .with_context(|| format!("failed to read manifest {}", manifest.display()))?;
            let requests: Vec<AudioRequest> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid manifest {}", manifest.display()))?;

            let orchestrator =
                PreloadOrchestrator::new(cache_service.clone(), config.preload_settings());
            let report = orchestrator.preload(requests).await;

            let summary = serde_json::json!({
                "resolved": report.resolved,
                "failures": report
                    .failures
                    .iter()
                    .map(|f| serde_json::json!({ "contentId": f.content_id, "error": f.error }))
                    .collect::<Vec<_>>(),
                "aborted": report.aborted,
                "notAttempted": report.not_attempted,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);

            let stats = cache_service.stats();
            tracing::info!(
                memory_hits = stats.memory_hits,
                persistent_hits = stats.persistent_hits,
                generations = stats.generations,
                stale_evictions = stats.stale_evictions,
                "Audio cache statistics"
            );

            if report.aborted {
                anyhow::bail!(
                    "preload aborted: daily synthesis quota exhausted ({} items not attempted)",
                    report.not_attempted
                );
            }
        }
        Command::Sweep => {
            let removed = cache_service.sweep_expired().await?;
            println!("{} expired cache entries removed", removed);
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lingua_audio=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lingua_audio=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
