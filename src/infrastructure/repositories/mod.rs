pub mod audio_cache_repository;
pub mod audio_store;
pub mod gemini_tts_repository;
pub mod s3_audio_store;
pub mod tts_repository;

pub use audio_cache_repository::{AudioCacheRepository, CacheEntry, PgAudioCacheRepository};
pub use audio_store::AudioStore;
pub use gemini_tts_repository::GeminiTtsRepository;
pub use s3_audio_store::S3AudioStore;
pub use tts_repository::TtsRepository;
