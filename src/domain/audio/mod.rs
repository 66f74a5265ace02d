pub mod cache_key;
pub mod encoder;
pub mod error;
pub mod language;
pub mod memory_tier;
pub mod model;
pub mod preload;
pub mod retry;
pub mod service;

pub use cache_key::CacheKey;
pub use error::{AudioServiceError, SynthesisError};
pub use language::LanguageCode;
pub use model::{
    AudioRequest, Narrator, NarratorConfig, Pace, SpeakerInput, StyleHints, SynthesisConfig,
    SynthesisRequest, SynthesisResult,
};
pub use preload::{PreloadFailure, PreloadOrchestrator, PreloadReport, PreloadSettings};
pub use retry::RetryPolicy;
pub use service::{AudioCacheApi, AudioCacheService, CacheSettings, CacheStats};
