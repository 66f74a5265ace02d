use crate::domain::audio::error::SynthesisError;
use crate::domain::audio::model::{Narrator, StyleHints, SynthesisResult};
use async_trait::async_trait;

/// Repository for speech synthesis.
/// Abstracts the underlying generative TTS provider.
///
/// Implementations are responsible for:
/// - Acquiring a permit from the process-wide rate limiter before every call
/// - Applying pace and tone hints to the prompt
/// - Validating the response strictly and returning raw 16-bit mono PCM
///
/// Retrying is the caller's decision; implementations report failures once.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Provider model identifier; part of the cache key
    fn model_id(&self) -> &str;

    /// Synthesize text with one prebuilt voice
    async fn synthesize_single(
        &self,
        text: &str,
        voice: &str,
        style: &StyleHints,
    ) -> Result<SynthesisResult, SynthesisError>;

    /// Synthesize a two-speaker dialogue. The provider supports at most two
    /// voices, so callers with larger casts must degrade to `synthesize_single`.
    async fn synthesize_dual(
        &self,
        text: &str,
        narrators: &[Narrator; 2],
        style: &StyleHints,
    ) -> Result<SynthesisResult, SynthesisError>;
}
