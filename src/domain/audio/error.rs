use crate::error::AppError;
use std::time::Duration;

/// Failures surfaced by the synthesis provider client and the encoder boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// Provider per-day ceiling reached; nothing will succeed for the rest of the process
    #[error("daily synthesis quota exceeded: {0}")]
    QuotaExceededDaily(String),

    #[error("rate limited by provider: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("authentication with synthesis provider failed: {0}")]
    AuthenticationFailed(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("audio payload too small: {actual} bytes (minimum {minimum})")]
    UndersizedAudio { actual: usize, minimum: usize },

    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl SynthesisError {
    /// Worth retrying with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, SynthesisError::RateLimited { .. })
    }

    /// Callers running batches must stop issuing further work
    pub fn is_fatal_for_process(&self) -> bool {
        matches!(self, SynthesisError::QuotaExceededDaily(_))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SynthesisError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AudioServiceError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("repository error: {0}")]
    Repository(String),
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl AudioServiceError {
    pub fn is_fatal_for_process(&self) -> bool {
        matches!(self, AudioServiceError::Synthesis(e) if e.is_fatal_for_process())
    }
}

impl From<AppError> for AudioServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Storage(msg) => AudioServiceError::Storage(msg),
            AppError::BadRequest(msg) => AudioServiceError::Invalid(msg),
            other => AudioServiceError::Repository(other.to_string()),
        }
    }
}
