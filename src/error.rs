/// Infrastructure-level error type shared by repositories and storage
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Short machine-readable label, used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Storage(_) => "storage",
            Self::BadRequest(_) => "bad_request",
        }
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
