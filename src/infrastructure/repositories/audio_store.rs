use crate::error::AppResult;
use async_trait::async_trait;

/// Durable object storage for encoded audio.
/// Locators returned by `put` are stable public URLs.
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Upload bytes under `path` and return the public locator
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String>;

    /// Lightweight existence probe for a locator previously returned by `put`
    async fn head(&self, locator: &str) -> AppResult<bool>;
}
