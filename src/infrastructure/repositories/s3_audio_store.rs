use super::audio_store::AudioStore;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::sync::Arc;

/// S3-compatible implementation of the audio store
pub struct S3AudioStore {
    client: Arc<S3Client>,
    bucket: String,
    public_base_url: String,
}

impl S3AudioStore {
    pub fn new(client: Arc<S3Client>, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn locator_for(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }

    /// Object key behind a locator, if the locator belongs to this store
    fn key_from_locator<'a>(&self, locator: &'a str) -> Option<&'a str> {
        locator
            .strip_prefix(self.public_base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
    }
}

#[async_trait]
impl AudioStore for S3AudioStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let key = path.trim_start_matches('/');
        if key.is_empty() {
            return Err(AppError::BadRequest("audio object path is empty".to_string()));
        }
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    bucket = %self.bucket,
                    key = key,
                    "Audio upload failed"
                );
                AppError::Storage(format!("upload of {} failed: {}", key, e))
            })?;

        tracing::debug!(bucket = %self.bucket, key = key, size_bytes = size, "Audio uploaded");
        Ok(self.locator_for(key))
    }

    async fn head(&self, locator: &str) -> AppResult<bool> {
        let Some(key) = self.key_from_locator(locator) else {
            tracing::warn!(
                locator = locator,
                public_base_url = %self.public_base_url,
                "Locator does not belong to this audio store, treating blob as missing"
            );
            return Ok(false);
        };

        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().map(|e| e.is_not_found()).unwrap_or(false) => {
                Ok(false)
            }
            Err(err) => Err(AppError::Storage(format!(
                "existence check for {} failed: {}",
                key, err
            ))),
        }
    }
}
