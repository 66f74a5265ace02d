use async_trait::async_trait;
use lingua_audio::error::AppResult;
use lingua_audio::infrastructure::repositories::AudioStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Bucket stand-in that keeps uploaded objects in memory
#[derive(Default)]
pub struct InMemoryAudioStore {
    objects: RwLock<HashMap<String, (String, Vec<u8>)>>,
}

impl InMemoryAudioStore {
    pub const BASE_URL: &'static str = "https://cdn.test/audio";

    pub fn object(&self, locator: &str) -> Option<(String, Vec<u8>)> {
        self.objects.read().get(locator).cloned()
    }

    pub fn remove(&self, locator: &str) {
        self.objects.write().remove(locator);
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }
}

#[async_trait]
impl AudioStore for InMemoryAudioStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<String> {
        let locator = format!("{}/{}", Self::BASE_URL, path);
        self.objects
            .write()
            .insert(locator.clone(), (content_type.to_string(), bytes));
        Ok(locator)
    }

    async fn head(&self, locator: &str) -> AppResult<bool> {
        Ok(self.objects.read().contains_key(locator))
    }
}
