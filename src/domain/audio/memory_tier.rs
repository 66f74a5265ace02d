use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

use super::cache_key::CacheKey;

/// Memory-tier key: the same text can belong to several pieces of content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryKey {
    pub content_id: String,
    pub key: CacheKey,
}

impl MemoryKey {
    pub fn new(content_id: &str, key: &CacheKey) -> Self {
        Self {
            content_id: content_id.to_string(),
            key: key.clone(),
        }
    }
}

/// Bounded in-process mirror of the persistent tier (key → locator), strict LRU.
/// Never authoritative; rebuilt lazily from persistent hits.
pub struct MemoryTier {
    entries: Mutex<LruCache<MemoryKey, String>>,
}

impl MemoryTier {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a locator, marking the entry most-recently used
    pub fn get(&self, key: &MemoryKey) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: MemoryKey, locator: String) {
        if let Some((evicted, _)) = self.entries.lock().push(key.clone(), locator) {
            if evicted != key {
                tracing::debug!(
                    content_id = %evicted.content_id,
                    cache_key = %evicted.key.short(),
                    "Evicted least-recently-used memory cache entry"
                );
            }
        }
    }

    pub fn remove(&self, key: &MemoryKey) {
        self.entries.lock().pop(key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn contains(&self, key: &MemoryKey) -> bool {
        self.entries.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
