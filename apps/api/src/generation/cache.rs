//! Bounded in-process cache for raw model responses.
//!
//! Keyed by a hash of (prompt, tone, model). A hit skips the network entirely;
//! a miss never changes the result, only the latency and token spend. The
//! cache lives for the process lifetime and evicts least-recently-used.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

pub const DEFAULT_CACHE_CAPACITY: usize = 128;

pub struct PromptCache {
    inner: Mutex<LruCache<u64, String>>,
}

impl PromptCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Deterministic content key for one (prompt, tone, model) combination.
    pub fn key(prompt: &str, tone: &str, model: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        prompt.hash(&mut hasher);
        tone.hash(&mut hasher);
        model.hash(&mut hasher);
        hasher.finish()
    }

    pub fn get(&self, key: u64) -> Option<String> {
        // A poisoned lock degrades to a miss; the cache is not a correctness path.
        let mut guard = self.inner.lock().ok()?;
        guard.get(&key).cloned()
    }

    pub fn put(&self, key: u64, text: String) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.put(key, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_after_put() {
        let cache = PromptCache::new(4);
        let key = PromptCache::key("prompt", "Formal", "gpt-4o-mini");
        assert_eq!(cache.get(key), None);
        cache.put(key, "cached text".to_string());
        assert_eq!(cache.get(key), Some("cached text".to_string()));
    }

    #[test]
    fn test_key_is_deterministic_and_sensitive_to_all_parts() {
        let base = PromptCache::key("p", "Formal", "m");
        assert_eq!(base, PromptCache::key("p", "Formal", "m"));
        assert_ne!(base, PromptCache::key("q", "Formal", "m"));
        assert_ne!(base, PromptCache::key("p", "Technical", "m"));
        assert_ne!(base, PromptCache::key("p", "Formal", "n"));
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = PromptCache::new(2);
        let k1 = PromptCache::key("one", "Formal", "m");
        let k2 = PromptCache::key("two", "Formal", "m");
        let k3 = PromptCache::key("three", "Formal", "m");
        cache.put(k1, "1".into());
        cache.put(k2, "2".into());
        // touch k1 so k2 becomes the eviction candidate
        assert!(cache.get(k1).is_some());
        cache.put(k3, "3".into());
        assert!(cache.get(k1).is_some());
        assert!(cache.get(k2).is_none());
        assert!(cache.get(k3).is_some());
    }
}
