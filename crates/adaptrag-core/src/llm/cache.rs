//! Structured-generation response cache

use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Cache entry with TTL
#[derive(Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// In-memory TTL cache of parsed generation outputs.
///
/// Bounded by `capacity`; when full, expired entries are dropped first
/// and the insert is skipped if nothing expired.
pub struct GenerationCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl GenerationCache {
    /// One hour TTL, 1024 entries
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(3600), 1024)
    }

    pub fn with_ttl(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Get cached value if present and not expired
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        (Instant::now() < entry.expires_at).then(|| entry.value.clone())
    }

    pub fn insert(&self, key: String, value: serde_json::Value) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let now = Instant::now();
            entries.retain(|_, entry| now < entry.expires_at);
            if entries.len() >= self.capacity {
                tracing::debug!("Generation cache full, skipping insert");
                return;
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        match self.entries.read() {
            Ok(entries) => {
                let now = Instant::now();
                let expired = entries.values().filter(|e| now >= e.expires_at).count();
                CacheStats {
                    total_entries: entries.len(),
                    expired_entries: expired,
                    active_entries: entries.len() - expired,
                }
            }
            Err(_) => CacheStats::default(),
        }
    }
}

impl Default for GenerationCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

/// Cache key over everything that determines a generation's output
pub fn generation_cache_key(
    model: &str,
    prompt: &str,
    schema: &serde_json::Value,
    temperature: f32,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(model.as_bytes());
    hasher.update(&[0]);
    hasher.update(prompt.as_bytes());
    hasher.update(&[0]);
    hasher.update(schema.to_string().as_bytes());
    hasher.update(&temperature.to_le_bytes());
    format!("gen:{}", hasher.finalize().to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_basic() {
        let cache = GenerationCache::new();
        cache.insert("k1".to_string(), json!({"a": 1}));
        assert_eq!(cache.get("k1"), Some(json!({"a": 1})));
        assert_eq!(cache.get("k2"), None);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = GenerationCache::with_ttl(Duration::from_millis(50), 8);
        cache.insert("k1".to_string(), json!(1));
        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.stats().expired_entries, 1);
    }

    #[test]
    fn test_capacity_evicts_expired_then_skips() {
        let cache = GenerationCache::with_ttl(Duration::from_millis(50), 1);
        cache.insert("old".to_string(), json!(1));
        std::thread::sleep(Duration::from_millis(80));
        cache.insert("new".to_string(), json!(2));
        assert_eq!(cache.get("new"), Some(json!(2)));

        cache.insert("third".to_string(), json!(3));
        assert_eq!(cache.get("third"), None);
        assert_eq!(cache.stats().total_entries, 1);
    }

    #[test]
    fn test_key_depends_on_every_input() {
        let schema = json!({"type": "object"});
        let base = generation_cache_key("m", "p", &schema, 0.3);
        assert_eq!(base, generation_cache_key("m", "p", &schema, 0.3));
        assert_ne!(base, generation_cache_key("m2", "p", &schema, 0.3));
        assert_ne!(base, generation_cache_key("m", "p2", &schema, 0.3));
        assert_ne!(base, generation_cache_key("m", "p", &json!({}), 0.3));
        assert_ne!(base, generation_cache_key("m", "p", &schema, 0.4));
    }
}
