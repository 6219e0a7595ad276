//! Exact-key response cache keyed by `(lesson_id, normalized_input)`.
//!
//! Lookups use `peek`, so a `get` only touches the hit/miss counters and
//! never reorders entries. Eviction therefore drops the least recently
//! *written* entry once capacity is reached.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use tokio::time::Instant;
use tutorlane_types::config::CacheConfig;
use tutorlane_types::lesson::Subject;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    lesson_id: String,
    normalized_input: String,
}

impl CacheKey {
    fn new(lesson_id: Option<&str>, normalized_input: &str) -> Self {
        Self {
            lesson_id: lesson_id.unwrap_or_default().to_string(),
            normalized_input: normalized_input.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content: String,
    pub subject: Subject,
    pub inserted_at: DateTime<Utc>,
    inserted: Instant,
}

/// Counters exposed on the metrics endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
    pub hit_rate: f64,
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// `ttl` of `None` keeps entries until they are evicted.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let ttl = (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs));
        Self::new(config.capacity, ttl)
    }

    pub fn get(&self, lesson_id: Option<&str>, normalized_input: &str) -> Option<CacheEntry> {
        let key = CacheKey::new(lesson_id, normalized_input);
        let found = {
            let entries = self.entries.lock().expect("response cache lock poisoned");
            entries
                .peek(&key)
                .filter(|entry| !self.is_expired(entry))
                .cloned()
        };
        match &found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn set(
        &self,
        lesson_id: Option<&str>,
        normalized_input: &str,
        content: impl Into<String>,
        subject: Subject,
    ) {
        let entry = CacheEntry {
            content: content.into(),
            subject,
            inserted_at: Utc::now(),
            inserted: Instant::now(),
        };
        let mut entries = self.entries.lock().expect("response cache lock poisoned");
        entries.put(CacheKey::new(lesson_id, normalized_input), entry);
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.inserted.elapsed() >= ttl)
    }

    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().expect("response cache lock poisoned");
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
            hit_rate: self.hit_rate(),
        }
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("response cache lock poisoned")
            .clear();
    }
}
