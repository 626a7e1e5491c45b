//! Cache storage backends.
//!
//! The bridge normally sits on the host platform's distributed cache; when
//! none is available it degrades to a null backend that caches nothing, and
//! callers simply fall through to the API on every read.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Raw key-value storage with optional per-entry expiry.
///
/// Values are opaque serialized payloads; typing happens in [`crate::Cache`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a value. Expired entries count as absent.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value. `ttl = None` means unlimited retention.
    /// Returns `false` when the backend could not store the value.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> bool;

    /// Drop all entries. Returns `false` on failure.
    async fn clear(&self) -> bool;
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process cache backend.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.expired(now))
            .map(|entry| entry.value.clone())
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> bool {
        let entry = Entry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        true
    }

    async fn clear(&self) -> bool {
        self.entries.write().await.clear();
        true
    }
}

/// Backend used when no distributed cache is available: stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[async_trait]
impl CacheBackend for NullBackend {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Option<Duration>) -> bool {
        false
    }

    async fn clear(&self) -> bool {
        true
    }
}
