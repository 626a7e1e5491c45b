//! Read-through cache with TTL sentinels and stale-read fallback.
//!
//! Every `set` writes two backend entries: the payload itself, kept with
//! unlimited retention, and a `{key}_valid` sentinel carrying the TTL. A
//! normal `get` treats a missing sentinel as a miss even though the payload
//! is still there; `get` with `allow_expired` skips the sentinel check and
//! returns whatever payload exists: the explicit "serve stale when the
//! upstream is down" path.
//!
//! Cache failures never propagate: a broken backend behaves like an empty
//! cache and callers fall through to the API.

pub mod backend;

pub use backend::{CacheBackend, MemoryBackend, NullBackend};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default payload TTL: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// TTL for membership/admin lookups, which change more often.
pub const MEMBERSHIP_TTL: Duration = Duration::from_secs(60);

const VALID_SUFFIX: &str = "_valid";

/// Typed cache over a pluggable [`CacheBackend`].
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
}

impl Cache {
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Cache backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Degraded no-op cache, used when no distributed backend is available.
    #[must_use]
    pub fn unavailable() -> Self {
        warn!("no distributed cache available, falling back to null cache");
        Self::new(Arc::new(NullBackend))
    }

    /// Fetch a cached value.
    ///
    /// Without `allow_expired`, a missing or expired validity sentinel makes
    /// the entry count as absent. With `allow_expired`, the payload is
    /// returned as long as it physically exists.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, allow_expired: bool) -> Option<T> {
        if !allow_expired {
            let sentinel = self.backend.get(&format!("{key}{VALID_SUFFIX}")).await;
            if sentinel.is_none() {
                return None;
            }
        }
        let payload = self.backend.get(key).await?;
        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                // A payload written by an older build; treat as a miss.
                warn!(key, error = %e, "discarding undecodable cache payload");
                None
            }
        }
    }

    /// Store a value with the default one-hour TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, DEFAULT_TTL).await
    }

    /// Store a value with an explicit TTL.
    pub async fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache payload");
                return false;
            }
        };
        let sentinel_ok = self
            .backend
            .set(&format!("{key}{VALID_SUFFIX}"), "1".to_string(), Some(ttl))
            .await;
        let payload_ok = self.backend.set(key, payload, None).await;
        sentinel_ok && payload_ok
    }

    /// Drop all entries.
    pub async fn clear(&self) -> bool {
        self.backend.clear().await
    }
}
