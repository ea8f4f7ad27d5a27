//! JSON helpers over a [`CacheStore`] with soft-failure semantics.
//!
//! [`TypedCache`] never returns an error. A store that is down, or an entry
//! that no longer decodes, is logged and reported as a miss; a failed write
//! is logged and skipped. Hit/miss/set/delete counters feed the admin
//! stats surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::CacheStore;

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

/// Point-in-time cache counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Reads that returned a value.
    pub hits: u64,
    /// Reads that returned nothing (including soft failures).
    pub misses: u64,
    /// Successful writes.
    pub sets: u64,
    /// Entries removed.
    pub deletes: u64,
    /// Hits as a percentage of reads (0 when there were no reads).
    pub hit_rate: f64,
}

/// Typed, fail-soft cache front end.
#[derive(Clone)]
pub struct TypedCache {
    store: Arc<dyn CacheStore>,
    counters: Arc<Counters>,
}

impl TypedCache {
    /// Wrap a store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Read and decode a value. Any failure is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.miss();
                return None;
            }
            Err(error) => {
                warn!(key, %error, "cache read failed, treating as miss");
                self.miss();
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                let _ = self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            Err(error) => {
                warn!(key, %error, "cached value does not decode, treating as miss");
                self.miss();
                None
            }
        }
    }

    /// Encode and store a value. Returns whether the write happened.
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(key, %error, "failed to encode cache value");
                return false;
            }
        };
        match self.store.set(key, bytes, ttl).await {
            Ok(()) => {
                let _ = self.counters.sets.fetch_add(1, Ordering::Relaxed);
                debug!(key, ttl_secs = ttl.as_secs(), "cached");
                true
            }
            Err(error) => {
                warn!(key, %error, "cache write skipped");
                false
            }
        }
    }

    /// Remove an entry. Returns whether a live entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => {
                if removed {
                    let _ = self.counters.deletes.fetch_add(1, Ordering::Relaxed);
                }
                removed
            }
            Err(error) => {
                warn!(key, %error, "cache delete failed");
                false
            }
        }
    }

    /// Whether the underlying store is reachable.
    pub async fn is_alive(&self) -> bool {
        self.store.is_alive().await
    }

    /// Snapshot of the counters.
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.counters.hits.load(Ordering::Relaxed);
        let misses = self.counters.misses.load(Ordering::Relaxed);
        let reads = hits + misses;
        let hit_rate = if reads == 0 {
            0.0
        } else {
            (hits as f64 / reads as f64) * 100.0
        };
        CacheStats {
            hits,
            misses,
            sets: self.counters.sets.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            hit_rate,
        }
    }

    /// Zero every counter.
    pub fn reset_stats(&self) {
        for counter in [
            &self.counters.hits,
            &self.counters.misses,
            &self.counters.sets,
            &self.counters.deletes,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn miss(&self) {
        let _ = self.counters.misses.fetch_add(1, Ordering::Relaxed);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
