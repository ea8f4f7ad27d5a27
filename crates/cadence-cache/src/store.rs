//! The cache store abstraction.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::Result;

/// A byte-oriented key/value store with per-entry expiry.
///
/// Implementations must treat an expired entry exactly like a missing one.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove an entry. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Whether the store is currently reachable.
    async fn is_alive(&self) -> bool;
}
