//! The expiring key-value store capability.
//!
//! Coordinators only talk to shared state through [`ExpiringStore`]. The
//! trait is object-safe so the gate can hold an `Arc<dyn ExpiringStore>` and
//! tests can swap in the in-memory store or a broken one.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Shared, TTL-capable key-value store.
///
/// Keys are opaque strings and values are small integers. Implementations
/// are called from many tasks at once; the coordinators rely on nothing
/// beyond per-key atomicity of [`increment_or_init`](Self::increment_or_init).
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    /// Returns the live value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value and deadline.
    async fn set_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically increments `key` and returns the new value.
    ///
    /// An absent or expired key starts over at 1 with a fresh `ttl`. A live
    /// key keeps its original deadline.
    async fn increment_or_init(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Removes `key`. Returns whether a live entry was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Runs a store call under a deadline. Elapsing counts as a store failure.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}
