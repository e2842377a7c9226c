//! In-process [`ExpiringStore`] backed by a `DashMap`.
//!
//! Deadlines use `tokio::time::Instant`, so a paused test runtime can move
//! time forward without sleeping. Expired entries read as absent and are
//! dropped by [`MemoryStore::purge_expired`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::store::ExpiringStore;

#[derive(Debug, Clone, Copy)]
struct Slot {
    value: i64,
    expires_at: Instant,
}

impl Slot {
    fn fresh(now: Instant, ttl: Duration) -> Self {
        Self {
            value: 0,
            expires_at: now + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Shared in-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: Arc<DashMap<String, Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.slots.retain(|_, slot| {
            let live = slot.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }
}

#[async_trait]
impl ExpiringStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let now = Instant::now();
        Ok(self
            .slots
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value))
    }

    async fn set_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now() + ttl;
        self.slots
            .insert(key.to_owned(), Slot { value, expires_at });
        Ok(())
    }

    async fn increment_or_init(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let now = Instant::now();
        // The entry guard holds the shard lock, so the reset and the bump
        // happen as one step for this key.
        let mut slot = self
            .slots
            .entry(key.to_owned())
            .or_insert_with(|| Slot::fresh(now, ttl));
        if !slot.is_live(now) {
            *slot = Slot::fresh(now, ttl);
        }
        slot.value += 1;
        Ok(slot.value)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .slots
            .remove(key)
            .is_some_and(|(_, slot)| slot.is_live(now)))
    }
}
