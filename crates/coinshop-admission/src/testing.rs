//! Broken stores for exercising the fail-open paths.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::ExpiringStore;

/// Every call fails immediately, like a store with its connection refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

fn refused() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl ExpiringStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<i64>, StoreError> {
        Err(refused())
    }

    async fn set_with_ttl(&self, _key: &str, _value: i64, _ttl: Duration) -> Result<(), StoreError> {
        Err(refused())
    }

    async fn increment_or_init(&self, _key: &str, _ttl: Duration) -> Result<i64, StoreError> {
        Err(refused())
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(refused())
    }
}

/// Every call hangs forever, like a store behind a dead network link.
#[derive(Debug, Clone, Copy, Default)]
pub struct StallingStore;

#[async_trait]
impl ExpiringStore for StallingStore {
    async fn get(&self, _key: &str) -> Result<Option<i64>, StoreError> {
        std::future::pending().await
    }

    async fn set_with_ttl(&self, _key: &str, _value: i64, _ttl: Duration) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn increment_or_init(&self, _key: &str, _ttl: Duration) -> Result<i64, StoreError> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        std::future::pending().await
    }
}
