//! Temporary bans per client.

use std::sync::Arc;
use std::time::Duration;

use crate::metrics::AdmissionMetrics;
use crate::store::{ExpiringStore, bounded};

const BANNED: i64 = 1;

pub(crate) fn ban_key(client: &str) -> String {
    format!("ban:{client}")
}

/// Stateless coordinator over the `ban:` key namespace.
///
/// Bans lift themselves when the entry's TTL runs out; there is no unban.
#[derive(Clone)]
pub struct BanRegistry {
    store: Arc<dyn ExpiringStore>,
    timeout: Duration,
    metrics: Arc<AdmissionMetrics>,
}

impl BanRegistry {
    pub fn new(store: Arc<dyn ExpiringStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            metrics: Arc::new(AdmissionMetrics::new()),
        }
    }

    pub(crate) fn with_metrics(mut self, metrics: Arc<AdmissionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether `client` is serving a ban.
    ///
    /// Fails open: an unreachable or slow store reads as "not banned".
    pub async fn is_banned(&self, client: &str) -> bool {
        match bounded(self.timeout, self.store.get(&ban_key(client))).await {
            Ok(entry) => entry.is_some(),
            Err(e) => {
                self.metrics.record_store_failure();
                tracing::warn!(client, error = %e, "ban registry unavailable, treating client as not banned");
                false
            }
        }
    }

    /// Bans `client` for `duration`, replacing any ban already in place.
    pub async fn record_ban(&self, client: &str, duration: Duration) {
        let key = ban_key(client);
        if let Err(e) = bounded(
            self.timeout,
            self.store.set_with_ttl(&key, BANNED, duration),
        )
        .await
        {
            self.metrics.record_store_failure();
            tracing::warn!(client, error = %e, "failed to record ban");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::testing::{FailingStore, StallingStore};

    const TIMEOUT: Duration = Duration::from_millis(50);

    #[tokio::test(start_paused = true)]
    async fn ban_lasts_for_its_duration() {
        let bans = BanRegistry::new(Arc::new(MemoryStore::new()), TIMEOUT);
        assert!(!bans.is_banned("c").await);

        bans.record_ban("c", Duration::from_secs(10)).await;
        assert!(bans.is_banned("c").await);
        assert!(!bans.is_banned("other").await);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(bans.is_banned("c").await);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!bans.is_banned("c").await);
    }

    #[tokio::test(start_paused = true)]
    async fn rebanning_restarts_the_clock() {
        let bans = BanRegistry::new(Arc::new(MemoryStore::new()), TIMEOUT);
        bans.record_ban("c", Duration::from_secs(10)).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        bans.record_ban("c", Duration::from_secs(10)).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(bans.is_banned("c").await);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_store_reads_as_not_banned() {
        let bans = BanRegistry::new(Arc::new(FailingStore), TIMEOUT);
        bans.record_ban("c", Duration::from_secs(10)).await;
        assert!(!bans.is_banned("c").await);
        assert_eq!(bans.metrics.snapshot().store_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_reads_as_not_banned() {
        let bans = BanRegistry::new(Arc::new(StallingStore), TIMEOUT);
        assert!(!bans.is_banned("c").await);
    }
}
