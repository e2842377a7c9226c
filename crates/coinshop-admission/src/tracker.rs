//! Server-failure counter per client.

use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::metrics::AdmissionMetrics;
use crate::store::{ExpiringStore, bounded};

pub(crate) fn error_key(client: &str) -> String {
    format!("errors:{client}")
}

/// Stateless coordinator over the `errors:` key namespace.
///
/// Only server-side failures may be fed in; client errors never count.
#[derive(Clone)]
pub struct ErrorTracker {
    store: Arc<dyn ExpiringStore>,
    error_window: Duration,
    threshold: u64,
    timeout: Duration,
    metrics: Arc<AdmissionMetrics>,
}

impl ErrorTracker {
    pub fn new(
        store: Arc<dyn ExpiringStore>,
        error_window: Duration,
        threshold: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            error_window,
            threshold,
            timeout,
            metrics: Arc::new(AdmissionMetrics::new()),
        }
    }

    pub(crate) fn with_metrics(mut self, metrics: Arc<AdmissionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Counts one server failure for `client` and reports whether the
    /// threshold has been reached.
    ///
    /// Every failure pushes the window deadline out to the full error window,
    /// so a client that keeps failing never ages out. A store failure
    /// reports `false`.
    pub async fn record_failure(&self, client: &str) -> bool {
        match self.bump(client).await {
            Ok(count) => {
                tracing::debug!(client, count, threshold = self.threshold, "server failure recorded");
                count >= self.threshold
            }
            Err(e) => {
                self.metrics.record_store_failure();
                tracing::warn!(client, error = %e, "error tracker unavailable, failure not counted");
                false
            }
        }
    }

    /// Forgets the failures counted for `client`.
    pub async fn reset(&self, client: &str) {
        if let Err(e) = bounded(self.timeout, self.store.delete(&error_key(client))).await {
            self.metrics.record_store_failure();
            tracing::warn!(client, error = %e, "failed to clear error count");
        }
    }

    async fn bump(&self, client: &str) -> Result<u64, StoreError> {
        let key = error_key(client);
        let current = bounded(self.timeout, self.store.get(&key)).await?.unwrap_or(0);
        let count = current.max(0).saturating_add(1);
        bounded(
            self.timeout,
            self.store.set_with_ttl(&key, count, self.error_window),
        )
        .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::testing::{FailingStore, StallingStore};

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn tracker(store: Arc<dyn ExpiringStore>, threshold: u64) -> ErrorTracker {
        ErrorTracker::new(store, Duration::from_secs(60), threshold, TIMEOUT)
    }

    #[tokio::test(start_paused = true)]
    async fn crosses_threshold_on_nth_failure() {
        let tracker = tracker(Arc::new(MemoryStore::new()), 3);
        assert!(!tracker.record_failure("c").await);
        assert!(!tracker.record_failure("c").await);
        assert!(tracker.record_failure("c").await);
        assert!(tracker.record_failure("c").await);
    }

    #[tokio::test(start_paused = true)]
    async fn clients_are_counted_separately() {
        let tracker = tracker(Arc::new(MemoryStore::new()), 2);
        assert!(!tracker.record_failure("a").await);
        assert!(!tracker.record_failure("b").await);
        assert!(tracker.record_failure("a").await);
    }

    #[tokio::test(start_paused = true)]
    async fn each_failure_extends_the_window() {
        let tracker = tracker(Arc::new(MemoryStore::new()), 3);
        assert!(!tracker.record_failure("c").await);
        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(!tracker.record_failure("c").await);
        // 100 s after the first failure, but only 50 s after the last.
        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(tracker.record_failure("c").await);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_client_ages_out() {
        let tracker = tracker(Arc::new(MemoryStore::new()), 2);
        assert!(!tracker.record_failure("c").await);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!tracker.record_failure("c").await);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_starts_the_count_over() {
        let store = Arc::new(MemoryStore::new());
        let tracker = tracker(store.clone(), 2);
        tracker.record_failure("c").await;
        tracker.reset("c").await;
        assert_eq!(store.get(&error_key("c")).await.unwrap(), None);
        assert!(!tracker.record_failure("c").await);
    }

    #[tokio::test(start_paused = true)]
    async fn store_failure_never_reports_threshold() {
        let tracker = tracker(Arc::new(FailingStore), 1);
        assert!(!tracker.record_failure("c").await);
        tracker.reset("c").await;
        assert_eq!(tracker.metrics.snapshot().store_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_times_out() {
        let tracker = tracker(Arc::new(StallingStore), 1);
        assert!(!tracker.record_failure("c").await);
    }
}
