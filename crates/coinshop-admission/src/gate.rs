//! The admission gate: ban check, rate check, dispatch, failure accounting.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::ban::BanRegistry;
use crate::config::AdmissionConfig;
use crate::error::{ConfigError, Rejection};
use crate::metrics::AdmissionMetrics;
use crate::store::ExpiringStore;
use crate::tracker::ErrorTracker;
use crate::window::{WindowCounter, WindowVerdict};

/// How a dispatched request ended, as far as admission cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Bad input, insufficient balance and the like. Never counted.
    ClientFailure,
    /// Counted toward the client's error budget.
    ServerFailure,
}

impl Outcome {
    /// Classifies an HTTP status code: 5xx is a server failure, 4xx a
    /// client failure, anything else success.
    pub fn from_status(status: u16) -> Self {
        match status {
            500..=599 => Self::ServerFailure,
            400..=499 => Self::ClientFailure,
            _ => Self::Success,
        }
    }
}

/// Composes the three coordinators over one shared store.
///
/// Holds no per-client state of its own; clones are cheap and share metrics.
#[derive(Clone)]
pub struct AdmissionGate {
    bans: BanRegistry,
    windows: WindowCounter,
    errors: ErrorTracker,
    window: Duration,
    ban_duration: Duration,
    metrics: Arc<AdmissionMetrics>,
}

impl AdmissionGate {
    pub fn new(config: AdmissionConfig, store: Arc<dyn ExpiringStore>) -> Result<Self, ConfigError> {
        config.validate()?;
        let metrics = Arc::new(AdmissionMetrics::new());
        let timeout = config.store_timeout;

        let bans = BanRegistry::new(Arc::clone(&store), timeout).with_metrics(Arc::clone(&metrics));
        let windows = WindowCounter::new(Arc::clone(&store), config.quotas, config.window, timeout)
            .with_metrics(Arc::clone(&metrics));
        let errors = ErrorTracker::new(store, config.error_window, config.max_errors, timeout)
            .with_metrics(Arc::clone(&metrics));

        Ok(Self {
            bans,
            windows,
            errors,
            window: config.window,
            ban_duration: config.ban_duration,
            metrics,
        })
    }

    /// Steps 1 and 2: refuse banned clients, then charge the rate window.
    ///
    /// A banned client is turned away before its window is touched.
    pub async fn admit(&self, path: &str, client: &str) -> Result<WindowVerdict, Rejection> {
        if self.bans.is_banned(client).await {
            self.metrics.record_banned_rejection();
            tracing::debug!(client, path, "rejected: client banned");
            return Err(Rejection::Banned {
                retry_after: self.ban_duration,
            });
        }

        let verdict = self.windows.check_and_consume(path, client).await;
        if verdict.is_exhausted() {
            self.metrics.record_rate_limited();
            tracing::debug!(client, path, "rejected: rate limit exceeded");
            return Err(Rejection::RateLimited {
                retry_after: self.window,
            });
        }

        self.metrics.record_admitted();
        Ok(verdict)
    }

    /// Step 4: account for the outcome of a dispatched request.
    ///
    /// Returns a ban rejection when this very failure crossed the threshold;
    /// it replaces whatever response the handler produced.
    pub async fn settle(&self, client: &str, outcome: Outcome) -> Result<(), Rejection> {
        if outcome != Outcome::ServerFailure {
            return Ok(());
        }
        self.metrics.record_server_failure();

        if !self.errors.record_failure(client).await {
            return Ok(());
        }

        self.bans.record_ban(client, self.ban_duration).await;
        self.errors.reset(client).await;
        self.metrics.record_ban_issued();
        tracing::warn!(
            client,
            ban_secs = self.ban_duration.as_secs(),
            "client banned after repeated server failures"
        );
        Err(Rejection::Banned {
            retry_after: self.ban_duration,
        })
    }

    /// Runs a whole request through the gate.
    ///
    /// `dispatch` is only polled once the request is admitted; it yields the
    /// handler's response together with its outcome.
    pub async fn run<R, F>(&self, path: &str, client: &str, dispatch: F) -> Result<R, Rejection>
    where
        F: Future<Output = (R, Outcome)>,
    {
        self.admit(path, client).await?;
        let (response, outcome) = dispatch.await;
        self.settle(client, outcome).await?;
        Ok(response)
    }

    pub fn metrics(&self) -> &AdmissionMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::memory::MemoryStore;
    use crate::quota::{EndpointQuota, QuotaTable};
    use crate::testing::FailingStore;

    const CLIENT: &str = "203.0.113.7";

    fn config(max: u64) -> AdmissionConfig {
        let quotas = QuotaTable::new([EndpointQuota::new("/api", max).unwrap()]).unwrap();
        AdmissionConfig::new(quotas)
            .window(Duration::from_secs(1))
            .error_window(Duration::from_secs(60))
            .max_errors(3)
            .ban_duration(Duration::from_secs(10))
            .store_timeout(Duration::from_millis(50))
    }

    fn gate(max: u64) -> AdmissionGate {
        AdmissionGate::new(config(max), Arc::new(MemoryStore::new())).unwrap()
    }

    async fn call(gate: &AdmissionGate, outcome: Outcome) -> Result<&'static str, Rejection> {
        gate.run("/api/sendCoin", CLIENT, async { ("ok", outcome) }).await
    }

    fn is_ban(result: &Result<&str, Rejection>) -> bool {
        matches!(result, Err(Rejection::Banned { .. }))
    }

    #[test]
    fn outcome_classification() {
        assert_eq!(Outcome::from_status(200), Outcome::Success);
        assert_eq!(Outcome::from_status(302), Outcome::Success);
        assert_eq!(Outcome::from_status(400), Outcome::ClientFailure);
        assert_eq!(Outcome::from_status(429), Outcome::ClientFailure);
        assert_eq!(Outcome::from_status(500), Outcome::ServerFailure);
        assert_eq!(Outcome::from_status(503), Outcome::ServerFailure);
    }

    #[test]
    fn invalid_config_is_refused() {
        let result = AdmissionGate::new(config(1).max_errors(0), Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(ConfigError::InvalidThreshold)));
    }

    #[tokio::test(start_paused = true)]
    async fn quota_two_window_one_second() {
        let gate = gate(2);
        assert_eq!(call(&gate, Outcome::Success).await, Ok("ok"));
        assert_eq!(call(&gate, Outcome::Success).await, Ok("ok"));
        assert_eq!(
            call(&gate, Outcome::Success).await,
            Err(Rejection::RateLimited {
                retry_after: Duration::from_secs(1)
            })
        );

        tokio::time::advance(Duration::from_millis(1_100)).await;
        assert_eq!(call(&gate, Outcome::Success).await, Ok("ok"));
    }

    #[tokio::test(start_paused = true)]
    async fn third_server_failure_is_answered_with_a_ban() {
        let gate = gate(100);
        assert_eq!(call(&gate, Outcome::ServerFailure).await, Ok("ok"));
        assert_eq!(call(&gate, Outcome::ServerFailure).await, Ok("ok"));
        assert!(is_ban(&call(&gate, Outcome::ServerFailure).await));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(is_ban(&call(&gate, Outcome::Success).await));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(call(&gate, Outcome::Success).await, Ok("ok"));

        let snap = gate.metrics().snapshot();
        assert_eq!(snap.bans_issued, 1);
        assert_eq!(snap.server_failures, 3);
        assert_eq!(snap.banned_rejections, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_count_restarts_after_a_ban() {
        let gate = gate(100);
        for _ in 0..3 {
            let _ = call(&gate, Outcome::ServerFailure).await;
        }
        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(call(&gate, Outcome::ServerFailure).await, Ok("ok"));
        assert_eq!(call(&gate, Outcome::ServerFailure).await, Ok("ok"));
        assert!(is_ban(&call(&gate, Outcome::ServerFailure).await));
    }

    #[tokio::test(start_paused = true)]
    async fn client_failures_never_ban() {
        let gate = gate(100);
        for _ in 0..4 {
            assert_eq!(call(&gate, Outcome::ClientFailure).await, Ok("ok"));
        }
        assert_eq!(call(&gate, Outcome::Success).await, Ok("ok"));
        assert_eq!(gate.metrics().snapshot().bans_issued, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ban_check_precedes_rate_check() {
        let store = Arc::new(MemoryStore::new());
        let gate = AdmissionGate::new(config(100), store.clone()).unwrap();
        gate.bans.record_ban(CLIENT, Duration::from_secs(10)).await;

        let result = gate.admit("/api/info", CLIENT).await;
        assert!(matches!(result, Err(Rejection::Banned { .. })));
        // The banned request did not consume a rate slot.
        let key = crate::window::window_key("/api", CLIENT);
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_requests_are_never_dispatched() {
        let gate = gate(1);
        let dispatched = AtomicUsize::new(0);
        for _ in 0..3 {
            let _ = gate
                .run("/api/buy/cup", CLIENT, async {
                    dispatched.fetch_add(1, Ordering::SeqCst);
                    ((), Outcome::Success)
                })
                .await;
        }
        assert_eq!(dispatched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unthrottled_paths_still_honour_bans() {
        let gate = gate(1);
        for _ in 0..3 {
            let _ = gate
                .run("/health", CLIENT, async { ((), Outcome::ServerFailure) })
                .await;
        }
        assert!(matches!(
            gate.admit("/health", CLIENT).await,
            Err(Rejection::Banned { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn store_outage_admits_everything() {
        let gate = AdmissionGate::new(config(1), Arc::new(FailingStore)).unwrap();
        for _ in 0..5 {
            assert_eq!(call(&gate, Outcome::ServerFailure).await, Ok("ok"));
        }
        let snap = gate.metrics().snapshot();
        assert_eq!(snap.admitted, 5);
        assert_eq!(snap.bans_issued, 0);
        assert!(snap.store_failures >= 10);
    }
}
