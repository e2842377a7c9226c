//! Fixed-window request counter per (endpoint prefix, client).

use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::metrics::AdmissionMetrics;
use crate::quota::QuotaTable;
use crate::store::{ExpiringStore, bounded};

/// Result of charging one request against its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowVerdict {
    /// No quota covers the path.
    Unthrottled,
    /// The request fits; `remaining` more fit in this window.
    Admitted { limit: u64, remaining: u64 },
    /// The window is used up.
    Exhausted { limit: u64 },
}

impl WindowVerdict {
    /// Requests left in the window, `None` when the path is unthrottled.
    /// An exhausted window reports `Some(0)`.
    pub fn remaining(&self) -> Option<u64> {
        match self {
            Self::Unthrottled => None,
            Self::Admitted { remaining, .. } => Some(*remaining),
            Self::Exhausted { .. } => Some(0),
        }
    }

    pub fn limit(&self) -> Option<u64> {
        match self {
            Self::Unthrottled => None,
            Self::Admitted { limit, .. } | Self::Exhausted { limit } => Some(*limit),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

pub(crate) fn window_key(prefix: &str, client: &str) -> String {
    format!("ratelimit:{prefix}:{client}")
}

/// Stateless coordinator over the `ratelimit:` key namespace.
#[derive(Clone)]
pub struct WindowCounter {
    store: Arc<dyn ExpiringStore>,
    quotas: Arc<QuotaTable>,
    window: Duration,
    timeout: Duration,
    metrics: Arc<AdmissionMetrics>,
}

impl WindowCounter {
    pub fn new(
        store: Arc<dyn ExpiringStore>,
        quotas: QuotaTable,
        window: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            quotas: Arc::new(quotas),
            window,
            timeout,
            metrics: Arc::new(AdmissionMetrics::new()),
        }
    }

    pub(crate) fn with_metrics(mut self, metrics: Arc<AdmissionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Charges one request from `client` to the window governing `path`.
    ///
    /// A store failure or timeout admits the request and reports the full
    /// quota as remaining.
    pub async fn check_and_consume(&self, path: &str, client: &str) -> WindowVerdict {
        let Some(quota) = self.quotas.resolve(path) else {
            return WindowVerdict::Unthrottled;
        };
        let limit = quota.max_requests();
        let key = window_key(quota.prefix(), client);

        match self.consume(&key, limit).await {
            Ok(verdict) => verdict,
            Err(e) => {
                self.metrics.record_store_failure();
                tracing::warn!(
                    client,
                    prefix = quota.prefix(),
                    error = %e,
                    "rate window unavailable, admitting request"
                );
                WindowVerdict::Admitted {
                    limit,
                    remaining: limit,
                }
            }
        }
    }

    async fn consume(&self, key: &str, limit: u64) -> Result<WindowVerdict, StoreError> {
        if let Some(count) = bounded(self.timeout, self.store.get(key)).await?
            && count_of(count) >= limit
        {
            return Ok(WindowVerdict::Exhausted { limit });
        }

        // Another request may slip in between the read and this increment;
        // the atomic bump makes any overshoot visible here.
        let count = count_of(
            bounded(
                self.timeout,
                self.store.increment_or_init(key, self.window),
            )
            .await?,
        );
        if count > limit {
            return Ok(WindowVerdict::Exhausted { limit });
        }
        Ok(WindowVerdict::Admitted {
            limit,
            remaining: limit - count,
        })
    }
}

fn count_of(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}
