//! Admission counters with Prometheus text rendering.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide admission counters. Monotonic, reset only on restart.
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
    admitted: AtomicU64,
    rate_limited: AtomicU64,
    banned_rejections: AtomicU64,
    bans_issued: AtomicU64,
    server_failures: AtomicU64,
    store_failures: AtomicU64,
}

/// Point-in-time copy of [`AdmissionMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub admitted: u64,
    pub rate_limited: u64,
    pub banned_rejections: u64,
    pub bans_issued: u64,
    pub server_failures: u64,
    pub store_failures: u64,
}

impl AdmissionMetrics {
    pub const fn new() -> Self {
        Self {
            admitted: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            banned_rejections: AtomicU64::new(0),
            bans_issued: AtomicU64::new(0),
            server_failures: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_banned_rejection(&self) {
        self.banned_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_ban_issued(&self) {
        self.bans_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_server_failure(&self) {
        self.server_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            banned_rejections: self.banned_rejections.load(Ordering::Relaxed),
            bans_issued: self.bans_issued.load(Ordering::Relaxed),
            server_failures: self.server_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }

    /// Render all counters in Prometheus text exposition format.
    pub fn render(&self, uptime_seconds: u64) -> String {
        let snap = self.snapshot();
        let mut out = String::with_capacity(1024);

        metric(
            &mut out,
            "gauge",
            "coinshop_uptime_seconds",
            "Server uptime in seconds",
            uptime_seconds,
        );
        metric(
            &mut out,
            "counter",
            "coinshop_requests_admitted_total",
            "Requests that passed admission control",
            snap.admitted,
        );

        writeln!(
            out,
            "# HELP coinshop_requests_rejected_total Requests refused by admission control."
        )
        .unwrap();
        writeln!(out, "# TYPE coinshop_requests_rejected_total counter").unwrap();
        writeln!(
            out,
            "coinshop_requests_rejected_total{{reason=\"rate_limited\"}} {}",
            snap.rate_limited
        )
        .unwrap();
        writeln!(
            out,
            "coinshop_requests_rejected_total{{reason=\"banned\"}} {}",
            snap.banned_rejections
        )
        .unwrap();

        metric(
            &mut out,
            "counter",
            "coinshop_bans_issued_total",
            "Temporary bans issued after repeated server failures",
            snap.bans_issued,
        );
        metric(
            &mut out,
            "counter",
            "coinshop_server_failures_total",
            "Dispatched requests that ended in a server error",
            snap.server_failures,
        );
        metric(
            &mut out,
            "counter",
            "coinshop_store_failures_total",
            "Store calls that failed or timed out and were let through",
            snap.store_failures,
        );

        out
    }
}

fn metric(out: &mut String, kind: &str, name: &str, help: &str, value: impl std::fmt::Display) {
    writeln!(out, "# HELP {name} {help}").unwrap();
    writeln!(out, "# TYPE {name} {kind}").unwrap();
    writeln!(out, "{name} {value}").unwrap();
}
