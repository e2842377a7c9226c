//! Coinshop Admission: request admission control for the coinshop service.
//!
//! Every inbound request passes an [`AdmissionGate`], which composes three
//! stateless coordinators over one shared [`ExpiringStore`]:
//!
//! - [`BanRegistry`]: temporary bans, checked first;
//! - [`WindowCounter`]: fixed-window quotas per (endpoint prefix, client);
//! - [`ErrorTracker`]: server failures per client, escalating to a ban.
//!
//! All synchronization is left to the store's per-key atomicity. Store
//! failures and timeouts fail open: the request proceeds as if unthrottled
//! and the condition is logged.
//!
//! No transport dependencies; the HTTP middleware lives in the
//! server crate.

pub mod ban;
pub mod config;
pub mod error;
pub mod gate;
pub mod memory;
pub mod metrics;
pub mod quota;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tracker;
pub mod window;

pub use ban::BanRegistry;
pub use config::AdmissionConfig;
pub use error::{ConfigError, Rejection, StoreError};
pub use gate::{AdmissionGate, Outcome};
pub use memory::MemoryStore;
pub use metrics::{AdmissionMetrics, MetricsSnapshot};
pub use quota::{EndpointQuota, QuotaTable};
pub use store::ExpiringStore;
pub use tracker::ErrorTracker;
pub use window::{WindowCounter, WindowVerdict};
