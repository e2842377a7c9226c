//! Shared application state: the admission gate and server metadata.

use std::sync::Arc;
use std::time::Instant;

use coinshop_admission::{
    AdmissionConfig, AdmissionGate, AdmissionMetrics, ConfigError, ExpiringStore, MemoryStore,
};

use crate::config::Config;

/// Shared application state, cloneable across handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    gate: AdmissionGate,
    trust_forwarded_for: bool,
    cors_origins: Vec<String>,
    start_time: Instant,
}

impl AppState {
    /// Creates the application state from config over the given store.
    pub fn new(config: &Config, store: Arc<dyn ExpiringStore>) -> Result<Self, ConfigError> {
        let gate = AdmissionGate::new(config.admission()?, store)?;
        Ok(Self::from_gate(
            gate,
            config.trust_forwarded_for,
            config.cors_origins.clone(),
        ))
    }

    /// Creates a state over a fresh in-memory store (for tests and ephemeral use).
    pub fn new_in_memory(admission: AdmissionConfig) -> Result<Self, ConfigError> {
        Self::with_store(admission, Arc::new(MemoryStore::new()), false)
    }

    /// Creates a state over an arbitrary store without CORS (for tests).
    pub fn with_store(
        admission: AdmissionConfig,
        store: Arc<dyn ExpiringStore>,
        trust_forwarded_for: bool,
    ) -> Result<Self, ConfigError> {
        let gate = AdmissionGate::new(admission, store)?;
        Ok(Self::from_gate(gate, trust_forwarded_for, vec![]))
    }

    fn from_gate(gate: AdmissionGate, trust_forwarded_for: bool, cors_origins: Vec<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                gate,
                trust_forwarded_for,
                cors_origins,
                start_time: Instant::now(),
            }),
        }
    }

    /// Returns the admission gate.
    pub fn gate(&self) -> &AdmissionGate {
        &self.inner.gate
    }

    /// Returns the admission counters.
    pub fn metrics(&self) -> &AdmissionMetrics {
        self.inner.gate.metrics()
    }

    /// Whether client identity comes from `X-Forwarded-For`.
    pub fn trust_forwarded_for(&self) -> bool {
        self.inner.trust_forwarded_for
    }

    /// Returns the configured CORS allowed origins.
    pub fn cors_origins(&self) -> &[String] {
        &self.inner.cors_origins
    }

    /// Returns the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
