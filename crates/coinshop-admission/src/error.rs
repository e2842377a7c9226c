//! Error types for the admission layer.
//!
//! `StoreError` never leaves this crate's coordinators: every store failure
//! is absorbed by a fail-open branch. `Rejection` is the only error a caller
//! of the gate ever sees.

use std::time::Duration;

/// Failure talking to the expiring store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store refused or dropped the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the configured bound.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Invalid admission configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("rate window must be positive")]
    InvalidWindow,

    #[error("error window must be positive")]
    InvalidErrorWindow,

    #[error("failure threshold must be positive")]
    InvalidThreshold,

    #[error("ban duration must be positive")]
    InvalidBanDuration,

    #[error("store timeout must be positive")]
    InvalidStoreTimeout,

    #[error("invalid quota '{0}': expected <prefix>=<max>")]
    MalformedQuota(String),

    #[error("quota prefix must start with '/': {0}")]
    InvalidPrefix(String),

    #[error("quota for {0} must be a positive integer")]
    InvalidLimit(String),

    #[error("duplicate quota prefix {0}")]
    DuplicatePrefix(String),
}

/// Why the gate refused a request.
///
/// Both variants map to "too many requests" on the wire; the message tells
/// the client which backoff applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The (endpoint, client) window is exhausted.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after: Duration },

    /// The client is serving a ban for repeated server failures.
    #[error("Too many errors. Please try again later.")]
    Banned { retry_after: Duration },
}

impl Rejection {
    /// Machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Banned { .. } => "banned",
        }
    }

    /// Upper bound on how long the client should wait before retrying.
    pub fn retry_after(&self) -> Duration {
        match self {
            Self::RateLimited { retry_after } | Self::Banned { retry_after } => *retry_after,
        }
    }
}
