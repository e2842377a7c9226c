//! Admission configuration: quota table, windows, threshold and ban length.

use std::time::Duration;

use crate::error::ConfigError;
use crate::quota::{EndpointQuota, QuotaTable};

/// Quotas the service shipped with, per 1 s window.
pub const DEFAULT_QUOTAS: [(&str, u64); 4] = [
    ("/api/auth", 50),
    ("/api/info", 2000),
    ("/api/buy", 100),
    ("/api/sendCoin", 100),
];

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);
pub const DEFAULT_ERROR_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ERRORS: u64 = 10;
pub const DEFAULT_BAN_DURATION: Duration = Duration::from_secs(10);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(100);

/// Returns [`DEFAULT_QUOTAS`] as parsed entries.
pub fn default_quotas() -> Vec<EndpointQuota> {
    DEFAULT_QUOTAS
        .iter()
        .filter_map(|(prefix, max)| EndpointQuota::new(*prefix, *max).ok())
        .collect()
}

/// Static admission settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub(crate) quotas: QuotaTable,
    pub(crate) window: Duration,
    pub(crate) error_window: Duration,
    pub(crate) max_errors: u64,
    pub(crate) ban_duration: Duration,
    pub(crate) store_timeout: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        let quotas = QuotaTable::new(default_quotas()).unwrap_or_default();
        Self::new(quotas)
    }
}

impl AdmissionConfig {
    /// Creates a configuration with the given quotas and default timings.
    pub fn new(quotas: QuotaTable) -> Self {
        Self {
            quotas,
            window: DEFAULT_WINDOW,
            error_window: DEFAULT_ERROR_WINDOW,
            max_errors: DEFAULT_MAX_ERRORS,
            ban_duration: DEFAULT_BAN_DURATION,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Builder-style: set the rate window length
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Builder-style: set the error window length
    pub fn error_window(mut self, error_window: Duration) -> Self {
        self.error_window = error_window;
        self
    }

    /// Builder-style: set the failure count that triggers a ban
    pub fn max_errors(mut self, max_errors: u64) -> Self {
        self.max_errors = max_errors;
        self
    }

    /// Builder-style: set how long a ban lasts
    pub fn ban_duration(mut self, ban_duration: Duration) -> Self {
        self.ban_duration = ban_duration;
        self
    }

    /// Builder-style: set the deadline for each store call
    pub fn store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.is_zero() {
            return Err(ConfigError::InvalidWindow);
        }
        if self.error_window.is_zero() {
            return Err(ConfigError::InvalidErrorWindow);
        }
        if self.max_errors == 0 {
            return Err(ConfigError::InvalidThreshold);
        }
        if self.ban_duration.is_zero() {
            return Err(ConfigError::InvalidBanDuration);
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::InvalidStoreTimeout);
        }
        Ok(())
    }

    pub fn quotas(&self) -> &QuotaTable {
        &self.quotas
    }

    pub fn window_length(&self) -> Duration {
        self.window
    }

    pub fn error_window_length(&self) -> Duration {
        self.error_window
    }

    pub fn failure_threshold(&self) -> u64 {
        self.max_errors
    }

    pub fn ban_length(&self) -> Duration {
        self.ban_duration
    }

    pub fn store_deadline(&self) -> Duration {
        self.store_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_deployment() {
        let config = AdmissionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quotas().len(), 4);
        assert_eq!(
            config.quotas().resolve("/api/info").unwrap().max_requests(),
            2000
        );
        assert_eq!(config.window_length(), Duration::from_secs(1));
        assert_eq!(config.error_window_length(), Duration::from_secs(60));
        assert_eq!(config.failure_threshold(), 10);
        assert_eq!(config.ban_length(), Duration::from_secs(10));
    }

    #[test]
    fn builder_overrides_timings() {
        let config = AdmissionConfig::new(QuotaTable::default())
            .window(Duration::from_secs(2))
            .error_window(Duration::from_secs(30))
            .max_errors(3)
            .ban_duration(Duration::from_secs(5))
            .store_timeout(Duration::from_millis(20));

        assert!(config.validate().is_ok());
        assert!(config.quotas().is_empty());
        assert_eq!(config.window_length(), Duration::from_secs(2));
        assert_eq!(config.error_window_length(), Duration::from_secs(30));
        assert_eq!(config.failure_threshold(), 3);
        assert_eq!(config.ban_length(), Duration::from_secs(5));
        assert_eq!(config.store_deadline(), Duration::from_millis(20));
    }

    #[test]
    fn validate_rejects_zero_values() {
        let base = AdmissionConfig::default;
        assert_eq!(
            base().window(Duration::ZERO).validate(),
            Err(ConfigError::InvalidWindow)
        );
        assert_eq!(
            base().error_window(Duration::ZERO).validate(),
            Err(ConfigError::InvalidErrorWindow)
        );
        assert_eq!(
            base().max_errors(0).validate(),
            Err(ConfigError::InvalidThreshold)
        );
        assert_eq!(
            base().ban_duration(Duration::ZERO).validate(),
            Err(ConfigError::InvalidBanDuration)
        );
        assert_eq!(
            base().store_timeout(Duration::ZERO).validate(),
            Err(ConfigError::InvalidStoreTimeout)
        );
    }
}
