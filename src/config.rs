//! Server configuration via CLI args and environment variables.

use std::time::Duration;

use clap::Parser;

use coinshop_admission::config::default_quotas;
use coinshop_admission::{AdmissionConfig, ConfigError, EndpointQuota, QuotaTable};

/// HTTP front for the coinshop service with throttling and error bans.
#[derive(Parser, Debug, Clone)]
#[command(name = "coinshop-server", version, about)]
pub struct Config {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "COINSHOP_HOST")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 8080, env = "COINSHOP_PORT")]
    pub port: u16,

    /// Endpoint quotas as `<prefix>=<max>` (repeatable or comma-separated).
    #[arg(
        long = "quota",
        env = "COINSHOP_QUOTAS",
        value_delimiter = ',',
        default_values_t = default_quotas()
    )]
    pub quotas: Vec<EndpointQuota>,

    /// Rate window length in seconds.
    #[arg(long, default_value_t = 1, env = "COINSHOP_RATE_WINDOW")]
    pub rate_window: u64,

    /// Error window length in seconds.
    #[arg(long, default_value_t = 60, env = "COINSHOP_ERROR_WINDOW")]
    pub error_window: u64,

    /// Server failures within the error window that trigger a ban.
    #[arg(long, default_value_t = 10, env = "COINSHOP_MAX_ERRORS")]
    pub max_errors: u64,

    /// Ban length in seconds.
    #[arg(long, default_value_t = 10, env = "COINSHOP_BAN_DURATION")]
    pub ban_duration: u64,

    /// Deadline for each store call in milliseconds. Elapsing admits the request.
    #[arg(long, default_value_t = 100, env = "COINSHOP_STORE_TIMEOUT_MS")]
    pub store_timeout_ms: u64,

    /// Identify clients by the first `X-Forwarded-For` entry. Only enable
    /// behind a reverse proxy that overwrites the header.
    #[arg(long, env = "COINSHOP_TRUST_FORWARDED_FOR")]
    pub trust_forwarded_for: bool,

    /// CORS allowed origins (comma-separated). Empty for no CORS.
    #[arg(long, env = "COINSHOP_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "COINSHOP_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[arg(long, default_value = "text", env = "COINSHOP_LOG_FORMAT")]
    pub log_format: String,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Builds the admission settings. Validation happens when the gate is built.
    pub fn admission(&self) -> Result<AdmissionConfig, ConfigError> {
        let quotas = QuotaTable::new(self.quotas.iter().cloned())?;
        Ok(AdmissionConfig::new(quotas)
            .window(Duration::from_secs(self.rate_window))
            .error_window(Duration::from_secs(self.error_window))
            .max_errors(self.max_errors)
            .ban_duration(Duration::from_secs(self.ban_duration))
            .store_timeout(Duration::from_millis(self.store_timeout_ms)))
    }
}
