//! Endpoint quota table: path prefix to max requests per window.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Max requests per window for every path starting with `prefix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointQuota {
    prefix: String,
    max_requests: u64,
}

impl EndpointQuota {
    pub fn new(prefix: impl Into<String>, max_requests: u64) -> Result<Self, ConfigError> {
        let prefix = prefix.into();
        if !prefix.starts_with('/') {
            return Err(ConfigError::InvalidPrefix(prefix));
        }
        if max_requests == 0 {
            return Err(ConfigError::InvalidLimit(prefix));
        }
        Ok(Self {
            prefix,
            max_requests,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }
}

impl FromStr for EndpointQuota {
    type Err = ConfigError;

    /// Parses `<prefix>=<max>`, e.g. `/api/buy=100`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, max) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedQuota(s.to_string()))?;
        let prefix = prefix.trim();
        let max = max
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidLimit(prefix.to_string()))?;
        Self::new(prefix, max)
    }
}

impl fmt::Display for EndpointQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.prefix, self.max_requests)
    }
}

/// Static prefix table, fixed for the process lifetime.
///
/// Matching is a plain string prefix test (`/api/buy` also covers
/// `/api/buyer`). When several prefixes match, the longest wins, so the
/// order entries were configured in never changes the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaTable {
    entries: Vec<EndpointQuota>,
}

impl QuotaTable {
    pub fn new(entries: impl IntoIterator<Item = EndpointQuota>) -> Result<Self, ConfigError> {
        let mut table = Vec::new();
        for entry in entries {
            if table.iter().any(|e: &EndpointQuota| e.prefix == entry.prefix) {
                return Err(ConfigError::DuplicatePrefix(entry.prefix));
            }
            table.push(entry);
        }
        Ok(Self { entries: table })
    }

    /// Returns the quota governing `path`, or `None` if it is unthrottled.
    pub fn resolve(&self, path: &str) -> Option<&EndpointQuota> {
        self.entries
            .iter()
            .filter(|e| path.starts_with(e.prefix.as_str()))
            .max_by_key(|e| e.prefix.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointQuota> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
