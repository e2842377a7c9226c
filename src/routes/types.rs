//! Response types for the Coinshop Server system endpoints.

use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    /// Server status ("ok").
    pub status: String,
    /// Server version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
}
