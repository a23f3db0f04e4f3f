//! Provisionee configuration parameters
//!
//! Tunables for the DSS client and the provisionee task.  Device identity
//! (serial number, keys, PIN) lives in the configuration store, not here.

use serde::{Deserialize, Serialize};

/// Whether purely local faults are reported to the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportPolicy {
    /// Every failure of a state's operation is reported as FAILURE.
    Always,
    /// Local faults (request buffer overrun, resource timeouts) abort the
    /// task without a report; protocol failures are still reported.
    ProtocolOnly,
}

/// Core provisionee configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioneeConfig {
    // --- DSS endpoint ---
    /// Host used when the store has no `DSS.Host` override
    pub dss_default_host: String,
    /// Port used when the store has no `DSS.Port` override
    pub dss_default_port: u16,
    /// Port used while connected to the encoded setup network
    pub transparent_socks_port: u16,
    /// Redirects followed per DSS call
    pub max_redirects: u8,

    // --- Buffers ---
    /// Capacity of the shared request/response body buffer (bytes)
    pub body_buffer_size: usize,
    /// Characters in a client nonce
    pub nonce_length: usize,

    // --- Policy ---
    pub report_local_failures: ReportPolicy,

    // --- Timing ---
    /// Bound on a blocking scan (milliseconds, 0 = wait forever)
    pub scan_wait_ms: u32,
    /// Bound on a blocking connect (milliseconds, 0 = wait forever)
    pub connect_wait_ms: u32,
}

impl Default for ProvisioneeConfig {
    fn default() -> Self {
        Self {
            // DSS endpoint
            dss_default_host: String::from("dp-sps-na.amazon.com"),
            dss_default_port: 443,
            transparent_socks_port: 8888,
            max_redirects: 3,

            // Buffers
            body_buffer_size: 2048,
            nonce_length: 32,

            // Policy
            report_local_failures: ReportPolicy::Always,

            // Timing
            scan_wait_ms: 0,
            connect_wait_ms: 0,
        }
    }
}

/// Reasons [`ProvisioneeConfig::validate`] rejects a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    EmptyBodyBuffer,
    NonceLength,
    EmptyHost,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyBodyBuffer => write!(f, "body buffer size must be non-zero"),
            Self::NonceLength => write!(f, "nonce length must be within 4..=64"),
            Self::EmptyHost => write!(f, "default DSS host is empty"),
        }
    }
}

impl ProvisioneeConfig {
    pub const MIN_NONCE_LENGTH: usize = 4;
    pub const MAX_NONCE_LENGTH: usize = 64;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.body_buffer_size == 0 {
            return Err(ConfigError::EmptyBodyBuffer);
        }
        if !(Self::MIN_NONCE_LENGTH..=Self::MAX_NONCE_LENGTH).contains(&self.nonce_length) {
            return Err(ConfigError::NonceLength);
        }
        if self.dss_default_host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        Ok(())
    }

    /// Parse from JSON; absent fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
