//! Wi-Fi domain types, the platform driver port and the [`WifiManager`].
//!
//! ```text
//!   provisionee task ──▶ WifiManager ──▶ WifiDriver (platform)
//!                            ▲                 │
//!                            └── WifiEvents ◀──┘  (driver context)
//! ```

pub mod driver;
pub mod manager;

pub use driver::{LinkEvent, ScanRequest, WifiDriver, WifiEvents};
pub use manager::WifiManager;

use crate::error::{Error, Result};

// ───────────────────────────────────────────────────────────────
// Limits
// ───────────────────────────────────────────────────────────────

pub const MAX_SSID_LENGTH: usize = 32;
pub const BSSID_LENGTH: usize = 6;
pub const MAX_WIFI_KEY_LENGTH: usize = 64;
pub const MAX_SCAN_RESULTS: usize = 30;
pub const MAX_CONNECTION_ATTEMPTS: usize = 5;

pub type Ssid = heapless::Vec<u8, MAX_SSID_LENGTH>;
pub type WifiKey = heapless::Vec<u8, MAX_WIFI_KEY_LENGTH>;
pub type Bssid = [u8; BSSID_LENGTH];

/// Copy `bytes` into a bounded SSID; longer input is `Overrun`.
pub fn ssid_from(bytes: &[u8]) -> Result<Ssid> {
    Ssid::from_slice(bytes).map_err(|()| Error::Overrun)
}

pub fn key_from(bytes: &[u8]) -> Result<WifiKey> {
    WifiKey::from_slice(bytes).map_err(|()| Error::Overrun)
}

// ───────────────────────────────────────────────────────────────
// Enums
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityProtocol {
    #[default]
    Open,
    WpaPsk,
    Wep,
    Other,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Disconnected,
    Unauthenticated,
    Authenticated,
    Associated,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Records
// ───────────────────────────────────────────────────────────────

/// A station profile: what to connect to and how.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiConfiguration {
    pub ssid: Ssid,
    pub security: SecurityProtocol,
    pub key: WifiKey,
    pub wep_index: Option<u8>,
    pub network_priority: Option<i64>,
    pub frequency: Option<i64>,
    pub hidden: bool,
}

impl WifiConfiguration {
    pub fn open(ssid: &[u8]) -> Result<Self> {
        Ok(Self { ssid: ssid_from(ssid)?, ..Self::default() })
    }

    pub fn wpa_psk(ssid: &[u8], key: &[u8]) -> Result<Self> {
        Ok(Self {
            ssid: ssid_from(ssid)?,
            security: SecurityProtocol::WpaPsk,
            key: key_from(key)?,
            ..Self::default()
        })
    }
}

/// One entry of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    pub ssid: Ssid,
    pub bssid: Bssid,
    pub security: SecurityProtocol,
    pub channel: u8,
    pub frequency: Option<i64>,
    pub signal_strength: Option<i16>,
}

impl ScanResult {
    pub fn is_hidden(&self) -> bool {
        self.ssid.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDetails {
    pub operation: &'static str,
    pub cause: &'static str,
    pub details: &'static str,
    pub code: &'static str,
}

impl ErrorDetails {
    /// Attached to every failed connection attempt.
    pub const CONNECT_FAILED: Self = Self {
        operation: "CONNECTING_TO_NETWORK",
        cause: "Internal error",
        details: "Internal error",
        code: "3:3:0:1",
    };
}

/// The live connection, or a recorded attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionDetails {
    pub ssid: Ssid,
    pub security: SecurityProtocol,
    pub state: ConnectionState,
    pub error: Option<ErrorDetails>,
}
