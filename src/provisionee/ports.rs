//! Port traits: the boundary between the provisionee core and the platform.
//!
//! ```text
//!   platform adapter ──▶ port trait ──▶ DssClient / ProvisioneeTask
//! ```
//!
//! A firmware image usually implements every trait on one "user context"
//! struct and hands it to [`ProvisioneeTask::run`](super::task::ProvisioneeTask::run).
//! Tests do the same with a recording mock.
//!
//! ## Security notes
//!
//! - **ConfigStore** holds the device PIN and key material; adapters SHOULD
//!   keep those in an encrypted partition.
//! - **Crypto::verify_cloud_signature** is the only thing standing between
//!   the device and a spoofed DSS.  It must never return `Ok(true)` for an
//!   unchecked payload.

use crate::error::{Error, Result};
use crate::wifi::WifiConfiguration;

use super::{ProvisioneeState, RegistrationState};

// ───────────────────────────────────────────────────────────────
// Configuration store
// ───────────────────────────────────────────────────────────────

/// Configuration entry keys.
pub mod keys {
    pub const DSS_HOST: &str = "DSS.Host";
    pub const DSS_PORT: &str = "DSS.Port";
    pub const CLOUD_PUBLIC_KEY: &str = "DSS.PublicKey";
    pub const MANUFACTURER_NAME: &str = "DeviceInformation.ManufacturerName";
    pub const MODEL_NUMBER: &str = "DeviceInformation.ModelNumber";
    pub const SERIAL_NUMBER: &str = "DeviceInformation.SerialNumber";
    pub const HARDWARE_VERSION: &str = "DeviceInformation.HardwareVersion";
    pub const FIRMWARE_VERSION: &str = "DeviceInformation.FirmwareVersion";
    pub const PIN: &str = "DeviceInformation.Pin";
    pub const BLE_DEVICE_NAME: &str = "DeviceInformation.BleDeviceName";
    pub const PRODUCT_INDEX: &str = "DeviceInformation.ProductIndex";
    pub const SOFTWARE_VERSION_INDEX: &str = "DeviceInformation.SoftwareVersionIndex";
    pub const DEVICE_PUBLIC_KEY: &str = "DeviceInformation.PublicKey";
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Bytes(Vec<u8>),
}

impl ConfigValue {
    /// String or byte content.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(s) => Some(s.as_bytes()),
            Self::Bytes(b) => Some(b),
            Self::Integer(_) | Self::Boolean(_) => None,
        }
    }
}

/// Persistent key/value configuration.
pub trait ConfigStore {
    /// `Err(NotImplemented)` when the key has no value.
    fn get_value(&self, key: &str) -> Result<ConfigValue>;

    /// `Err(NotImplemented)` when the store does not accept the key.
    fn set_value(&mut self, key: &str, value: ConfigValue) -> Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Crypto
// ───────────────────────────────────────────────────────────────

/// Security collaborator.  Hashing has pure-Rust defaults; everything that
/// touches device key material belongs to the platform.
pub trait Crypto {
    fn random_bytes(&mut self, out: &mut [u8]) -> Result<()>;

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        hmac_sha256::Hash::hash(data)
    }

    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> [u8; 32] {
        hmac_sha256::HMAC::mac(data, key)
    }

    /// ECDH between the device private key and `peer_public_key_der`.
    fn ecdh_shared_secret(&mut self, peer_public_key_der: &[u8]) -> Result<Vec<u8>>;

    /// Check a DSS response body against its decoded signature header.
    fn verify_cloud_signature(&self, payload: &[u8], signature: &[u8]) -> Result<bool>;

    /// Sign an outgoing request body.  `NotImplemented` sends it unsigned.
    fn sign_payload(&self, _payload: &[u8]) -> Result<Vec<u8>> {
        Err(Error::NotImplemented)
    }
}

// ───────────────────────────────────────────────────────────────
// State and registration persistence
// ───────────────────────────────────────────────────────────────

pub trait StateStore {
    fn get_state(&self) -> Result<ProvisioneeState>;
    fn set_state(&mut self, state: ProvisioneeState) -> Result<()>;
}

/// Registration token handed out by `computeConfigurationData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationToken {
    pub token: String,
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistrationDetails {
    pub state: RegistrationState,
    pub token: Option<String>,
    pub http_code: Option<u16>,
}

pub trait RegistrationStore {
    fn set_registration_token(&mut self, token: RegistrationToken) -> Result<()>;
    fn get_registration_details(&self) -> Result<RegistrationDetails>;
}

// ───────────────────────────────────────────────────────────────
// Client hooks
// ───────────────────────────────────────────────────────────────

/// Progress of the scan-data loop, handed to
/// [`ProvisioneeClient::can_post_wifi_scan_data`] before each post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPostProgress {
    /// Sequence number the next post would carry (starts at 1).
    pub sequence: u32,
    pub total_credentials_found: u32,
    pub all_credentials_found: bool,
    /// Scan results not yet accepted by a request.
    pub unposted_results: bool,
}

/// Decisions the embedding application may take over.  Every hook has a
/// default, so an empty `impl` gives the stock behaviour.
pub trait ProvisioneeClient {
    /// Checked once per state iteration (cancellation).
    fn can_proceed(&mut self) -> Result<bool> {
        Ok(true)
    }

    /// Stop once the cloud found any credential; otherwise keep going while
    /// scan results remain.
    fn can_post_wifi_scan_data(&mut self, progress: &ScanPostProgress) -> Result<bool> {
        Ok(progress.total_credentials_found == 0 && progress.unposted_results)
    }

    fn can_get_wifi_credentials(&mut self, _sequence: u32, all_returned: bool) -> Result<bool> {
        Ok(!all_returned)
    }

    /// Fallback setup network.  `NotImplemented` selects the default
    /// hidden open network.
    fn setup_network(&mut self) -> Result<WifiConfiguration> {
        Err(Error::NotImplemented)
    }
}

/// Everything the task needs from the platform besides Wi-Fi and HTTP.
pub trait Platform: ConfigStore + Crypto + StateStore + RegistrationStore + ProvisioneeClient {}

impl<T> Platform for T where T: ConfigStore + Crypto + StateStore + RegistrationStore + ProvisioneeClient {}
