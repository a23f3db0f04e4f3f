//! Frustration-Free Setup Wi-Fi provisionee.
//!
//! Brings a device from NOT_PROVISIONED onto the user's network: joins a
//! setup network, runs the signed DSS exchanges and hands over to the
//! credentials the cloud returns.  Platform concerns (radio, HTTPS, key
//! storage, persistence) stay behind the port traits in
//! [`provisionee::ports`], [`wifi::WifiDriver`] and [`dss::HttpTransport`].
//!
//! ```text
//!   ProvisioneeTask ──▶ DssClient ──▶ HttpTransport
//!         │                 └──────▶ Crypto / ConfigStore
//!         └──────────▶ WifiManager ──▶ WifiDriver
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod config;
pub mod dss;
pub mod encoding;
pub mod error;
pub mod json;
pub mod provisionee;
pub mod stream;
pub mod wifi;

// Host builds link the std critical-section implementation that backs the
// completion signals.
#[cfg(not(target_os = "espidf"))]
use critical_section as _;

pub use config::{ProvisioneeConfig, ReportPolicy};
pub use error::{Error, Result};
pub use provisionee::{ProvisioneeState, ProvisioneeTask};
