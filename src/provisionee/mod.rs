//! Wi-Fi provisionee: states, platform ports, setup networks and the task.
//!
//! ```text
//!  NOT_PROVISIONED ─▶ CONNECTING_TO_SETUP_NETWORK ─▶ START_PROVISIONING
//!        ─▶ START_PIN_BASED_SETUP ─▶ COMPUTE_CONFIGURATION
//!        ─▶ POST_WIFI_SCAN_DATA ─▶ GET_WIFI_LIST
//!        ─▶ CONNECTING_TO_USER_NETWORK ─▶ CONNECTED_TO_USER_NETWORK ─▶ DONE
//! ```
//!
//! From START_PROVISIONING on, the next state is whatever the cloud names
//! in its report response.

pub mod encoded_network;
pub mod ports;
pub mod setup_network;
pub mod task;
pub mod user_networks;

pub use ports::{
    ConfigStore, ConfigValue, Crypto, Platform, ProvisioneeClient, RegistrationDetails,
    RegistrationStore, RegistrationToken, ScanPostProgress, StateStore,
};
pub use task::ProvisioneeTask;
pub use user_networks::UserNetworks;

/// Provisionee state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProvisioneeState {
    #[default]
    NotProvisioned,
    ConnectingToSetupNetwork,
    StartProvisioning,
    StartPinBasedSetup,
    ComputeConfiguration,
    PostWifiScanData,
    GetWifiList,
    ConnectingToUserNetwork,
    ConnectedToUserNetwork,
    Done,
    Failed,
}

impl ProvisioneeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotProvisioned => "NOT_PROVISIONED",
            Self::ConnectingToSetupNetwork => "CONNECTING_TO_SETUP_NETWORK",
            Self::StartProvisioning => "START_PROVISIONING",
            Self::StartPinBasedSetup => "START_PIN_BASED_SETUP",
            Self::ComputeConfiguration => "COMPUTE_CONFIGURATION",
            Self::PostWifiScanData => "POST_WIFI_SCAN_DATA",
            Self::GetWifiList => "GET_WIFI_LIST",
            Self::ConnectingToUserNetwork => "CONNECTING_TO_USER_NETWORK",
            Self::ConnectedToUserNetwork => "CONNECTED_TO_USER_NETWORK",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }
}

impl core::fmt::Display for ProvisioneeState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device registration progress as tracked by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationState {
    #[default]
    NotRegistered,
    InProgress,
    Complete,
    Failed,
}
