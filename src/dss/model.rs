//! DSS wire names.
//!
//! Each domain enum has exactly one string table here; nothing outside the
//! DSS layer knows the wire spelling.

use crate::error::{Error, Result};
use crate::provisionee::{ProvisioneeState, RegistrationState};
use crate::wifi::{ConnectionState, SecurityProtocol};

/// Outcome reported for a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportResult {
    Success,
    Failure,
}

impl ReportResult {
    pub fn of<T>(outcome: &Result<T>) -> Self {
        if outcome.is_ok() { Self::Success } else { Self::Failure }
    }
}

/// Enum ⇄ wire-string table.  Values without an entry have no wire form.
pub struct WireTable<T: 'static> {
    entries: &'static [(T, &'static str)],
    what: &'static str,
}

impl<T: Copy + PartialEq> WireTable<T> {
    pub fn name(&self, value: T) -> Result<&'static str> {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, name)| *name)
            .ok_or(Error::Failed(self.what))
    }

    pub fn parse(&self, name: &[u8]) -> Result<T> {
        self.entries
            .iter()
            .find(|(_, n)| n.as_bytes() == name)
            .map(|(v, _)| *v)
            .ok_or(Error::Failed(self.what))
    }
}

pub const PROVISIONEE_STATES: WireTable<ProvisioneeState> = WireTable {
    entries: &[
        (ProvisioneeState::NotProvisioned, "NOT_PROVISIONED"),
        (ProvisioneeState::StartProvisioning, "START_PROVISIONING"),
        (ProvisioneeState::StartPinBasedSetup, "START_PIN_BASED_SETUP"),
        (ProvisioneeState::PostWifiScanData, "POST_WIFI_SCAN_DATA"),
        (ProvisioneeState::GetWifiList, "GET_WIFI_LIST"),
        (ProvisioneeState::ComputeConfiguration, "COMPUTE_CONFIGURATION"),
        (ProvisioneeState::ConnectingToUserNetwork, "CONNECTING_TO_USER_NETWORK"),
        (ProvisioneeState::ConnectedToUserNetwork, "CONNECTED_TO_USER_NETWORK"),
        (ProvisioneeState::Done, "DONE"),
    ],
    what: "dss provisionee state",
};

pub const SECURITY_PROTOCOLS: WireTable<SecurityProtocol> = WireTable {
    entries: &[
        (SecurityProtocol::Open, "OPEN"),
        (SecurityProtocol::WpaPsk, "WPA_PSK"),
        (SecurityProtocol::Wep, "WEP"),
        (SecurityProtocol::Other, "OTHER"),
    ],
    what: "dss security protocol",
};

pub const CONNECTION_STATES: WireTable<ConnectionState> = WireTable {
    entries: &[
        (ConnectionState::Idle, "IDLE"),
        (ConnectionState::Disconnected, "DISCONNECTED"),
        (ConnectionState::Unauthenticated, "UNAUTHENTICATED"),
        (ConnectionState::Authenticated, "AUTHENTICATED"),
        (ConnectionState::Associated, "ASSOCIATED"),
        (ConnectionState::Failed, "FAILED"),
    ],
    what: "dss connection state",
};

pub const REGISTRATION_STATES: WireTable<RegistrationState> = WireTable {
    entries: &[
        (RegistrationState::NotRegistered, "NOT_REGISTERED"),
        (RegistrationState::InProgress, "IN_PROGRESS"),
        (RegistrationState::Complete, "COMPLETE"),
        (RegistrationState::Failed, "FAILED"),
    ],
    what: "dss registration state",
};

pub const REPORT_RESULTS: WireTable<ReportResult> = WireTable {
    entries: &[(ReportResult::Success, "SUCCESS"), (ReportResult::Failure, "FAILURE")],
    what: "dss report result",
};
