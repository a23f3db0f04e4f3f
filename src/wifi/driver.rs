//! Platform Wi-Fi driver port.
//!
//! The driver starts scans and connections and reports their progress from
//! its own execution context through a [`WifiEvents`] handle.  Events may
//! arrive before or after the starting call returns.

use log::{debug, warn};
use std::sync::Arc;

use super::manager::Shared;
use super::{ConnectionState, ScanResult, WifiConfiguration};
use crate::error::Result;

/// Scan parameters.  `None` means every channel / no SSID filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest<'a> {
    pub channel: Option<u8>,
    pub active: bool,
    pub ssid_filter: Option<&'a [u8]>,
}

impl Default for ScanRequest<'_> {
    fn default() -> Self {
        Self { channel: None, active: true, ssid_filter: None }
    }
}

/// Link progress reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Connecting,
    Connected,
    Failed,
    Disconnected,
}

pub trait WifiDriver {
    /// Start a scan.  Each network is reported with
    /// [`WifiEvents::scan_entry`], then [`WifiEvents::scan_done`].
    fn scan(&mut self, request: &ScanRequest<'_>, events: &WifiEvents) -> Result<()>;

    /// Start associating with `config`; the outcome arrives as a
    /// [`LinkEvent::Connected`] or [`LinkEvent::Failed`].
    fn connect(&mut self, config: &WifiConfiguration, events: &WifiEvents) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;

    /// MAC-level link status.
    fn is_link_up(&self) -> Result<bool>;
}

// ───────────────────────────────────────────────────────────────
// Event handle
// ───────────────────────────────────────────────────────────────

/// Cloneable sink handed to the driver.  Every method takes the lock for
/// the one resource it touches.
#[derive(Clone)]
pub struct WifiEvents {
    pub(super) shared: Arc<Shared>,
}

impl WifiEvents {
    pub fn scan_entry(&self, result: ScanResult) {
        match self.shared.scan.lock() {
            Ok(mut cache) => {
                if cache.results.push(result).is_err() {
                    debug!("WiFi: scan cache full, dropping entry");
                }
            }
            Err(_) => warn!("WiFi: scan cache lock poisoned"),
        }
    }

    pub fn scan_done(&self) {
        self.shared.scan_signal.signal(true);
    }

    pub fn scan_failed(&self) {
        self.shared.scan_signal.signal(false);
    }

    pub fn link_event(&self, event: LinkEvent) {
        let state = match event {
            LinkEvent::Connecting => ConnectionState::Unauthenticated,
            LinkEvent::Connected => ConnectionState::Associated,
            LinkEvent::Failed => ConnectionState::Failed,
            LinkEvent::Disconnected => ConnectionState::Disconnected,
        };
        match self.shared.station.lock() {
            Ok(mut station) => station.state = state,
            Err(_) => warn!("WiFi: station lock poisoned"),
        }
        match event {
            LinkEvent::Connected => self.shared.link_signal.signal(true),
            LinkEvent::Failed => self.shared.link_signal.signal(false),
            LinkEvent::Connecting | LinkEvent::Disconnected => {}
        }
    }
}
