//! Credentials returned by the cloud, tried in priority order.

use log::{info, warn};

use crate::error::{Error, Result};
use crate::wifi::{ConnectionState, WifiConfiguration, WifiDriver, WifiManager};

/// Candidate user networks.  Highest `network_priority` first; networks
/// without a priority go last, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct UserNetworks {
    networks: Vec<WifiConfiguration>,
}

impl UserNetworks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keeping priority order.  A network with the same SSID replaces
    /// the earlier entry.
    pub fn add(&mut self, network: WifiConfiguration) {
        self.networks.retain(|n| n.ssid != network.ssid);
        let rank = |n: &WifiConfiguration| n.network_priority.map_or(i128::MIN, i128::from);
        let at = self.networks.partition_point(|n| rank(n) >= rank(&network));
        self.networks.insert(at, network);
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WifiConfiguration> {
        self.networks.iter()
    }

    pub fn clear(&mut self) {
        self.networks.clear();
    }

    /// Try each network until one associates.  The list is dropped on
    /// success.  Every attempt lands in the manager's attempts ring.
    pub fn connect<D: WifiDriver>(&mut self, wifi: &mut WifiManager<D>) -> Result<()> {
        if self.networks.is_empty() {
            warn!("provisionee: no user networks to connect to");
            return Err(Error::Failed("no user networks"));
        }

        for network in &self.networks {
            wifi.load_credentials(network.clone())?;
            let state = match wifi.connect() {
                Ok(_) => wifi.get_connection_details()?.state,
                Err(e) => {
                    warn!("provisionee: user network connect error: {}", e);
                    continue;
                }
            };
            if state == ConnectionState::Associated {
                info!(
                    "provisionee: connected to user network '{}'",
                    String::from_utf8_lossy(&network.ssid)
                );
                self.networks.clear();
                return Ok(());
            }
        }

        warn!("provisionee: failed to connect to any user network");
        wifi.clear_credentials()?;
        Err(Error::Failed("user network connect"))
    }
}
