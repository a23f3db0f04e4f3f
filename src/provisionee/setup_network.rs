//! Setup networks: joining, leaving and choosing the fallback.

use log::{debug, error, info};

use crate::error::{Error, Result};
use crate::wifi::{ConnectionState, SecurityProtocol, WifiConfiguration, WifiDriver, WifiManager};

use super::ports::ProvisioneeClient;

/// SSID of the default fallback network.
pub const DEFAULT_SETUP_SSID: &[u8] = b"simple_setup";

/// The stock fallback: hidden, open, `simple_setup`.
pub fn default_setup_network() -> Result<WifiConfiguration> {
    let mut network = WifiConfiguration::open(DEFAULT_SETUP_SSID)?;
    network.hidden = true;
    Ok(network)
}

/// The client's setup network, or the default when it has none.
pub fn fallback_setup_network(client: &mut impl ProvisioneeClient) -> Result<WifiConfiguration> {
    match client.setup_network() {
        Err(Error::NotImplemented) => {
            debug!("provisionee: using the default setup network");
            default_setup_network()
        }
        Ok(network) => {
            debug!("provisionee: using the client-defined setup network");
            Ok(network)
        }
        Err(e) => Err(e),
    }
}

/// Load `network` and connect.  Anything short of ASSOCIATED is `Failed`.
pub fn connect_to_setup_network<D: WifiDriver>(
    wifi: &mut WifiManager<D>,
    network: &WifiConfiguration,
) -> Result<()> {
    if network.ssid.is_empty() {
        error!("provisionee: setup network has no SSID");
        return Err(Error::Failed("setup network ssid"));
    }
    if network.security != SecurityProtocol::Open && network.key.is_empty() {
        error!("provisionee: setup network has no key");
        return Err(Error::Failed("setup network key"));
    }

    wifi.load_credentials(network.clone())?;
    wifi.connect()?;
    let details = wifi.get_connection_details()?;
    if details.state != ConnectionState::Associated {
        error!("provisionee: setup network connection ended in {:?}", details.state);
        return Err(Error::Failed("setup network connect"));
    }
    info!("provisionee: connected to setup network");
    Ok(())
}

/// Drop the setup profile and the association.  `NotImplemented` when no
/// setup network was ever chosen.
pub fn disconnect_from_setup_network<D: WifiDriver>(
    wifi: &mut WifiManager<D>,
    network: Option<&WifiConfiguration>,
) -> Result<()> {
    if network.is_none_or(|n| n.ssid.is_empty()) {
        error!("provisionee: no setup network to disconnect from");
        return Err(Error::NotImplemented);
    }
    wifi.clear_credentials()?;
    wifi.disconnect()?;
    debug!("provisionee: disconnected from setup network");
    Ok(())
}
