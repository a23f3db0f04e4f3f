//! Mock ports for integration tests.
//!
//! Every mock records the calls it receives so tests can assert on the full
//! history: requests sent to the cloud, radio operations, client hooks.

use std::collections::VecDeque;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use ffs_provisionee::adapters::MemoryStore;
use ffs_provisionee::dss::{HttpRequest, HttpTransport, ResponseHandler};
use ffs_provisionee::error::{Error, Result};
use ffs_provisionee::provisionee::ports::keys;
use ffs_provisionee::provisionee::{
    ConfigStore, ConfigValue, Crypto, ProvisioneeClient, ProvisioneeState, RegistrationDetails,
    RegistrationStore, RegistrationToken, ScanPostProgress, StateStore,
};
use ffs_provisionee::wifi::{
    LinkEvent, ScanRequest, ScanResult, SecurityProtocol, WifiConfiguration, WifiDriver, WifiEvents,
    ssid_from,
};

/// Signature the mock cloud attaches and the mock crypto accepts.
pub const CLOUD_SIGNATURE: &[u8] = b"signed-by-the-cloud";

// ── Cloud ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: String,
}

impl Reply {
    /// 200 with a valid signature.
    pub fn signed(body: &str) -> Self {
        Self {
            status: 200,
            headers: vec![(
                String::from("x-amzn-dss-signature"),
                STANDARD.encode(CLOUD_SIGNATURE).into_bytes(),
            )],
            body: String::from(body),
        }
    }

    /// 200 without any signature header.
    pub fn unsigned(body: &str) -> Self {
        Self { status: 200, headers: Vec::new(), body: String::from(body) }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self {
            status,
            headers: vec![(String::from("Location"), location.as_bytes().to_vec())],
            body: String::new(),
        }
    }

    /// Report answer moving the device to `next`.
    pub fn next_state(next: &str) -> Self {
        Self::signed(&format!(
            r#"{{"nonce":"n","canProceed":true,"nextProvisioningState":"{next}"}}"#
        ))
    }

    pub fn stop() -> Self {
        Self::signed(r#"{"nonce":"n","canProceed":false,"reason":"rate limited"}"#)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SentRequest {
    pub fn operation(&self) -> &str {
        self.path.trim_start_matches("/api/v1/")
    }
}

/// Replays canned replies in order and records every request.
#[derive(Debug, Default)]
pub struct MockCloud {
    replies: VecDeque<Reply>,
    pub requests: Vec<SentRequest>,
}

impl MockCloud {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self { replies: replies.into_iter().collect(), requests: Vec::new() }
    }

    pub fn operations(&self) -> Vec<&str> {
        self.requests.iter().map(SentRequest::operation).collect()
    }

    pub fn remaining(&self) -> usize {
        self.replies.len()
    }
}

impl HttpTransport for MockCloud {
    fn execute(&mut self, request: &HttpRequest<'_>, handler: &mut dyn ResponseHandler) -> Result<()> {
        self.requests.push(SentRequest {
            host: String::from(request.host),
            port: request.port,
            path: String::from(request.path),
            headers: request
                .headers
                .iter()
                .map(|(n, v)| (String::from(*n), String::from(*v)))
                .collect(),
            body: String::from_utf8_lossy(request.body).into_owned(),
        });

        let reply = self.replies.pop_front().ok_or(Error::Failed("mock cloud has no reply"))?;
        handler.on_status_code(reply.status)?;
        for (name, value) in &reply.headers {
            handler.on_header(name, value)?;
        }
        if !reply.body.is_empty() {
            handler.on_body(reply.body.as_bytes())?;
        }
        Ok(())
    }
}

// ── Radio ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Scan,
    Connect { ssid: Vec<u8>, security: SecurityProtocol, hidden: bool },
    Disconnect,
}

/// Answers scans and connects synchronously from inside the call.
#[derive(Debug, Default)]
pub struct MockRadio {
    pub networks: Vec<ScanResult>,
    pub reachable: Vec<Vec<u8>>,
    /// Whether hidden WPA-PSK profiles (the encoded setup network) associate.
    pub encoded_reachable: bool,
    pub calls: Vec<RadioCall>,
    link_up: bool,
}

impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_network(mut self, ssid: &[u8], security: SecurityProtocol) -> Self {
        let index = self.networks.len() as u8;
        self.networks.push(ScanResult {
            ssid: ssid_from(ssid).unwrap(),
            bssid: [0x02, 0, 0, 0, 0, index],
            security,
            channel: 6,
            frequency: Some(2437),
            signal_strength: Some(-50),
        });
        self
    }

    pub fn reaching(mut self, ssid: &[u8]) -> Self {
        self.reachable.push(ssid.to_vec());
        self
    }

    pub fn reaching_encoded(mut self) -> Self {
        self.encoded_reachable = true;
        self
    }

    /// SSIDs of every connect, in order.
    pub fn connects(&self) -> Vec<Vec<u8>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RadioCall::Connect { ssid, .. } => Some(ssid.clone()),
                _ => None,
            })
            .collect()
    }
}

impl WifiDriver for MockRadio {
    fn scan(&mut self, _: &ScanRequest<'_>, events: &WifiEvents) -> Result<()> {
        self.calls.push(RadioCall::Scan);
        for network in &self.networks {
            events.scan_entry(network.clone());
        }
        events.scan_done();
        Ok(())
    }

    fn connect(&mut self, config: &WifiConfiguration, events: &WifiEvents) -> Result<()> {
        self.calls.push(RadioCall::Connect {
            ssid: config.ssid.to_vec(),
            security: config.security,
            hidden: config.hidden,
        });
        let encoded = config.hidden && config.security == SecurityProtocol::WpaPsk;
        self.link_up = (encoded && self.encoded_reachable)
            || self.reachable.iter().any(|s| s.as_slice() == config.ssid.as_slice());
        events.link_event(if self.link_up { LinkEvent::Connected } else { LinkEvent::Failed });
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.calls.push(RadioCall::Disconnect);
        self.link_up = false;
        Ok(())
    }

    fn is_link_up(&self) -> Result<bool> {
        Ok(self.link_up)
    }
}

// ── Platform ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    CanProceed,
    CanPostScanData(ScanPostProgress),
    CanGetCredentials { sequence: u32, all_returned: bool },
    SetupNetwork,
}

/// Persistence from [`MemoryStore`], scripted client hooks, and crypto that
/// trusts [`CLOUD_SIGNATURE`] only.
#[derive(Debug)]
pub struct MockPlatform {
    pub store: MemoryStore,
    pub hooks: Vec<HookCall>,
    /// Answers for `can_proceed`, then `true` once drained.
    pub can_proceed: VecDeque<bool>,
    pub scan_posts: u32,
    pub credential_gets: u32,
    pub setup_network: Option<WifiConfiguration>,
    random_counter: u8,
}

impl MockPlatform {
    /// Device with everything needed for the encoded setup network.
    pub fn provisioned_device() -> Self {
        let store = MemoryStore::new()
            .with_value(keys::DEVICE_PUBLIC_KEY, ConfigValue::Bytes(b"device-public-key-der".to_vec()))
            .with_value(keys::CLOUD_PUBLIC_KEY, ConfigValue::Bytes(b"cloud-public-key-der".to_vec()))
            .with_value(keys::PRODUCT_INDEX, ConfigValue::String(String::from("CbtN")))
            .with_value(keys::PIN, ConfigValue::String(String::from("12345678")))
            .with_value(keys::MANUFACTURER_NAME, ConfigValue::String(String::from("Acme")));
        Self::with_store(store)
    }

    /// Device without key material: no encoded setup network.
    pub fn bare_device() -> Self {
        let store = MemoryStore::new().with_value(keys::PIN, ConfigValue::String(String::from("0000")));
        Self::with_store(store)
    }

    fn with_store(store: MemoryStore) -> Self {
        Self {
            store,
            hooks: Vec::new(),
            can_proceed: VecDeque::new(),
            scan_posts: 1,
            credential_gets: 1,
            setup_network: None,
            random_counter: 0,
        }
    }

    pub fn states(&self) -> &[ProvisioneeState] {
        self.store.state_history()
    }
}

impl ConfigStore for MockPlatform {
    fn get_value(&self, key: &str) -> Result<ConfigValue> {
        self.store.get_value(key)
    }

    fn set_value(&mut self, key: &str, value: ConfigValue) -> Result<()> {
        self.store.set_value(key, value)
    }
}

impl StateStore for MockPlatform {
    fn get_state(&self) -> Result<ProvisioneeState> {
        self.store.get_state()
    }

    fn set_state(&mut self, state: ProvisioneeState) -> Result<()> {
        self.store.set_state(state)
    }
}

impl RegistrationStore for MockPlatform {
    fn set_registration_token(&mut self, token: RegistrationToken) -> Result<()> {
        self.store.set_registration_token(token)
    }

    fn get_registration_details(&self) -> Result<RegistrationDetails> {
        self.store.get_registration_details()
    }
}

impl Crypto for MockPlatform {
    fn random_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        for byte in out {
            self.random_counter = self.random_counter.wrapping_add(1);
            *byte = self.random_counter;
        }
        Ok(())
    }

    fn ecdh_shared_secret(&mut self, peer: &[u8]) -> Result<Vec<u8>> {
        Ok(self.sha256(peer).to_vec())
    }

    fn verify_cloud_signature(&self, _: &[u8], signature: &[u8]) -> Result<bool> {
        Ok(signature == CLOUD_SIGNATURE)
    }
}

impl ProvisioneeClient for MockPlatform {
    fn can_proceed(&mut self) -> Result<bool> {
        self.hooks.push(HookCall::CanProceed);
        Ok(self.can_proceed.pop_front().unwrap_or(true))
    }

    fn can_post_wifi_scan_data(&mut self, progress: &ScanPostProgress) -> Result<bool> {
        self.hooks.push(HookCall::CanPostScanData(*progress));
        Ok(progress.sequence <= self.scan_posts)
    }

    fn can_get_wifi_credentials(&mut self, sequence: u32, all_returned: bool) -> Result<bool> {
        self.hooks.push(HookCall::CanGetCredentials { sequence, all_returned });
        Ok(sequence <= self.credential_gets)
    }

    fn setup_network(&mut self) -> Result<WifiConfiguration> {
        self.hooks.push(HookCall::SetupNetwork);
        self.setup_network.clone().ok_or(Error::NotImplemented)
    }
}
