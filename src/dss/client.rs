//! DSS client: session state plus one signed request/response cycle.
//!
//! ```text
//!   operation ──▶ body buffer ──▶ HttpTransport ──▶ Exchange
//!                                                   │ status  → saved
//!                                                   │ Location → redirect host
//!                                                   │ x-amzn-dss-signature → decoded
//!                                                   └ body    → verified, then parsed
//! ```
//!
//! A response is accepted only once its body has passed
//! [`Crypto::verify_cloud_signature`].  Redirects (307/308) re-target the
//! request; 308 also persists the new host.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::{debug, error, info, warn};

use crate::config::ProvisioneeConfig;
use crate::error::{Error, Result, ResultExt};
use crate::json::ObjectEncoder;
use crate::provisionee::ports::{ConfigStore, ConfigValue, Crypto, keys};
use crate::stream::Stream;

use super::device_details::encode_device_details;
use super::transport::{HttpRequest, HttpTransport, ResponseHandler};

pub const SIGNATURE_HEADER: &str = "x-amzn-dss-signature";
pub const MAX_SIGNATURE_SIZE: usize = 72;

const LOCATION_HEADER: &str = "Location";
const HTTPS_PREFIX: &str = "https://";
const CONTENT_TYPE_JSON: &str = "application/json";
const STATUS_TEMPORARY_REDIRECT: u16 = 307;
const STATUS_PERMANENT_REDIRECT: u16 = 308;

// ───────────────────────────────────────────────────────────────
// Operations
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    StartProvisioningSession,
    StartPinBasedSetup,
    ComputeConfigurationData,
    PostWifiScanData,
    GetWifiCredentials,
    Report,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Self::StartProvisioningSession => "START PROVISIONING SESSION",
            Self::StartPinBasedSetup => "START PIN-BASED SETUP",
            Self::ComputeConfigurationData => "COMPUTE CONFIGURATION DATA",
            Self::PostWifiScanData => "POST WI-FI SCAN DATA",
            Self::GetWifiCredentials => "GET WI-FI CREDENTIALS",
            Self::Report => "REPORT",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::StartProvisioningSession => "/api/v1/startProvisioningSession",
            Self::StartPinBasedSetup => "/api/v1/startPinBasedSetup",
            Self::ComputeConfigurationData => "/api/v1/computeConfigurationData",
            Self::PostWifiScanData => "/api/v1/postWifiScanData",
            Self::GetWifiCredentials => "/api/v1/getWifiCredentials",
            Self::Report => "/api/v1/report",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Client
// ───────────────────────────────────────────────────────────────

/// Session state for one provisioning run.
pub struct DssClient<T> {
    transport: T,
    host: String,
    port: u16,
    socks_port: u16,
    max_redirects: u8,
    nonce_length: usize,
    /// Shared request buffer.
    body: Vec<u8>,
    nonce: String,
    session_id: Option<String>,
    sequence_number: u32,
    on_setup_network: bool,
}

impl<T: HttpTransport> DssClient<T> {
    /// Resolve the endpoint from `store` (falling back to `config`) and
    /// allocate the body buffer.
    pub fn new(transport: T, config: &ProvisioneeConfig, store: &impl ConfigStore) -> Result<Self> {
        if let Err(e) = config.validate() {
            error!("DSS: invalid configuration: {}", e);
            return Err(Error::Failed("provisionee config"));
        }

        let host = match store.get_value(keys::DSS_HOST).or_not_implemented()? {
            Some(ConfigValue::String(host)) => host,
            Some(_) => return Err(Error::Failed("dss host type")),
            None => config.dss_default_host.clone(),
        };
        let port = match store.get_value(keys::DSS_PORT).or_not_implemented()? {
            Some(ConfigValue::Integer(port)) => {
                u16::try_from(port).map_err(|_| Error::Failed("dss port range"))?
            }
            Some(_) => return Err(Error::Failed("dss port type")),
            None => config.dss_default_port,
        };
        debug!("DSS: endpoint {}:{}", host, port);

        Ok(Self {
            transport,
            host,
            port,
            socks_port: config.transparent_socks_port,
            max_redirects: config.max_redirects,
            nonce_length: config.nonce_length,
            body: vec![0u8; config.body_buffer_size],
            nonce: String::with_capacity(config.nonce_length),
            session_id: None,
            sequence_number: 1,
            on_setup_network: false,
        })
    }

    // --- Accessors ---

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port requests go to: the transparent SOCKS port while on the
    /// encoded setup network, the DSS port otherwise.
    pub fn port(&self) -> u16 {
        if self.on_setup_network { self.socks_port } else { self.port }
    }

    pub fn set_on_setup_network(&mut self, on_setup_network: bool) {
        self.on_setup_network = on_setup_network;
    }

    pub fn on_setup_network(&self) -> bool {
        self.on_setup_network
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // --- Session state ---

    pub(super) fn set_session_id(&mut self, session_id: String) {
        self.session_id = Some(session_id);
    }

    pub(super) fn advance_sequence_number(&mut self) -> u32 {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.sequence_number
    }

    /// New nonce: base64 of 3 random bytes at a time, cut to length.
    pub(super) fn refresh_nonce(&mut self, crypto: &mut impl Crypto) -> Result<()> {
        self.nonce.clear();
        while self.nonce.len() < self.nonce_length {
            let mut raw = [0u8; 3];
            crypto.random_bytes(&mut raw)?;
            let mut encoded = [0u8; 4];
            STANDARD.encode_slice(raw, &mut encoded)?;
            for &c in &encoded {
                if self.nonce.len() == self.nonce_length {
                    break;
                }
                self.nonce.push(char::from(c));
            }
        }
        Ok(())
    }

    /// Refresh the nonce and open a request body with the common fields:
    /// `{"nonce":..,"sessionId":..,"deviceDetails":{..}`.  The caller adds
    /// its own fields and closes the object.
    pub(super) fn begin_request<'b>(
        &'b mut self,
        env: &mut (impl ConfigStore + Crypto),
        with_session: bool,
    ) -> Result<(ObjectEncoder, Stream<'b>)> {
        self.refresh_nonce(env)?;
        let session_id = if with_session {
            Some(self.session_id.as_deref().ok_or(Error::Failed("dss no session"))?)
        } else {
            None
        };

        let mut out = Stream::output(&mut self.body);
        let mut obj = ObjectEncoder::begin(&mut out)?;
        obj.string("nonce", self.nonce.as_bytes(), &mut out)?;
        if let Some(id) = session_id {
            obj.string("sessionId", id.as_bytes(), &mut out)?;
        }
        encode_device_details(&*env, &mut obj, &mut out)?;
        Ok((obj, out))
    }

    /// Send the first `body_len` bytes of the body buffer as `operation`
    /// and hand the verified response body to `parse`.
    pub(super) fn execute<E, F>(
        &mut self,
        env: &mut E,
        operation: Operation,
        body_len: usize,
        mut parse: F,
    ) -> Result<()>
    where
        E: ConfigStore + Crypto,
        F: FnMut(&mut E, &[u8]) -> Result<()>,
    {
        let body_len = body_len.min(self.body.len());
        let signature = match env.sign_payload(&self.body[..body_len]) {
            Ok(sig) => Some(STANDARD.encode(sig)),
            Err(Error::NotImplemented) => None,
            Err(e) => return Err(e),
        };

        let mut redirects = 0u8;
        loop {
            let port = self.port();
            let signature_header;
            let headers: &[(&'static str, &str)] = match &signature {
                Some(sig) => {
                    signature_header = [(SIGNATURE_HEADER, sig.as_str())];
                    &signature_header
                }
                None => &[],
            };
            let request = HttpRequest {
                host: &self.host,
                port,
                path: operation.path(),
                content_type: CONTENT_TYPE_JSON,
                headers,
                body: &self.body[..body_len],
            };
            debug!(
                "DSS: {} -> https://{}:{}{}",
                operation.name(),
                self.host,
                port,
                operation.path()
            );

            let mut exchange = Exchange::new(&mut *env, &mut parse);
            let sent = self.transport.execute(&request, &mut exchange);
            let outcome = exchange.finish();
            if let Some(e) = outcome.error {
                warn!("DSS: {} response rejected: {}", operation.name(), e);
                return Err(e);
            }
            sent?;

            let status = outcome.status.ok_or(Error::Failed("dss no status code"))?;
            if let Some(host) = outcome.redirect {
                redirects += 1;
                if redirects > self.max_redirects {
                    warn!("DSS: too many redirects");
                    return Err(Error::Failed("dss redirect limit"));
                }
                if status == STATUS_PERMANENT_REDIRECT {
                    env.set_value(keys::DSS_HOST, ConfigValue::String(host.clone()))
                        .or_not_implemented()?;
                }
                info!("DSS: redirected ({}) to {}", status, host);
                self.host = host;
                continue;
            }

            if !outcome.verified {
                warn!("DSS: {} response ({}) was not signed", operation.name(), status);
                return Err(Error::Failed("dss unverified response"));
            }
            debug!("DSS: {} completed with status {}", operation.name(), status);
            return Ok(());
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Response handling
// ───────────────────────────────────────────────────────────────

/// `https://host[:port][/path]` → `host`.
fn extract_host(location: &[u8]) -> Result<String> {
    let url = core::str::from_utf8(location).map_err(|_| Error::Failed("dss location"))?;
    let rest = url.strip_prefix(HTTPS_PREFIX).ok_or(Error::Failed("dss location scheme"))?;
    let host = rest.split([':', '/']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(Error::Failed("dss location host"));
    }
    Ok(String::from(host))
}

struct Outcome {
    status: Option<u16>,
    redirect: Option<String>,
    verified: bool,
    error: Option<Error>,
}

/// Per-request response state.  The first handler error is kept so the
/// caller sees it instead of the transport's generic abort.
struct Exchange<'e, E, F> {
    env: &'e mut E,
    parse: &'e mut F,
    status: Option<u16>,
    redirect: Option<String>,
    signature: Option<heapless::Vec<u8, MAX_SIGNATURE_SIZE>>,
    body_seen: bool,
    verified: bool,
    error: Option<Error>,
}

impl<'e, E, F> Exchange<'e, E, F>
where
    E: Crypto,
    F: FnMut(&mut E, &[u8]) -> Result<()>,
{
    fn new(env: &'e mut E, parse: &'e mut F) -> Self {
        Self {
            env,
            parse,
            status: None,
            redirect: None,
            signature: None,
            body_seen: false,
            verified: false,
            error: None,
        }
    }

    fn is_redirect(&self) -> bool {
        matches!(self.status, Some(STATUS_TEMPORARY_REDIRECT | STATUS_PERMANENT_REDIRECT))
    }

    fn record(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = result {
            self.error.get_or_insert(e);
        }
        result
    }

    fn header(&mut self, name: &str, value: &[u8]) -> Result<()> {
        if self.is_redirect() && name.eq_ignore_ascii_case(LOCATION_HEADER) {
            if self.redirect.is_some() {
                return Err(Error::Failed("dss duplicate location"));
            }
            self.redirect = Some(extract_host(value)?);
        }

        if name.eq_ignore_ascii_case(SIGNATURE_HEADER) {
            if self.signature.is_some() {
                return Err(Error::Failed("dss duplicate signature"));
            }
            let mut decoded = [0u8; MAX_SIGNATURE_SIZE];
            let len = STANDARD.decode_slice(value, &mut decoded)?;
            let signature = heapless::Vec::from_slice(&decoded[..len]).map_err(|()| Error::Overrun)?;
            self.signature = Some(signature);
        }
        Ok(())
    }

    fn body(&mut self, body: &[u8]) -> Result<()> {
        if self.is_redirect() {
            return Ok(());
        }
        let Some(signature) = self.signature.as_ref() else {
            return Err(Error::Failed("dss body without signature"));
        };
        if self.body_seen {
            return Err(Error::Failed("dss duplicate body"));
        }
        self.body_seen = true;

        if !self.env.verify_cloud_signature(body, signature)? {
            return Err(Error::Failed("dss signature"));
        }
        self.verified = true;
        (self.parse)(self.env, body)
    }

    fn finish(self) -> Outcome {
        let redirect = if self.is_redirect() { self.redirect } else { None };
        Outcome { status: self.status, redirect, verified: self.verified, error: self.error }
    }
}

impl<E, F> ResponseHandler for Exchange<'_, E, F>
where
    E: Crypto,
    F: FnMut(&mut E, &[u8]) -> Result<()>,
{
    fn on_status_code(&mut self, code: u16) -> Result<()> {
        self.status = Some(code);
        Ok(())
    }

    fn on_header(&mut self, name: &str, value: &[u8]) -> Result<()> {
        let result = self.header(name, value);
        self.record(result)
    }

    fn on_body(&mut self, body: &[u8]) -> Result<()> {
        let result = self.body(body);
        self.record(result)
    }
}
