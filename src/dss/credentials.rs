//! `getWifiCredentials`.

use log::{debug, warn};

use crate::encoding::hex_decode;
use crate::error::{Error, Result};
use crate::json::{JsonField, JsonKind, JsonValue, bind_fields, field};
use crate::provisionee::ports::{ConfigStore, Crypto};
use crate::stream::{Stream, is_hex};
use crate::wifi::{MAX_WIFI_KEY_LENGTH, SecurityProtocol, WifiConfiguration, key_from, ssid_from};

use super::client::{DssClient, Operation};
use super::model::SECURITY_PROTOCOLS;
use super::transport::HttpTransport;
use super::{can_proceed_field, finish_request};

const WEP_64_HEX_LENGTH: usize = 10;
const WEP_128_HEX_LENGTH: usize = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CredentialsReturned {
    pub can_proceed: bool,
    pub all_credentials_returned: bool,
    /// Entries handed to the save hook by this call.
    pub saved: usize,
}

impl<T: HttpTransport> DssClient<T> {
    /// Fetch the next batch of user-network credentials.  Each entry that
    /// converts cleanly is passed to `save` in response order.
    pub fn get_wifi_credentials<S>(
        &mut self,
        env: &mut (impl ConfigStore + Crypto),
        sequence_number: u32,
        mut save: S,
    ) -> Result<CredentialsReturned>
    where
        S: FnMut(WifiConfiguration) -> Result<()>,
    {
        let (mut obj, mut out) = self.begin_request(env, true)?;
        obj.integer("sequenceNumber", i64::from(sequence_number), &mut out)?;
        let len = finish_request(obj, &mut out)?;

        let mut returned = CredentialsReturned::default();
        self.execute(env, Operation::GetWifiCredentials, len, |_, body| {
            let mut fields = [
                JsonField::new("nonce", JsonKind::String),
                JsonField::new("canProceed", JsonKind::Boolean),
                JsonField::new("sequenceNumber", JsonKind::Number),
                JsonField::new("allCredentialsReturned", JsonKind::Boolean),
                JsonField::new("wifiCredentialsList", JsonKind::Array),
            ];
            bind_fields(body, &mut fields)?;
            returned.can_proceed = can_proceed_field(&fields)?;
            if let Some(all) = field(&fields, "allCredentialsReturned") {
                returned.all_credentials_returned = all.as_bool()?;
            }

            let Some(list) = field(&fields, "wifiCredentialsList") else {
                return Ok(());
            };
            for entry in list.array()? {
                let entry = entry?;
                match parse_credentials(entry) {
                    Ok(config) => {
                        save(config)?;
                        returned.saved += 1;
                    }
                    Err(e) => warn!("DSS: ignoring unparseable credentials entry: {}", e),
                }
            }
            Ok(())
        })?;
        debug!(
            "DSS: credentials batch {} saved {} (all returned: {})",
            sequence_number, returned.saved, returned.all_credentials_returned
        );
        Ok(returned)
    }
}

/// `"\"inner\""` → `inner`.  Fails unless both quotes are present.
fn strip_required_quotes(text: &[u8]) -> Result<&[u8]> {
    text.strip_prefix(b"\"")
        .and_then(|t| t.strip_suffix(b"\""))
        .ok_or(Error::Failed("dss quoted string"))
}

/// Like [`strip_required_quotes`] but leaves unquoted text untouched.
fn strip_optional_quotes(text: &[u8]) -> &[u8] {
    if text.len() < 2 {
        return text;
    }
    strip_required_quotes(text).unwrap_or(text)
}

/// String values are unescaped; any other token is taken verbatim.
fn value_bytes(value: JsonValue<'_>) -> Result<Vec<u8>> {
    match value.kind {
        JsonKind::String => value.decode_to_vec(),
        _ => Ok(value.raw.to_vec()),
    }
}

fn decode_wep_key(raw: &[u8]) -> Result<Vec<u8>> {
    let key = strip_optional_quotes(raw);
    if is_hex(key) && matches!(key.len(), WEP_64_HEX_LENGTH | WEP_128_HEX_LENGTH) {
        let mut decoded = [0u8; MAX_WIFI_KEY_LENGTH];
        let mut out = Stream::output(&mut decoded);
        hex_decode(key, &mut out)?;
        return Ok(out.data().to_vec());
    }
    Ok(key.to_vec())
}

fn small_int<N: TryFrom<i64>>(value: JsonValue<'_>) -> Result<N> {
    N::try_from(value.as_i64()?).map_err(|_| Error::Failed("dss credentials number"))
}

fn parse_credentials(entry: JsonValue<'_>) -> Result<WifiConfiguration> {
    let mut fields = [
        JsonField::new("ssid", JsonKind::String),
        JsonField::new("securityProtocol", JsonKind::String),
        JsonField::new("key", JsonKind::Any),
        JsonField::new("keyIndex", JsonKind::Number),
        JsonField::new("priority", JsonKind::Number),
        JsonField::new("frequency", JsonKind::Number),
    ];
    if entry.kind != JsonKind::Object {
        return Err(Error::Failed("dss credentials entry"));
    }
    bind_fields(entry.raw, &mut fields)?;

    let ssid = field(&fields, "ssid").ok_or(Error::Failed("dss credentials ssid"))?;
    let ssid = ssid.decode_to_vec()?;
    let protocol = field(&fields, "securityProtocol")
        .ok_or(Error::Failed("dss credentials protocol"))?;

    let mut config = WifiConfiguration {
        ssid: ssid_from(strip_required_quotes(&ssid)?)?,
        security: SECURITY_PROTOCOLS.parse(&protocol.decode_to_vec()?)?,
        ..WifiConfiguration::default()
    };

    match config.security {
        SecurityProtocol::WpaPsk => {
            let key = field(&fields, "key").ok_or(Error::Failed("dss credentials key"))?;
            if key.kind != JsonKind::String {
                return Err(Error::Failed("dss credentials key"));
            }
            config.key = key_from(strip_required_quotes(&key.decode_to_vec()?)?)?;
        }
        SecurityProtocol::Wep => {
            let key = field(&fields, "key").ok_or(Error::Failed("dss credentials key"))?;
            config.key = key_from(&decode_wep_key(&value_bytes(key)?)?)?;
            if let Some(index) = field(&fields, "keyIndex") {
                config.wep_index = Some(small_int(index)?);
            }
        }
        _ => {}
    }

    if let Some(priority) = field(&fields, "priority") {
        config.network_priority = Some(i64::from(small_int::<i32>(priority)?));
    }
    if let Some(frequency) = field(&fields, "frequency") {
        config.frequency = Some(i64::from(small_int::<i32>(frequency)?));
    }
    Ok(config)
}
