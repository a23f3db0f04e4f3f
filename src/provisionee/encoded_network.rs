//! Encoded setup network: a hidden WPA-PSK network whose SSID and
//! passphrase are derived from device and cloud key material, so a nearby
//! provisioner can bring it up without user input.
//!
//! ```text
//!   ami   = sha256(device public key DER)[23..32]          (9 bytes)
//!   ssid  = base64([ami[0] >> 4, ami[0] << 4])[..2]
//!         ‖ base85(ami[1..9] ‖ product index ‖ nonce)       (2 + 30 chars)
//!   pass  = base64(hmac_sha256(ecdh(cloud public key), nonce))
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::debug;

use crate::encoding::{base64_encode_to_string, base85_encode};
use crate::error::{Error, Result};
use crate::stream::Stream;
use crate::wifi::{MAX_SSID_LENGTH, SecurityProtocol, WifiConfiguration, key_from, ssid_from};

use super::ports::{ConfigStore, ConfigValue, Crypto, keys};

/// High nibble of the first SSID byte.
const CONTROL_BITS: u8 = 0x00;
const NONCE_SIZE: usize = 12;
const AUTH_MATERIAL_INDEX_SIZE: usize = 9;
const PRODUCT_INDEX_SIZE: usize = 4;
const BASE85_SOURCE_SIZE: usize = AUTH_MATERIAL_INDEX_SIZE - 1 + PRODUCT_INDEX_SIZE + NONCE_SIZE;

/// Derive the encoded setup network for this device.
pub fn compute_encoded_network(env: &mut (impl ConfigStore + Crypto)) -> Result<WifiConfiguration> {
    let mut nonce = [0u8; NONCE_SIZE];
    env.random_bytes(&mut nonce)?;

    let ami = auth_material_index(&*env)?;
    let product_index = config_bytes(&*env, keys::PRODUCT_INDEX)?;
    if product_index.len() != PRODUCT_INDEX_SIZE {
        return Err(Error::Failed("product index size"));
    }

    let mut ssid = [0u8; MAX_SSID_LENGTH];
    let mut out = Stream::output(&mut ssid);
    out.write(&ssid_prefix(ami[0])?)?;

    let mut source = [0u8; BASE85_SOURCE_SIZE];
    let (head, rest) = source.split_at_mut(AUTH_MATERIAL_INDEX_SIZE - 1);
    let (product, tail) = rest.split_at_mut(PRODUCT_INDEX_SIZE);
    head.copy_from_slice(&ami[1..]);
    product.copy_from_slice(&product_index);
    tail.copy_from_slice(&nonce);
    base85_encode(&source, &mut out)?;

    let cloud_key = config_bytes(&*env, keys::CLOUD_PUBLIC_KEY)?;
    let secret = env.ecdh_shared_secret(&cloud_key)?;
    let passphrase = base64_encode_to_string(&env.hmac_sha256(&secret, &nonce));

    debug!("provisionee: encoded setup network computed");
    Ok(WifiConfiguration {
        ssid: ssid_from(out.data())?,
        security: SecurityProtocol::WpaPsk,
        key: key_from(passphrase.as_bytes())?,
        hidden: true,
        ..WifiConfiguration::default()
    })
}

fn config_bytes(store: &impl ConfigStore, key: &str) -> Result<Vec<u8>> {
    match store.get_value(key)? {
        ConfigValue::Bytes(bytes) => Ok(bytes),
        ConfigValue::String(s) => Ok(s.into_bytes()),
        ConfigValue::Integer(_) | ConfigValue::Boolean(_) => Err(Error::Failed("key material type")),
    }
}

fn auth_material_index(env: &(impl ConfigStore + Crypto)) -> Result<[u8; AUTH_MATERIAL_INDEX_SIZE]> {
    let public_key = config_bytes(env, keys::DEVICE_PUBLIC_KEY)?;
    let hash = env.sha256(&public_key);
    let mut ami = [0u8; AUTH_MATERIAL_INDEX_SIZE];
    ami.copy_from_slice(&hash[hash.len() - AUTH_MATERIAL_INDEX_SIZE..]);
    Ok(ami)
}

/// The first two base64 characters of the control byte pair.
fn ssid_prefix(first: u8) -> Result<[u8; 2]> {
    let pair = [((CONTROL_BITS << 4) & 0xF0) | ((first >> 4) & 0x0F), (first << 4) & 0xF0];
    let mut encoded = [0u8; 4];
    STANDARD.encode_slice(pair, &mut encoded)?;
    Ok([encoded[0], encoded[1]])
}
