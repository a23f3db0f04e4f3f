//! Fuzz target: `DssClient::get_wifi_credentials` response handling
//!
//! Feeds arbitrary bytes as a correctly signed credentials response body.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Every saved network has a non-empty SSID
//! - `saved` matches the number of networks handed to the callback
//!
//! cargo fuzz run fuzz_credentials_response

#![no_main]

use std::collections::HashMap;

use ffs_provisionee::config::ProvisioneeConfig;
use ffs_provisionee::dss::{DssClient, HttpRequest, HttpTransport, ResponseHandler};
use ffs_provisionee::error::{Error, Result};
use ffs_provisionee::provisionee::{ConfigStore, ConfigValue, Crypto};
use libfuzzer_sys::fuzz_target;

const SESSION: &[u8] = br#"{"nonce":"n","sessionId":"fuzz","canProceed":true}"#;
const SIGNATURE: &str = "c2ln";

// ── In-memory device for fuzz testing ─────────────────────────

#[derive(Default)]
struct Device(HashMap<String, ConfigValue>);

impl ConfigStore for Device {
    fn get_value(&self, key: &str) -> Result<ConfigValue> {
        self.0.get(key).cloned().ok_or(Error::NotImplemented)
    }

    fn set_value(&mut self, key: &str, value: ConfigValue) -> Result<()> {
        self.0.insert(String::from(key), value);
        Ok(())
    }
}

impl Crypto for Device {
    fn random_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        out.fill(b'7');
        Ok(())
    }

    fn ecdh_shared_secret(&mut self, peer: &[u8]) -> Result<Vec<u8>> {
        Ok(peer.to_vec())
    }

    fn verify_cloud_signature(&self, _: &[u8], signature: &[u8]) -> Result<bool> {
        Ok(signature == b"sig")
    }
}

/// Answers the session request, then the fuzz input.
struct Replay<'a> {
    bodies: [&'a [u8]; 2],
    sent: usize,
}

impl HttpTransport for Replay<'_> {
    fn execute(&mut self, _: &HttpRequest<'_>, handler: &mut dyn ResponseHandler) -> Result<()> {
        let body = *self.bodies.get(self.sent).ok_or(Error::Failed("no reply"))?;
        self.sent += 1;
        handler.on_status_code(200)?;
        handler.on_header("x-amzn-dss-signature", SIGNATURE.as_bytes())?;
        handler.on_body(body)
    }
}

fuzz_target!(|data: &[u8]| {
    let mut device = Device::default();
    let transport = Replay { bodies: [SESSION, data], sent: 0 };
    let Ok(mut dss) = DssClient::new(transport, &ProvisioneeConfig::default(), &device) else {
        return;
    };
    if dss.start_provisioning_session(&mut device).is_err() {
        return;
    }

    let mut handed = 0usize;
    let outcome = dss.get_wifi_credentials(&mut device, 1, |network| {
        assert!(!network.ssid.is_empty(), "saved network without an SSID");
        handed += 1;
        Ok(())
    });
    if let Ok(returned) = outcome {
        assert_eq!(returned.saved, handed);
    }
});
