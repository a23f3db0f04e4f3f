//! `postWifiScanData`.

use log::{debug, warn};

use crate::encoding::hex_encode;
use crate::error::{Error, Result};
use crate::json::{JsonField, JsonKind, ObjectEncoder, bind_fields, field};
use crate::provisionee::ports::{ConfigStore, Crypto};
use crate::stream::Stream;
use crate::wifi::{ScanResult, SecurityProtocol};

use super::backlog::{Backlog, ListEntry};
use super::client::{DssClient, Operation};
use super::model::SECURITY_PROTOCOLS;
use super::transport::HttpTransport;
use super::{can_proceed_field, finish_request};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanDataPosted {
    pub can_proceed: bool,
    pub total_credentials_found: u32,
    pub all_credentials_found: bool,
}

impl ListEntry for ScanResult {
    fn is_postable(&self) -> bool {
        if self.is_hidden() {
            warn!("DSS: skipping hidden network");
            return false;
        }
        matches!(
            self.security,
            SecurityProtocol::Open | SecurityProtocol::WpaPsk | SecurityProtocol::Wep
        )
    }

    fn encode(&self, out: &mut Stream<'_>) -> Result<()> {
        let mut obj = ObjectEncoder::begin(out)?;
        obj.quoted_string("ssid", &self.ssid, out)?;

        obj.key("bssid", out)?;
        out.write_byte(b'"')?;
        hex_encode(&self.bssid, Some(b':'), out)?;
        out.write_byte(b'"')?;

        obj.string("securityProtocol", SECURITY_PROTOCOLS.name(self.security)?.as_bytes(), out)?;
        if let Some(rssi) = self.signal_strength.filter(|&s| s != 0) {
            obj.integer("rssi", i64::from(rssi), out)?;
        }
        if let Some(frequency) = self.frequency.filter(|&f| f != 0) {
            obj.integer("frequency", frequency, out)?;
        }
        obj.end(out)
    }
}

impl<T: HttpTransport> DssClient<T> {
    /// Post as many pending scan results as fit.  The ones that do not fit
    /// stay in `scan_results` for the next sequence number.
    pub fn post_wifi_scan_data<I>(
        &mut self,
        env: &mut (impl ConfigStore + Crypto),
        sequence_number: u32,
        scan_results: &mut Backlog<I>,
    ) -> Result<ScanDataPosted>
    where
        I: Iterator<Item = ScanResult>,
    {
        let (mut obj, mut out) = self.begin_request(env, true)?;
        obj.integer("sequenceNumber", i64::from(sequence_number), &mut out)?;
        let posted = scan_results.drain_into("wifiScanDataList", &mut obj, &mut out)?;
        let len = finish_request(obj, &mut out)?;
        debug!("DSS: posting {} scan results (sequence {})", posted, sequence_number);

        let mut response = ScanDataPosted::default();
        self.execute(env, Operation::PostWifiScanData, len, |_, body| {
            let mut fields = [
                JsonField::new("nonce", JsonKind::String),
                JsonField::new("canProceed", JsonKind::Boolean),
                JsonField::new("totalCredentialsFound", JsonKind::Number),
                JsonField::new("allCredentialsFound", JsonKind::Boolean),
            ];
            bind_fields(body, &mut fields)?;
            response.can_proceed = can_proceed_field(&fields)?;
            if let Some(total) = field(&fields, "totalCredentialsFound") {
                response.total_credentials_found = u32::try_from(total.as_i64()?)
                    .map_err(|_| Error::Failed("dss totalCredentialsFound"))?;
            }
            if let Some(all) = field(&fields, "allCredentialsFound") {
                response.all_credentials_found = all.as_bool()?;
            }
            Ok(())
        })?;
        Ok(response)
    }
}
