//! `report`: state-transition outcome plus connection attempts.

use log::{debug, info};

use crate::error::Result;
use crate::json::{JsonField, JsonKind, ObjectEncoder, bind_fields, field};
use crate::provisionee::ports::{ConfigStore, Crypto};
use crate::provisionee::{ProvisioneeState, RegistrationState};
use crate::stream::Stream;
use crate::wifi::{ConnectionDetails, SecurityProtocol};

use super::backlog::{Backlog, ListEntry};
use super::client::{DssClient, Operation};
use super::model::{
    CONNECTION_STATES, PROVISIONEE_STATES, REGISTRATION_STATES, REPORT_RESULTS, ReportResult,
    SECURITY_PROTOCOLS,
};
use super::transport::HttpTransport;
use super::{can_proceed_field, finish_request};

/// What the device tells the cloud about the state it just ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub state: ProvisioneeState,
    pub result: ReportResult,
    pub registration: RegistrationState,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportResponse {
    pub can_proceed: bool,
    /// NOT_PROVISIONED when the cloud names no next state.
    pub next_state: ProvisioneeState,
    pub wait_time: Option<String>,
    pub reason: Option<String>,
}

impl ListEntry for ConnectionDetails {
    fn is_postable(&self) -> bool {
        self.security != SecurityProtocol::Unknown
    }

    fn encode(&self, out: &mut Stream<'_>) -> Result<()> {
        let mut obj = ObjectEncoder::begin(out)?;
        obj.quoted_string("ssid", &self.ssid, out)?;
        obj.string("securityProtocol", SECURITY_PROTOCOLS.name(self.security)?.as_bytes(), out)?;
        obj.string("wifiConnectionState", CONNECTION_STATES.name(self.state)?.as_bytes(), out)?;
        if let Some(error) = &self.error {
            obj.key("errorDetails", out)?;
            let mut details = ObjectEncoder::begin(out)?;
            details.string("operation", error.operation.as_bytes(), out)?;
            details.string("cause", error.cause.as_bytes(), out)?;
            details.string("details", error.details.as_bytes(), out)?;
            details.string("code", error.code.as_bytes(), out)?;
            details.end(out)?;
        }
        obj.end(out)
    }
}

impl<T: HttpTransport> DssClient<T> {
    /// Report a state transition.  Advances the client sequence number
    /// first, so every report carries a fresh one.  Attempts that do not fit
    /// stay in `attempts` for the next report.
    pub fn report<I>(
        &mut self,
        env: &mut (impl ConfigStore + Crypto),
        request: ReportRequest,
        attempts: &mut Backlog<I>,
    ) -> Result<ReportResponse>
    where
        I: Iterator<Item = ConnectionDetails>,
    {
        let sequence_number = self.advance_sequence_number();
        let state = PROVISIONEE_STATES.name(request.state)?;
        let registration = REGISTRATION_STATES.name(request.registration)?;
        let result = REPORT_RESULTS.name(request.result)?;

        let (mut obj, mut out) = self.begin_request(env, true)?;
        obj.integer("sequenceNumber", i64::from(sequence_number), &mut out)?;
        obj.string("currentProvisioningState", state.as_bytes(), &mut out)?;
        obj.string("registrationState", registration.as_bytes(), &mut out)?;
        obj.string("stateTransitionResult", result.as_bytes(), &mut out)?;
        let reported = attempts.drain_into("wifiNetworkInfoList", &mut obj, &mut out)?;
        let len = finish_request(obj, &mut out)?;
        info!(
            "DSS: report #{} {} {} ({} attempts)",
            sequence_number, state, result, reported
        );

        let mut response = ReportResponse::default();
        self.execute(env, Operation::Report, len, |_, body| {
            let mut fields = [
                JsonField::new("nonce", JsonKind::String),
                JsonField::new("canProceed", JsonKind::Boolean),
                JsonField::new("nextProvisioningState", JsonKind::String),
                JsonField::new("waitTime", JsonKind::String),
                JsonField::new("reason", JsonKind::String),
            ];
            bind_fields(body, &mut fields)?;
            response.can_proceed = can_proceed_field(&fields)?;
            if let Some(next) = field(&fields, "nextProvisioningState") {
                response.next_state = PROVISIONEE_STATES.parse(&next.decode_to_vec()?)?;
            }
            response.wait_time = field(&fields, "waitTime").map(|v| v.decode_to_string()).transpose()?;
            response.reason = field(&fields, "reason").map(|v| v.decode_to_string()).transpose()?;
            Ok(())
        })?;
        debug!(
            "DSS: report answered, next state {} (can proceed: {})",
            response.next_state, response.can_proceed
        );
        Ok(response)
    }
}
