//! `startProvisioningSession` and `startPinBasedSetup`.

use log::{debug, info};

use crate::encoding::base64_encode_to_string;
use crate::error::{Error, Result};
use crate::json::{JsonField, JsonKind, bind_fields, field};
use crate::provisionee::ports::{ConfigStore, Crypto, keys};

use super::client::{DssClient, Operation};
use super::transport::HttpTransport;
use super::{can_proceed_field, finish_request};

pub const SALT_SIZE: usize = 8;

pub type Salt = heapless::Vec<u8, SALT_SIZE>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStarted {
    pub can_proceed: bool,
    pub salt: Salt,
}

impl<T: HttpTransport> DssClient<T> {
    /// Open a provisioning session.  The session id is kept by the client;
    /// the salt is returned for PIN-based setup.
    pub fn start_provisioning_session(
        &mut self,
        env: &mut (impl ConfigStore + Crypto),
    ) -> Result<SessionStarted> {
        let (obj, mut out) = self.begin_request(env, false)?;
        let len = finish_request(obj, &mut out)?;

        let mut session_id = None;
        let mut started = SessionStarted { can_proceed: false, salt: Salt::new() };
        self.execute(env, Operation::StartProvisioningSession, len, |_, body| {
            let mut fields = [
                JsonField::new("nonce", JsonKind::String),
                JsonField::new("sessionId", JsonKind::String),
                JsonField::new("canProceed", JsonKind::Boolean),
                JsonField::new("salt", JsonKind::String),
            ];
            bind_fields(body, &mut fields)?;
            started.can_proceed = can_proceed_field(&fields)?;
            if !started.can_proceed {
                return Ok(());
            }

            let id = field(&fields, "sessionId").ok_or(Error::Failed("dss missing sessionId"))?;
            session_id = Some(id.decode_to_string()?);
            let salt = field(&fields, "salt").ok_or(Error::Failed("dss missing salt"))?;
            started.salt = Salt::from_slice(&salt.decode_to_vec()?).map_err(|()| Error::Overrun)?;
            Ok(())
        })?;

        if let Some(id) = session_id {
            info!("DSS: provisioning session started");
            self.set_session_id(id);
        }
        Ok(started)
    }

    /// Prove knowledge of the device PIN:
    /// `hashedPin = base64(sha256(pin || salt))`.
    pub fn start_pin_based_setup(
        &mut self,
        env: &mut (impl ConfigStore + Crypto),
        salt: &[u8],
    ) -> Result<bool> {
        let hashed_pin = {
            let pin = env.get_value(keys::PIN)?;
            let pin = pin.as_bytes().ok_or(Error::Failed("pin type"))?;
            let mut salted = Vec::with_capacity(pin.len() + salt.len());
            salted.extend_from_slice(pin);
            salted.extend_from_slice(salt);
            base64_encode_to_string(&env.sha256(&salted))
        };

        let (mut obj, mut out) = self.begin_request(env, true)?;
        obj.string("hashedPin", hashed_pin.as_bytes(), &mut out)?;
        let len = finish_request(obj, &mut out)?;

        let mut can_proceed = false;
        self.execute(env, Operation::StartPinBasedSetup, len, |_, body| {
            let mut fields = [
                JsonField::new("nonce", JsonKind::String),
                JsonField::new("canProceed", JsonKind::Boolean),
            ];
            bind_fields(body, &mut fields)?;
            can_proceed = can_proceed_field(&fields)?;
            Ok(())
        })?;
        debug!("DSS: PIN-based setup accepted, can proceed: {}", can_proceed);
        Ok(can_proceed)
    }
}
