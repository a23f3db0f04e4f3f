//! `computeConfigurationData`: configuration entries and the registration
//! token, each handed to the platform as it is parsed.

use log::{debug, warn};

use crate::error::{Error, Result, ResultExt};
use crate::json::{JsonField, JsonKind, JsonValue, bind_fields, field};
use crate::provisionee::ports::{
    ConfigStore, ConfigValue, Crypto, RegistrationStore, RegistrationToken,
};

use super::client::{DssClient, Operation};
use super::transport::HttpTransport;
use super::{can_proceed_field, finish_request};

impl<T: HttpTransport> DssClient<T> {
    /// Returns the cloud's `canProceed`.
    pub fn compute_configuration_data(
        &mut self,
        env: &mut (impl ConfigStore + Crypto + RegistrationStore),
    ) -> Result<bool> {
        let (obj, mut out) = self.begin_request(env, true)?;
        let len = finish_request(obj, &mut out)?;

        let mut can_proceed = false;
        self.execute(env, Operation::ComputeConfigurationData, len, |env, body| {
            let mut fields = [
                JsonField::new("nonce", JsonKind::String),
                JsonField::new("canProceed", JsonKind::Boolean),
                JsonField::new("configuration", JsonKind::Object),
                JsonField::new("registrationDetails", JsonKind::Object),
            ];
            bind_fields(body, &mut fields)?;
            can_proceed = can_proceed_field(&fields)?;

            if let Some(details) = field(&fields, "registrationDetails") {
                save_registration_details(env, details)?;
            }
            if let Some(configuration) = field(&fields, "configuration") {
                save_configuration(env, configuration)?;
            }
            Ok(())
        })?;
        Ok(can_proceed)
    }
}

fn save_registration_details(store: &mut impl RegistrationStore, details: JsonValue<'_>) -> Result<()> {
    let mut fields = [
        JsonField::new("registrationToken", JsonKind::String),
        JsonField::new("expiresAt", JsonKind::Number),
    ];
    bind_fields(details.raw, &mut fields)?;

    let Some(token) = field(&fields, "registrationToken") else {
        debug!("DSS: no registration token in response");
        return Ok(());
    };
    let expires_at = field(&fields, "expiresAt").map(|v| v.as_i64()).transpose()?;
    store.set_registration_token(RegistrationToken { token: token.decode_to_string()?, expires_at })
}

fn save_configuration(store: &mut impl ConfigStore, configuration: JsonValue<'_>) -> Result<()> {
    for member in configuration.object()? {
        let member = member?;
        let key = member.key.decode_to_string()?;
        let value = match member.value.kind {
            JsonKind::String => ConfigValue::String(member.value.decode_to_string()?),
            JsonKind::Number => ConfigValue::Integer(member.value.as_i64()?),
            JsonKind::Boolean => ConfigValue::Boolean(member.value.as_bool()?),
            _ => {
                warn!("DSS: configuration entry {} has an unsupported type", key);
                continue;
            }
        };
        if store.set_value(&key, value).or_not_implemented()?.is_none() {
            warn!("DSS: configuration entry {} not accepted", key);
        }
    }
    Ok(())
}
