//! In-memory persistence adapter.
//!
//! Implements [`ConfigStore`], [`StateStore`] and [`RegistrationStore`] on
//! plain maps.  Nothing survives a restart, so this is for host runs and
//! tests only.
//!
//! # Security
//!
//! - Values (PIN, key material, registration token) are held in plaintext.
//! - Nothing here is logged beyond key names.

use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result};
use crate::provisionee::ports::{
    ConfigStore, ConfigValue, RegistrationDetails, RegistrationStore, RegistrationToken, StateStore,
};
use crate::provisionee::{ProvisioneeState, RegistrationState};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, ConfigValue>,
    /// Keys `set_value` refuses with `NotImplemented`.
    read_only: Vec<String>,
    state: ProvisioneeState,
    /// Every state written, oldest first.
    state_history: Vec<ProvisioneeState>,
    token: Option<RegistrationToken>,
    registration_state: Option<RegistrationState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_value(mut self, key: &str, value: ConfigValue) -> Self {
        self.values.insert(String::from(key), value);
        self
    }

    /// Refuse later writes to `key`.
    #[must_use]
    pub fn with_read_only(mut self, key: &str) -> Self {
        self.read_only.push(String::from(key));
        self
    }

    pub fn value(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn state_history(&self) -> &[ProvisioneeState] {
        &self.state_history
    }

    pub fn registration_token(&self) -> Option<&RegistrationToken> {
        self.token.as_ref()
    }

    /// Pin the registration state instead of deriving it from the token.
    pub fn set_registration_state(&mut self, state: RegistrationState) {
        self.registration_state = Some(state);
    }
}

impl ConfigStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<ConfigValue> {
        self.values.get(key).cloned().ok_or(Error::NotImplemented)
    }

    fn set_value(&mut self, key: &str, value: ConfigValue) -> Result<()> {
        if self.read_only.iter().any(|k| k == key) {
            return Err(Error::NotImplemented);
        }
        debug!("store: {} updated", key);
        self.values.insert(String::from(key), value);
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn get_state(&self) -> Result<ProvisioneeState> {
        Ok(self.state)
    }

    fn set_state(&mut self, state: ProvisioneeState) -> Result<()> {
        self.state = state;
        self.state_history.push(state);
        Ok(())
    }
}

impl RegistrationStore for MemoryStore {
    fn set_registration_token(&mut self, token: RegistrationToken) -> Result<()> {
        self.token = Some(token);
        Ok(())
    }

    /// Without a pinned state: IN_PROGRESS once a token is held.
    fn get_registration_details(&self) -> Result<RegistrationDetails> {
        let state = self.registration_state.unwrap_or(if self.token.is_some() {
            RegistrationState::InProgress
        } else {
            RegistrationState::NotRegistered
        });
        Ok(RegistrationDetails {
            state,
            token: self.token.as_ref().map(|t| t.token.clone()),
            http_code: None,
        })
    }
}
