//! Provisionee task: drives one device from NOT_PROVISIONED to DONE.
//!
//! ```text
//!   loop {
//!       client.can_proceed()?      ── false ─▶ stop (Ok)
//!       state = store.get_state()  ── terminal ─▶ stop (Ok)
//!       run state:
//!           operation ─▶ report(SUCCESS | FAILURE) ─▶ set_state(next)
//!       cloud canProceed           ── false ─▶ stop (Ok)
//!   }
//! ```
//!
//! Every protocol state reports its outcome, failed or not, so the cloud's
//! view stays current.  The state is persisted only after a report has
//! been answered.

use log::{debug, error, info, warn};

use crate::config::{ProvisioneeConfig, ReportPolicy};
use crate::dss::{
    Backlog, DssClient, HttpTransport, ReportRequest, ReportResponse, ReportResult, Salt,
};
use crate::error::{Error, Result, ResultExt};
use crate::wifi::{WifiConfiguration, WifiDriver, WifiManager};

use super::encoded_network::compute_encoded_network;
use super::ports::{ConfigStore, Platform, ProvisioneeClient, RegistrationStore, ScanPostProgress};
use super::setup_network::{
    connect_to_setup_network, disconnect_from_setup_network, fallback_setup_network,
};
use super::user_networks::UserNetworks;
use super::{ProvisioneeState, RegistrationState};

/// Whether the main loop keeps going after a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// The cloud withheld continuation.
    Halt,
}

pub struct ProvisioneeTask<T: HttpTransport, D: WifiDriver> {
    dss: DssClient<T>,
    wifi: WifiManager<D>,
    report_policy: ReportPolicy,
    user_networks: UserNetworks,
    salt: Salt,
    /// Setup network in use, once one was chosen.
    setup_network: Option<WifiConfiguration>,
    /// Connection attempts already sent in a report.
    reported_attempts: usize,
}

impl<T: HttpTransport, D: WifiDriver> ProvisioneeTask<T, D> {
    pub fn new(
        transport: T,
        driver: D,
        config: &ProvisioneeConfig,
        store: &impl ConfigStore,
    ) -> Result<Self> {
        Ok(Self {
            dss: DssClient::new(transport, config, store)?,
            wifi: WifiManager::new(driver).with_wait_bounds(config.scan_wait_ms, config.connect_wait_ms),
            report_policy: config.report_local_failures,
            user_networks: UserNetworks::new(),
            salt: Salt::new(),
            setup_network: None,
            reported_attempts: 0,
        })
    }

    pub fn dss(&self) -> &DssClient<T> {
        &self.dss
    }

    pub fn wifi(&self) -> &WifiManager<D> {
        &self.wifi
    }

    pub fn wifi_mut(&mut self) -> &mut WifiManager<D> {
        &mut self.wifi
    }

    pub fn user_networks(&self) -> &UserNetworks {
        &self.user_networks
    }

    pub fn setup_network(&self) -> Option<&WifiConfiguration> {
        self.setup_network.as_ref()
    }

    /// Run the state machine until DONE, a client or cloud stop, or an
    /// error.  Stops are `Ok`; retrying a failed run is up to the caller.
    pub fn run(&mut self, platform: &mut impl Platform) -> Result<()> {
        info!("provisionee: task started");
        platform.set_state(ProvisioneeState::NotProvisioned)?;

        let encoded = match compute_encoded_network(platform) {
            Ok(network) => {
                debug!("provisionee: encoded setup network available");
                Some(network)
            }
            Err(e) => {
                debug!("provisionee: no encoded setup network ({})", e);
                None
            }
        };

        loop {
            if !platform.can_proceed()? {
                info!("provisionee: task stopped by client");
                break;
            }

            let state = platform.get_state()?;
            if state.is_terminal() {
                info!("provisionee: reached terminal state {}", state);
                break;
            }

            debug!("provisionee: executing {}", state);
            if self.execute_state(platform, state, encoded.as_ref())? == Flow::Halt {
                info!("provisionee: task stopped by cloud in {}", state);
                break;
            }
        }

        info!("provisionee: task ended");
        Ok(())
    }

    fn execute_state(
        &mut self,
        platform: &mut impl Platform,
        state: ProvisioneeState,
        encoded: Option<&WifiConfiguration>,
    ) -> Result<Flow> {
        match state {
            ProvisioneeState::NotProvisioned => {
                platform.set_state(ProvisioneeState::ConnectingToSetupNetwork)?;
                Ok(Flow::Continue)
            }
            ProvisioneeState::ConnectingToSetupNetwork => {
                self.join_setup_network(platform, encoded)?;
                platform.set_state(ProvisioneeState::StartProvisioning)?;
                Ok(Flow::Continue)
            }
            ProvisioneeState::StartProvisioning => {
                let outcome = self.dss.start_provisioning_session(platform).map(|started| {
                    self.salt = started.salt;
                    started.can_proceed
                });
                self.conclude(platform, state, outcome, true)
            }
            ProvisioneeState::StartPinBasedSetup => {
                let outcome = self.dss.start_pin_based_setup(platform, &self.salt);
                self.conclude(platform, state, outcome, false)
            }
            ProvisioneeState::ComputeConfiguration => {
                let outcome = self.dss.compute_configuration_data(platform);
                self.conclude(platform, state, outcome, false)
            }
            ProvisioneeState::PostWifiScanData => {
                let outcome = self.post_scan_data(platform);
                self.conclude(platform, state, outcome, false)
            }
            ProvisioneeState::GetWifiList => {
                let outcome = self.get_credentials(platform);
                self.conclude(platform, state, outcome, false)
            }
            ProvisioneeState::ConnectingToUserNetwork => {
                let outcome = self.join_user_network()?;
                self.conclude(platform, state, outcome.map(|()| true), true)
            }
            ProvisioneeState::ConnectedToUserNetwork => self.conclude(platform, state, Ok(true), false),
            ProvisioneeState::Done | ProvisioneeState::Failed => Ok(Flow::Halt),
        }
    }

    // ── Setup and user networks ─────────────────────────────────

    /// Encoded network first, then the fallback.  A failed fallback is
    /// logged and the task moves on regardless.
    fn join_setup_network(
        &mut self,
        client: &mut impl ProvisioneeClient,
        encoded: Option<&WifiConfiguration>,
    ) -> Result<()> {
        if let Some(network) = encoded {
            match connect_to_setup_network(&mut self.wifi, network) {
                Ok(()) => {
                    info!("provisionee: on the encoded setup network");
                    self.setup_network = Some(network.clone());
                    self.dss.set_on_setup_network(true);
                    return Ok(());
                }
                Err(e) => warn!("provisionee: encoded setup network failed: {}", e),
            }
        }

        let fallback = fallback_setup_network(client)?;
        if let Err(e) = connect_to_setup_network(&mut self.wifi, &fallback) {
            error!("provisionee: fallback setup network failed: {}", e);
        }
        self.setup_network = Some(fallback);
        self.dss.set_on_setup_network(false);
        Ok(())
    }

    /// Leave the setup network and try the user networks.  On failure the
    /// setup network is rejoined so the failure can still be reported.
    /// The outer error is local; the inner one is the reportable outcome.
    fn join_user_network(&mut self) -> Result<Result<()>> {
        disconnect_from_setup_network(&mut self.wifi, self.setup_network.as_ref())?;
        let on_setup_network = self.dss.on_setup_network();
        self.dss.set_on_setup_network(false);

        let outcome = self.user_networks.connect(&mut self.wifi);
        if let Err(e) = outcome {
            error!("provisionee: no user network joined ({}), rejoining setup network", e);
            if let Some(network) = &self.setup_network {
                connect_to_setup_network(&mut self.wifi, network)?;
            }
            self.dss.set_on_setup_network(on_setup_network);
        }
        Ok(outcome)
    }

    // ── Loops ─────────────────────────────────────────────────

    /// Post scan results until the client hook says stop.  `Ok(false)` when
    /// the cloud withholds continuation; no post at all is an error.
    fn post_scan_data(&mut self, platform: &mut impl Platform) -> Result<bool> {
        self.wifi.scan()?;

        let wifi = &self.wifi;
        let mut results = Backlog::new((0..).map_while(|i| wifi.scan_result(i).ok().flatten()));
        let mut total_credentials_found = 0;
        let mut all_credentials_found = false;
        let mut outcome = Ok(true);
        let mut posted = false;

        for sequence in 1.. {
            let progress = ScanPostProgress {
                sequence,
                total_credentials_found,
                all_credentials_found,
                unposted_results: results.has_more(),
            };
            if !platform.can_post_wifi_scan_data(&progress)? {
                debug!("provisionee: done posting scan data");
                break;
            }
            posted = true;

            match self.dss.post_wifi_scan_data(platform, sequence, &mut results) {
                Ok(response) if !response.can_proceed => return Ok(false),
                Ok(response) => {
                    total_credentials_found = response.total_credentials_found;
                    all_credentials_found = response.all_credentials_found;
                    debug!("provisionee: {} credentials found so far", total_credentials_found);
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        if !posted {
            error!("provisionee: no scan data posted");
            return Err(Error::Failed("no scan data posted"));
        }
        outcome
    }

    /// Fetch credentials until the client hook says stop.  Every entry
    /// lands in the user-network list.
    fn get_credentials(&mut self, platform: &mut impl Platform) -> Result<bool> {
        let mut all_returned = false;

        for sequence in 1.. {
            if !platform.can_get_wifi_credentials(sequence, all_returned)? {
                debug!("provisionee: done getting credentials");
                break;
            }

            let networks = &mut self.user_networks;
            let returned = self.dss.get_wifi_credentials(platform, sequence, |network| {
                networks.add(network);
                Ok(())
            })?;
            if !returned.can_proceed {
                return Ok(false);
            }
            all_returned = returned.all_credentials_returned;
        }

        info!("provisionee: {} user networks to try", self.user_networks.len());
        Ok(true)
    }

    // ── Reporting ─────────────────────────────────────────────

    /// Report a state's outcome and move to the state the cloud names.
    /// `Ok(false)` from the operation stops before reporting.
    fn conclude(
        &mut self,
        platform: &mut impl Platform,
        state: ProvisioneeState,
        outcome: Result<bool>,
        with_attempts: bool,
    ) -> Result<Flow> {
        match outcome {
            Ok(false) => return Ok(Flow::Halt),
            Err(e) if !self.is_reportable(e) => {
                error!("provisionee: {} failed locally: {}", state, e);
                return Err(e);
            }
            Err(e) => warn!("provisionee: {} failed: {}", state, e),
            Ok(true) => {}
        }

        let request = ReportRequest {
            state,
            result: ReportResult::of(&outcome),
            registration: registration_state(platform)?,
        };
        let response = self.report(platform, request, with_attempts)?;
        if !response.can_proceed {
            if let Some(reason) = &response.reason {
                info!("provisionee: cloud stopped the task: {}", reason);
            }
            return Ok(Flow::Halt);
        }

        platform.set_state(response.next_state)?;
        Ok(Flow::Continue)
    }

    fn is_reportable(&self, e: Error) -> bool {
        match self.report_policy {
            ReportPolicy::Always => true,
            ReportPolicy::ProtocolOnly => !matches!(e, Error::Overrun | Error::Timeout),
        }
    }

    /// Attempts that did not fit stay unreported and lead the next report
    /// that carries attempts.
    fn report(
        &mut self,
        platform: &mut impl Platform,
        request: ReportRequest,
        with_attempts: bool,
    ) -> Result<ReportResponse> {
        if !with_attempts {
            return self.dss.report(platform, request, &mut Backlog::new(core::iter::empty()));
        }

        let wifi = &self.wifi;
        let first = self.reported_attempts;
        let mut attempts =
            Backlog::new((first..).map_while(|i| wifi.connection_attempt(i).ok().flatten()));
        let response = self.dss.report(platform, request, &mut attempts);
        self.reported_attempts = first + attempts.consumed();
        response
    }
}

/// Registration state from the platform; a store without one reports
/// NOT_REGISTERED.
fn registration_state(store: &impl RegistrationStore) -> Result<RegistrationState> {
    Ok(store
        .get_registration_details()
        .or_not_implemented()?
        .map(|details| details.state)
        .unwrap_or_default())
}
