//! Wi-Fi manager.
//!
//! Owns the pending station profile, the scan cache and the ring of recent
//! connection attempts.  Each of those is behind its own lock because the
//! driver updates them from its own context while the task is blocked.
//!
//! `scan()` and `connect()` block on a completion signal that the driver
//! raises through [`WifiEvents`].  No lock is held while waiting.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{info, warn};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::driver::{ScanRequest, WifiDriver, WifiEvents};
use super::{
    ConnectionDetails, ConnectionState, ErrorDetails, MAX_CONNECTION_ATTEMPTS, MAX_SCAN_RESULTS,
    ScanResult, WifiConfiguration,
};
use crate::error::{Error, Result};

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub(super) struct ScanCache {
    pub(super) results: heapless::Vec<ScanResult, MAX_SCAN_RESULTS>,
    valid: bool,
}

#[derive(Default)]
pub(super) struct Station {
    profile: Option<WifiConfiguration>,
    pub(super) state: ConnectionState,
}

struct Attempt {
    profile: WifiConfiguration,
    details: ConnectionDetails,
}

pub(super) struct Shared {
    pub(super) scan: Mutex<ScanCache>,
    pub(super) station: Mutex<Station>,
    attempts: Mutex<heapless::Vec<Attempt, MAX_CONNECTION_ATTEMPTS>>,
    pub(super) scan_signal: Signal<CriticalSectionRawMutex, bool>,
    pub(super) link_signal: Signal<CriticalSectionRawMutex, bool>,
}

impl Shared {
    fn new() -> Self {
        Self {
            scan: Mutex::new(ScanCache::default()),
            station: Mutex::new(Station::default()),
            attempts: Mutex::new(heapless::Vec::new()),
            scan_signal: Signal::new(),
            link_signal: Signal::new(),
        }
    }
}

/// Block until `signal` fires.  `wait_ms == 0` waits forever.
fn wait_for(signal: &Signal<CriticalSectionRawMutex, bool>, wait_ms: u32) -> Result<bool> {
    if wait_ms == 0 {
        return Ok(futures_lite::future::block_on(signal.wait()));
    }
    let deadline = Instant::now() + Duration::from_millis(u64::from(wait_ms));
    loop {
        if let Some(value) = signal.try_take() {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

// ───────────────────────────────────────────────────────────────
// WifiManager
// ───────────────────────────────────────────────────────────────

pub struct WifiManager<D: WifiDriver> {
    driver: D,
    events: WifiEvents,
    scan_wait_ms: u32,
    connect_wait_ms: u32,
}

impl<D: WifiDriver> WifiManager<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            events: WifiEvents { shared: Arc::new(Shared::new()) },
            scan_wait_ms: 0,
            connect_wait_ms: 0,
        }
    }

    /// Bound the blocking waits (milliseconds, 0 = unbounded).
    pub fn with_wait_bounds(mut self, scan_wait_ms: u32, connect_wait_ms: u32) -> Self {
        self.scan_wait_ms = scan_wait_ms;
        self.connect_wait_ms = connect_wait_ms;
        self
    }

    /// Handle for drivers that report events outside a call.
    pub fn events(&self) -> WifiEvents {
        self.events.clone()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    fn shared(&self) -> &Shared {
        &self.events.shared
    }

    // ── Scanning ──────────────────────────────────────────────

    /// Scan unless the cache is already valid.  Returns the number of
    /// cached results.
    pub fn scan(&mut self) -> Result<usize> {
        {
            let mut cache = self.shared().scan.lock()?;
            if cache.valid {
                return Ok(cache.results.len());
            }
            cache.results.clear();
        }

        self.shared().scan_signal.reset();
        self.driver.scan(&ScanRequest::default(), &self.events)?;
        if !wait_for(&self.shared().scan_signal, self.scan_wait_ms)? {
            warn!("WiFi: scan failed");
            return Err(Error::Failed("wifi scan"));
        }

        let mut cache = self.shared().scan.lock()?;
        cache.valid = true;
        info!("WiFi: scan found {} networks", cache.results.len());
        Ok(cache.results.len())
    }

    pub fn reset_scan_results(&self) -> Result<()> {
        let mut cache = self.shared().scan.lock()?;
        cache.results.clear();
        cache.valid = false;
        Ok(())
    }

    /// Result at `index`, `None` past the end.
    pub fn scan_result(&self, index: usize) -> Result<Option<ScanResult>> {
        Ok(self.shared().scan.lock()?.results.get(index).cloned())
    }

    pub fn scan_result_count(&self) -> Result<usize> {
        Ok(self.shared().scan.lock()?.results.len())
    }

    // ── Credentials ───────────────────────────────────────────

    pub fn load_credentials(&self, config: WifiConfiguration) -> Result<()> {
        self.shared().station.lock()?.profile = Some(config);
        Ok(())
    }

    pub fn get_credentials(&self) -> Result<Option<WifiConfiguration>> {
        Ok(self.shared().station.lock()?.profile.clone())
    }

    pub fn clear_credentials(&self) -> Result<()> {
        self.shared().station.lock()?.profile = None;
        Ok(())
    }

    // ── Connection ────────────────────────────────────────────

    /// Connect with the loaded profile and block until the driver reports
    /// the outcome.  Returns the resulting state; driver errors propagate.
    /// The attempt is recorded either way.
    pub fn connect(&mut self) -> Result<ConnectionState> {
        let profile = self.get_credentials()?.ok_or(Error::Failed("no wifi credentials"))?;

        self.driver.disconnect()?;
        self.shared().station.lock()?.state = ConnectionState::Unauthenticated;
        self.shared().link_signal.reset();

        info!("WiFi: connecting to '{}'", String::from_utf8_lossy(&profile.ssid));
        let outcome = self
            .driver
            .connect(&profile, &self.events)
            .and_then(|()| wait_for(&self.shared().link_signal, self.connect_wait_ms));

        let state = match outcome {
            Ok(true) => ConnectionState::Associated,
            Ok(false) | Err(_) => ConnectionState::Failed,
        };
        if let Ok(mut station) = self.shared().station.lock() {
            station.state = state;
        }
        self.record_attempt(&profile, state);

        match outcome {
            Ok(true) => info!("WiFi: connected"),
            Ok(false) => warn!("WiFi: connection failed"),
            Err(e) => {
                warn!("WiFi: connect error: {}", e);
                return Err(e);
            }
        }
        Ok(state)
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.driver.disconnect()?;
        self.shared().station.lock()?.state = ConnectionState::Disconnected;
        info!("WiFi: disconnected");
        Ok(())
    }

    /// Current profile and state.  A stale ASSOCIATED is reported as
    /// DISCONNECTED when the driver says the link is down.
    pub fn get_connection_details(&self) -> Result<ConnectionDetails> {
        let link_up = self.driver.is_link_up()?;
        let station = self.shared().station.lock()?;
        let mut details = ConnectionDetails {
            state: station.state,
            ..ConnectionDetails::default()
        };
        if let Some(profile) = &station.profile {
            details.ssid.clone_from(&profile.ssid);
            details.security = profile.security;
        }
        if details.state == ConnectionState::Associated && !link_up {
            details.state = ConnectionState::Disconnected;
        }
        Ok(details)
    }

    // ── Attempts ring ─────────────────────────────────────────

    /// Best-effort: a poisoned lock is logged, never surfaced.
    fn record_attempt(&self, profile: &WifiConfiguration, state: ConnectionState) {
        let details = ConnectionDetails {
            ssid: profile.ssid.clone(),
            security: profile.security,
            state,
            error: (state == ConnectionState::Failed).then_some(ErrorDetails::CONNECT_FAILED),
        };
        let Ok(mut attempts) = self.shared().attempts.lock() else {
            warn!("WiFi: attempts lock poisoned, attempt not recorded");
            return;
        };
        if let Some(existing) = attempts.iter_mut().find(|a| a.profile == *profile) {
            existing.details = details;
            return;
        }
        let attempt = Attempt { profile: profile.clone(), details };
        if let Err(attempt) = attempts.push(attempt) {
            if let Some(last) = attempts.last_mut() {
                *last = attempt;
            }
        }
    }

    /// Attempt at `index`, `None` once `index` reaches the recorded count.
    pub fn connection_attempt(&self, index: usize) -> Result<Option<ConnectionDetails>> {
        Ok(self.shared().attempts.lock()?.get(index).map(|a| a.details.clone()))
    }

    pub fn connection_attempt_count(&self) -> Result<usize> {
        Ok(self.shared().attempts.lock()?.len())
    }

    pub fn clear_connection_attempts(&self) -> Result<()> {
        self.shared().attempts.lock()?.clear();
        Ok(())
    }
}
