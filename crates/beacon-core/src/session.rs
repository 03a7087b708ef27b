//! Advertising session state machine
//!
//! ```text
//!            request_start (radio off)          radio reports On
//!   Idle ─────────────────────────────▶ Enabling ───────────────▶ Advertising
//!    ▲ ▲                                   │                         │
//!    │ └──────── request_stop ─────────────┘                         │
//!    └────────────── request_stop / radio reports TurningOff ────────┘
//! ```
//!
//! Every entry point runs under the session lock, so a restart always stops
//! the previous advertisement before starting the next one. Actions bound on
//! the dispatcher hold only a weak reference back to the session.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tracing::{debug, error, info, warn};

use crate::config::BeaconConfig;
use crate::dispatcher::AdapterStateDispatcher;
use crate::encoder::{encode, AdvertisementPayload, BeaconFormat, UniqueCode};
use crate::radio::{
    AdapterHandle, AdapterState, AdvertiseCallback, AdvertiseFailure, AdvertiseSettings,
    AdvertiserHandle, RadioManager, SharedCallback,
};

// ----------------------------------------------------------------------------
// Session Types
// ----------------------------------------------------------------------------

/// Lifecycle state of the advertising session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingSessionState {
    Idle,
    /// Waiting for the radio to report it is on
    Enabling,
    Advertising,
}

/// Radio handle that was missing when a start was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    Adapter,
    Advertiser,
}

/// Immediate result of [`AdvertisingSession::request_start`].
///
/// Whether the radio actually began transmitting is reported later through
/// the advertise callback and only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Start submitted to the advertiser
    Started,
    /// Radio enable requested; the start resumes once it reports On
    WaitingForRadio,
    /// The adapter cannot run an advertisement
    Unsupported,
    /// A radio handle is missing; nothing was done
    Unavailable(Unavailable),
}

struct ActiveAdvertisement {
    format: BeaconFormat,
    code: UniqueCode,
    payload: AdvertisementPayload,
    advertiser: Arc<dyn AdvertiserHandle>,
}

struct Phase {
    state: AdvertisingSessionState,
    pending: Option<(BeaconFormat, UniqueCode)>,
    active: Option<ActiveAdvertisement>,
}

// ----------------------------------------------------------------------------
// Advertise Callback
// ----------------------------------------------------------------------------

/// The single callback instance handed to every start and stop
struct SessionCallback;

impl AdvertiseCallback for SessionCallback {
    fn on_start_success(&self, settings_in_effect: &AdvertiseSettings) {
        info!("Advertising started: {:?}", settings_in_effect);
    }

    fn on_start_failure(&self, failure: AdvertiseFailure) {
        error!("Advertising failed to start: {}", failure);
    }
}

// ----------------------------------------------------------------------------
// Session
// ----------------------------------------------------------------------------

struct SessionInner {
    this: Weak<SessionInner>,
    radio: Arc<dyn RadioManager>,
    dispatcher: AdapterStateDispatcher,
    config: BeaconConfig,
    callback: OnceLock<SharedCallback>,
    phase: Mutex<Phase>,
}

/// Coordinates enabling the radio and starting or stopping one advertisement.
///
/// Construct one per process at the composition root and share it by
/// cloning.
#[derive(Clone)]
pub struct AdvertisingSession {
    inner: Arc<SessionInner>,
}

impl AdvertisingSession {
    pub fn new(
        radio: Arc<dyn RadioManager>,
        dispatcher: AdapterStateDispatcher,
        config: BeaconConfig,
    ) -> Self {
        let inner = Arc::new_cyclic(|this| SessionInner {
            this: this.clone(),
            radio,
            dispatcher,
            config,
            callback: OnceLock::new(),
            phase: Mutex::new(Phase {
                state: AdvertisingSessionState::Idle,
                pending: None,
                active: None,
            }),
        });
        Self { inner }
    }

    /// Start advertising `format`, stopping any current advertisement first
    pub fn request_start(&self, format: BeaconFormat, code: UniqueCode) -> StartOutcome {
        info!("Start requested: {} code {}", format, code);
        let mut phase = self.inner.phase();

        match phase.state {
            AdvertisingSessionState::Advertising => self.inner.stop_locked(&mut phase),
            AdvertisingSessionState::Enabling => self.inner.cancel_enabling(&mut phase),
            AdvertisingSessionState::Idle => {}
        }

        self.inner.start_locked(phase, format, code)
    }

    /// Stop the current advertisement, or abandon a pending start
    pub fn request_stop(&self) {
        info!("Stop requested");
        let mut phase = self.inner.phase();

        match phase.state {
            AdvertisingSessionState::Advertising => self.inner.stop_locked(&mut phase),
            AdvertisingSessionState::Enabling => self.inner.cancel_enabling(&mut phase),
            AdvertisingSessionState::Idle => debug!("Not advertising, nothing to stop"),
        }
    }

    pub fn state(&self) -> AdvertisingSessionState {
        self.inner.phase().state
    }

    /// Payload of the advertisement currently running
    pub fn active_payload(&self) -> Option<AdvertisementPayload> {
        self.inner.phase().active.as_ref().map(|a| a.payload.clone())
    }

    /// Format and code of the advertisement currently running
    pub fn active_format(&self) -> Option<(BeaconFormat, UniqueCode)> {
        self.inner.phase().active.as_ref().map(|a| (a.format, a.code))
    }

    pub fn dispatcher(&self) -> &AdapterStateDispatcher {
        &self.inner.dispatcher
    }
}

impl std::fmt::Debug for AdvertisingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvertisingSession")
            .field("state", &self.state())
            .field("active", &self.active_format())
            .finish()
    }
}

impl SessionInner {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The one long-lived callback, created on first use
    fn callback(&self) -> SharedCallback {
        self.callback
            .get_or_init(|| {
                debug!("Advertise callback created");
                let callback: SharedCallback = Arc::new(SessionCallback);
                callback
            })
            .clone()
    }

    /// Check the radio and either start now or wait for it to come up
    fn start_locked(
        &self,
        mut phase: MutexGuard<'_, Phase>,
        format: BeaconFormat,
        code: UniqueCode,
    ) -> StartOutcome {
        let Some(adapter) = self.radio.adapter() else {
            error!("Unable to access the radio adapter");
            phase.state = AdvertisingSessionState::Idle;
            return StartOutcome::Unavailable(Unavailable::Adapter);
        };

        if adapter.is_enabled() {
            if !adapter.is_multi_advertisement_supported() {
                warn!("Advertising is not supported by this adapter");
                phase.state = AdvertisingSessionState::Idle;
                return StartOutcome::Unsupported;
            }
            return self.begin_advertising(&mut phase, adapter.as_ref(), format, code);
        }

        phase.state = AdvertisingSessionState::Enabling;
        phase.pending = Some((format, code));
        let this = self.this.clone();
        self.dispatcher.register(AdapterState::On, move || {
            if let Some(inner) = this.upgrade() {
                inner.on_radio_ready();
            }
        });
        drop(phase);

        let accepted = adapter.enable();
        warn!(
            "Radio is off, requested enable (accepted: {}); waiting for it to report on",
            accepted
        );
        StartOutcome::WaitingForRadio
    }

    fn begin_advertising(
        &self,
        phase: &mut Phase,
        adapter: &dyn AdapterHandle,
        format: BeaconFormat,
        code: UniqueCode,
    ) -> StartOutcome {
        let Some(advertiser) = adapter.advertiser() else {
            error!("Unable to access the LE advertiser");
            phase.state = AdvertisingSessionState::Idle;
            return StartOutcome::Unavailable(Unavailable::Advertiser);
        };

        let payload = encode(format, code, &self.config.device_identifier);
        debug!("Submitting advertisement: {}", payload);
        advertiser.start_advertising(&self.config.settings, &payload, self.callback());

        phase.state = AdvertisingSessionState::Advertising;
        phase.active = Some(ActiveAdvertisement {
            format,
            code,
            payload,
            advertiser,
        });

        let this = self.this.clone();
        self.dispatcher.register(AdapterState::TurningOff, move || {
            if let Some(inner) = this.upgrade() {
                inner.on_radio_turning_off();
            }
        });
        StartOutcome::Started
    }

    fn stop_locked(&self, phase: &mut Phase) {
        if let Some(active) = phase.active.take() {
            active.advertiser.stop_advertising(&self.callback());
            info!("Stopped {} advertisement", active.format);
        }
        self.dispatcher.unregister(AdapterState::TurningOff);
        phase.state = AdvertisingSessionState::Idle;
    }

    fn cancel_enabling(&self, phase: &mut Phase) {
        debug!("Abandoning pending start {:?}", phase.pending);
        phase.pending = None;
        self.dispatcher.unregister(AdapterState::On);
        phase.state = AdvertisingSessionState::Idle;
    }

    fn on_radio_ready(&self) {
        info!("Radio is on and ready for use");
        self.dispatcher.unregister(AdapterState::On);

        let mut phase = self.phase();
        if phase.state != AdvertisingSessionState::Enabling {
            debug!("Radio ready but no start is pending");
            return;
        }
        let Some((format, code)) = phase.pending.take() else {
            phase.state = AdvertisingSessionState::Idle;
            return;
        };
        let outcome = self.start_locked(phase, format, code);
        info!("Deferred start finished: {:?}", outcome);
    }

    fn on_radio_turning_off(&self) {
        info!("Radio is turning off, stopping advertising");
        let mut phase = self.phase();
        if phase.state == AdvertisingSessionState::Advertising {
            self.stop_locked(&mut phase);
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let phase = self.phase.get_mut().unwrap_or_else(PoisonError::into_inner);
        match phase.state {
            AdvertisingSessionState::Advertising => {
                let active = phase.active.take();
                if let (Some(active), Some(callback)) = (active, self.callback.get()) {
                    active.advertiser.stop_advertising(callback);
                }
                self.dispatcher.unregister(AdapterState::TurningOff);
            }
            AdvertisingSessionState::Enabling => self.dispatcher.unregister(AdapterState::On),
            AdvertisingSessionState::Idle => {}
        }
    }
}
