//! Interfaces the platform radio stack provides to the core
//!
//! Everything here is synchronous and fire-and-forget: calls return
//! immediately and completions arrive later, on whatever context the
//! platform delivers them on, through [`AdvertiseCallback`] or an
//! [`AdapterStateSink`].

use std::fmt;
use std::sync::Arc;

use crate::encoder::AdvertisementPayload;
use crate::error::BeaconError;

// ----------------------------------------------------------------------------
// Adapter State
// ----------------------------------------------------------------------------

/// Power state reported by the radio adapter.
///
/// Discriminants are the platform's integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum AdapterState {
    Off = 10,
    TurningOn = 11,
    On = 12,
    TurningOff = 13,
}

impl AdapterState {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for AdapterState {
    type Error = BeaconError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            10 => Ok(Self::Off),
            11 => Ok(Self::TurningOn),
            12 => Ok(Self::On),
            13 => Ok(Self::TurningOff),
            other => Err(BeaconError::UnknownAdapterState(other)),
        }
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::TurningOn => "turning-on",
            Self::On => "on",
            Self::TurningOff => "turning-off",
        };
        write!(f, "{}({})", name, self.code())
    }
}

// ----------------------------------------------------------------------------
// Advertising Settings
// ----------------------------------------------------------------------------

/// Advertising interval trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseMode {
    LowPower,
    Balanced,
    LowLatency,
}

/// Transmit power level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

impl TxPowerLevel {
    /// Approximate radiated power in dBm
    pub fn dbm(self) -> i16 {
        match self {
            Self::UltraLow => -21,
            Self::Low => -15,
            Self::Medium => -7,
            Self::High => 1,
        }
    }
}

/// Radio settings for one advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertiseSettings {
    pub mode: AdvertiseMode,
    pub tx_power: TxPowerLevel,
    pub connectable: bool,
    /// Milliseconds until the radio stops on its own; `0` advertises until stopped
    pub timeout_ms: u32,
}

impl AdvertiseSettings {
    /// Low power, medium transmit power, non-connectable, no timeout
    pub const fn beacon() -> Self {
        Self {
            mode: AdvertiseMode::LowPower,
            tx_power: TxPowerLevel::Medium,
            connectable: false,
            timeout_ms: 0,
        }
    }
}

impl Default for AdvertiseSettings {
    fn default() -> Self {
        Self::beacon()
    }
}

// ----------------------------------------------------------------------------
// Advertiser Completion
// ----------------------------------------------------------------------------

/// Start failure reported by the platform advertiser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseFailure {
    DataTooLarge,
    TooManyAdvertisers,
    AlreadyStarted,
    InternalError,
    FeatureUnsupported,
    Other(i32),
}

impl AdvertiseFailure {
    pub fn code(self) -> i32 {
        match self {
            Self::DataTooLarge => 1,
            Self::TooManyAdvertisers => 2,
            Self::AlreadyStarted => 3,
            Self::InternalError => 4,
            Self::FeatureUnsupported => 5,
            Self::Other(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::DataTooLarge,
            2 => Self::TooManyAdvertisers,
            3 => Self::AlreadyStarted,
            4 => Self::InternalError,
            5 => Self::FeatureUnsupported,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for AdvertiseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::DataTooLarge => "data too large",
            Self::TooManyAdvertisers => "too many advertisers",
            Self::AlreadyStarted => "already started",
            Self::InternalError => "internal error",
            Self::FeatureUnsupported => "feature unsupported",
            Self::Other(_) => "unknown error",
        };
        write!(f, "{} (code {})", reason, self.code())
    }
}

/// Receives the asynchronous outcome of a start request.
///
/// The advertiser identifies an advertisement by the callback instance that
/// started it, so the same `Arc` must be handed to
/// [`AdvertiserHandle::stop_advertising`].
pub trait AdvertiseCallback: Send + Sync {
    fn on_start_success(&self, settings_in_effect: &AdvertiseSettings);

    fn on_start_failure(&self, failure: AdvertiseFailure);
}

/// Shared advertise callback
pub type SharedCallback = Arc<dyn AdvertiseCallback>;

/// Identity key of a callback instance, for advertisers that track
/// advertisements per callback
pub fn callback_key(callback: &SharedCallback) -> usize {
    Arc::as_ptr(callback) as *const () as usize
}

// ----------------------------------------------------------------------------
// Radio Handles
// ----------------------------------------------------------------------------

/// Entry point to the platform radio stack
pub trait RadioManager: Send + Sync {
    fn adapter(&self) -> Option<Arc<dyn AdapterHandle>>;
}

/// A local radio adapter
pub trait AdapterHandle: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Ask the platform to power the adapter on. Completion is reported as
    /// an [`AdapterState::On`] event.
    fn enable(&self) -> bool;

    fn is_multi_advertisement_supported(&self) -> bool;

    fn advertiser(&self) -> Option<Arc<dyn AdvertiserHandle>>;
}

/// Low-energy advertiser of an adapter
pub trait AdvertiserHandle: Send + Sync {
    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        payload: &AdvertisementPayload,
        callback: SharedCallback,
    );

    fn stop_advertising(&self, callback: &SharedCallback);
}

// ----------------------------------------------------------------------------
// Event Source
// ----------------------------------------------------------------------------

/// Kinds of platform events the core subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AdapterStateChanged,
}

/// Opaque token returned by [`EventSource::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Receiver of adapter-state events for one subscription
pub type AdapterStateSink = Arc<dyn Fn(AdapterState) + Send + Sync>;

/// Push-based source of platform events.
///
/// Sinks may be invoked from any thread but never from inside `subscribe`
/// or `unsubscribe` themselves.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, kind: EventKind, sink: AdapterStateSink) -> SubscriptionHandle;

    fn unsubscribe(&self, handle: SubscriptionHandle);
}
