//! Linux radio backend using bluer (BlueZ)
//!
//! BlueZ is asynchronous while the core's radio interfaces are
//! fire-and-forget. Enable, start and stop requests are queued on one
//! channel and executed in order by a command task, which also owns the
//! BlueZ advertisement handles. A monitor task turns adapter property
//! changes into [`AdapterState`] events.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use beacon_core::radio::{
    callback_key, AdapterHandle, AdapterStateSink, AdvertiseMode, AdvertiserHandle, EventKind,
    EventSource, RadioManager, SharedCallback, SubscriptionHandle,
};
use beacon_core::{AdapterState, AdvertiseFailure, AdvertiseSettings, AdvertisementPayload};
use bluer::adv::{Advertisement, AdvertisementHandle, Feature, Type};
use bluer::{AdapterEvent, AdapterProperty};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::BleConfig;
use crate::error::{BleError, Result};

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

enum Command {
    Enable,
    Start {
        key: usize,
        advertisement: Advertisement,
        settings: AdvertiseSettings,
        callback: SharedCallback,
    },
    Stop {
        key: usize,
    },
}

// ----------------------------------------------------------------------------
// Linux Implementation
// ----------------------------------------------------------------------------

struct LinuxShared {
    _session: bluer::Session,
    adapter_name: String,
    device_name: Option<String>,
    powered: AtomicBool,
    advertising_instances: AtomicU8,
    commands: mpsc::UnboundedSender<Command>,
    sinks: Mutex<HashMap<u64, AdapterStateSink>>,
    next_subscription: AtomicU64,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

/// BlueZ-backed radio
#[derive(Clone)]
pub struct LinuxRadio {
    shared: Arc<LinuxShared>,
}

impl LinuxRadio {
    /// Open a BlueZ session and attach to the configured adapter.
    ///
    /// Must be called from within a tokio runtime; the backend's tasks are
    /// spawned on it.
    pub async fn connect(config: &BleConfig) -> Result<Self> {
        let session = bluer::Session::new().await?;

        let adapter = match &config.adapter_name {
            Some(name) => session.adapter(name),
            None => session.default_adapter().await,
        }
        .map_err(|e| BleError::AdapterNotAvailable(e.to_string()))?;

        let powered = adapter.is_powered().await?;
        let instances = if powered {
            supported_instances(&adapter).await
        } else {
            0
        };
        let events = adapter.events().await?;

        let (commands, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_commands(adapter.clone(), receiver));

        let shared = Arc::new(LinuxShared {
            _session: session,
            adapter_name: adapter.name().to_string(),
            device_name: config.device_name.clone(),
            powered: AtomicBool::new(powered),
            advertising_instances: AtomicU8::new(instances),
            commands,
            sinks: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(0),
            monitor: Mutex::new(None),
        });

        let monitor = tokio::spawn(monitor_adapter(
            Arc::downgrade(&shared),
            adapter.clone(),
            events,
        ));
        *shared.monitor() = Some(monitor);

        info!(
            "Linux BLE adapter {} initialized (powered: {}, advertising instances: {})",
            shared.adapter_name, powered, instances
        );
        Ok(Self { shared })
    }

    pub fn adapter_name(&self) -> &str {
        &self.shared.adapter_name
    }

    fn send(&self, command: Command) {
        if self.shared.commands.send(command).is_err() {
            error!("BLE command task for {} has stopped", self.shared.adapter_name);
        }
    }
}

impl LinuxShared {
    fn sinks(&self) -> MutexGuard<'_, HashMap<u64, AdapterStateSink>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn monitor(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, state: AdapterState) {
        let sinks: Vec<_> = self.sinks().values().cloned().collect();
        debug!("Delivering {} to {} subscriber(s)", state, sinks.len());
        for sink in sinks {
            sink(state);
        }
    }
}

impl Drop for LinuxShared {
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor().take() {
            monitor.abort();
        }
    }
}

impl RadioManager for LinuxRadio {
    fn adapter(&self) -> Option<Arc<dyn AdapterHandle>> {
        Some(Arc::new(self.clone()))
    }
}

impl AdapterHandle for LinuxRadio {
    fn is_enabled(&self) -> bool {
        self.shared.powered.load(Ordering::SeqCst)
    }

    fn enable(&self) -> bool {
        self.send(Command::Enable);
        true
    }

    fn is_multi_advertisement_supported(&self) -> bool {
        self.shared.advertising_instances.load(Ordering::SeqCst) > 0
    }

    fn advertiser(&self) -> Option<Arc<dyn AdvertiserHandle>> {
        Some(Arc::new(self.clone()))
    }
}

impl AdvertiserHandle for LinuxRadio {
    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        payload: &AdvertisementPayload,
        callback: SharedCallback,
    ) {
        let advertisement = build_advertisement(settings, payload, self.shared.device_name.clone());
        self.send(Command::Start {
            key: callback_key(&callback),
            advertisement,
            settings: *settings,
            callback,
        });
    }

    fn stop_advertising(&self, callback: &SharedCallback) {
        self.send(Command::Stop {
            key: callback_key(callback),
        });
    }
}

impl EventSource for LinuxRadio {
    fn subscribe(&self, kind: EventKind, sink: AdapterStateSink) -> SubscriptionHandle {
        let id = self.shared.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.shared.sinks().insert(id, sink);
        debug!("Subscription {} added for {:?}", id, kind);
        SubscriptionHandle(id)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.shared.sinks().remove(&handle.0).is_none() {
            warn!("Unknown subscription {:?}", handle);
        }
    }
}

// ----------------------------------------------------------------------------
// Background Tasks
// ----------------------------------------------------------------------------

/// Advertisement handles keyed by the identity of the callback that started them
struct LiveAdvertisements<H> {
    handles: HashMap<usize, H>,
}

impl<H> LiveAdvertisements<H> {
    fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    fn is_live(&self, key: usize) -> bool {
        self.handles.contains_key(&key)
    }

    fn insert(&mut self, key: usize, handle: H) {
        self.handles.insert(key, handle);
    }

    /// Take the handle started with `key`, leaving every other one running
    fn remove(&mut self, key: usize) -> Option<H> {
        self.handles.remove(&key)
    }

    fn len(&self) -> usize {
        self.handles.len()
    }
}

/// Execute radio commands in submission order
async fn run_commands(adapter: bluer::Adapter, mut receiver: mpsc::UnboundedReceiver<Command>) {
    let mut advertisements: LiveAdvertisements<AdvertisementHandle> = LiveAdvertisements::new();

    while let Some(command) = receiver.recv().await {
        match command {
            Command::Enable => match adapter.set_powered(true).await {
                Ok(()) => info!("Requested power on for {}", adapter.name()),
                Err(e) => error!("Failed to power on adapter {}: {}", adapter.name(), e),
            },
            Command::Start {
                key,
                advertisement,
                settings,
                callback,
            } => {
                if advertisements.is_live(key) {
                    callback.on_start_failure(AdvertiseFailure::AlreadyStarted);
                    continue;
                }
                match adapter.advertise(advertisement).await {
                    Ok(handle) => {
                        advertisements.insert(key, handle);
                        callback.on_start_success(&settings);
                    }
                    Err(e) => {
                        error!("BlueZ rejected advertisement: {}", e);
                        callback.on_start_failure(failure_for(&e));
                    }
                }
            }
            Command::Stop { key } => match advertisements.remove(key) {
                Some(handle) => {
                    drop(handle); // Dropping the handle stops advertising
                    info!("Stopped BLE advertising");
                }
                None => debug!("Stop requested for an advertisement that is not running"),
            },
        }
    }

    debug!("BLE command channel closed, releasing {} advertisement(s)", advertisements.len());
}

/// Translate adapter power changes into adapter-state events
async fn monitor_adapter<S>(shared: Weak<LinuxShared>, adapter: bluer::Adapter, events: S)
where
    S: Stream<Item = AdapterEvent> + Send + 'static,
{
    let mut events = Box::pin(events);

    while let Some(event) = events.next().await {
        let AdapterEvent::PropertyChanged(AdapterProperty::Powered(powered)) = event else {
            continue;
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };

        if powered {
            let instances = supported_instances(&adapter).await;
            shared.advertising_instances.store(instances, Ordering::SeqCst);
        }
        shared.powered.store(powered, Ordering::SeqCst);
        for &state in power_states(powered) {
            shared.deliver(state);
        }
    }

    debug!("Adapter event stream for {} ended", adapter.name());
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Adapter states to report for a `Powered` change.
///
/// BlueZ only reports the final power state, so power-off is delivered as
/// TurningOff followed by Off.
fn power_states(powered: bool) -> &'static [AdapterState] {
    if powered {
        &[AdapterState::On]
    } else {
        &[AdapterState::TurningOff, AdapterState::Off]
    }
}

async fn supported_instances(adapter: &bluer::Adapter) -> u8 {
    match adapter.supported_advertising_instances().await {
        Ok(instances) => instances,
        Err(e) => {
            warn!("Unable to query advertising support on {}: {}", adapter.name(), e);
            0
        }
    }
}

fn advertising_interval(mode: AdvertiseMode) -> Duration {
    match mode {
        AdvertiseMode::LowPower => Duration::from_millis(1000),
        AdvertiseMode::Balanced => Duration::from_millis(250),
        AdvertiseMode::LowLatency => Duration::from_millis(100),
    }
}

fn build_advertisement(
    settings: &AdvertiseSettings,
    payload: &AdvertisementPayload,
    device_name: Option<String>,
) -> Advertisement {
    let mut manufacturer_data = BTreeMap::new();
    if let Some(record) = payload.manufacturer() {
        manufacturer_data.insert(record.company_id(), record.data().to_vec());
    }

    let mut system_includes = BTreeSet::new();
    if payload.include_tx_power_level() {
        system_includes.insert(Feature::TxPower);
    }
    let local_name = if payload.include_device_name() {
        if device_name.is_none() {
            system_includes.insert(Feature::LocalName);
        }
        device_name
    } else {
        None
    };

    let interval = advertising_interval(settings.mode);
    Advertisement {
        advertisement_type: if settings.connectable {
            Type::Peripheral
        } else {
            Type::Broadcast
        },
        manufacturer_data,
        system_includes,
        local_name,
        min_interval: Some(interval),
        max_interval: Some(interval),
        tx_power: Some(settings.tx_power.dbm()),
        timeout: (settings.timeout_ms > 0)
            .then(|| Duration::from_millis(u64::from(settings.timeout_ms))),
        ..Default::default()
    }
}

fn failure_for(error: &bluer::Error) -> AdvertiseFailure {
    match error.kind {
        bluer::ErrorKind::AlreadyExists => AdvertiseFailure::AlreadyStarted,
        bluer::ErrorKind::NotSupported => AdvertiseFailure::FeatureUnsupported,
        bluer::ErrorKind::InvalidLength => AdvertiseFailure::DataTooLarge,
        _ => AdvertiseFailure::InternalError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{encode, BeaconFormat, UniqueCode, DEFAULT_DEVICE_IDENTIFIER};

    #[test]
    fn test_power_changes_map_to_adapter_states() {
        assert_eq!(power_states(true), &[AdapterState::On]);
        assert_eq!(
            power_states(false),
            &[AdapterState::TurningOff, AdapterState::Off]
        );
    }

    #[test]
    fn test_bluez_errors_map_to_failures() {
        let failure = |kind| {
            failure_for(&bluer::Error {
                kind,
                message: String::new(),
            })
        };

        assert_eq!(
            failure(bluer::ErrorKind::AlreadyExists),
            AdvertiseFailure::AlreadyStarted
        );
        assert_eq!(
            failure(bluer::ErrorKind::NotSupported),
            AdvertiseFailure::FeatureUnsupported
        );
        assert_eq!(
            failure(bluer::ErrorKind::InvalidLength),
            AdvertiseFailure::DataTooLarge
        );
        assert_eq!(failure(bluer::ErrorKind::Failed), AdvertiseFailure::InternalError);
    }

    #[test]
    fn test_stop_releases_only_its_own_advertisement() {
        let mut live = LiveAdvertisements::new();
        live.insert(1, "altbeacon");
        live.insert(2, "ibeacon");
        assert!(live.is_live(1));

        assert_eq!(live.remove(1), Some("altbeacon"));
        assert!(!live.is_live(1));
        assert!(live.is_live(2));
        assert_eq!(live.len(), 1);

        assert_eq!(live.remove(1), None);
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn test_altbeacon_advertisement() {
        let payload = encode(
            BeaconFormat::AltBeacon,
            UniqueCode::new(5),
            &DEFAULT_DEVICE_IDENTIFIER,
        );
        let adv = build_advertisement(&AdvertiseSettings::beacon(), &payload, None);

        assert!(matches!(adv.advertisement_type, Type::Broadcast));
        assert_eq!(adv.manufacturer_data.len(), 1);
        assert_eq!(adv.manufacturer_data[&224].len(), 24);
        assert!(adv.system_includes.is_empty());
        assert_eq!(adv.local_name, None);
        assert_eq!(adv.min_interval, Some(Duration::from_millis(1000)));
        assert_eq!(adv.timeout, None);
    }

    #[test]
    fn test_standard_advertisement_includes_name_and_power() {
        let payload = encode(BeaconFormat::Standard, UniqueCode::ZERO, &DEFAULT_DEVICE_IDENTIFIER);

        let adv = build_advertisement(&AdvertiseSettings::beacon(), &payload, None);
        assert!(adv.manufacturer_data.is_empty());
        assert!(adv.system_includes.contains(&Feature::TxPower));
        assert!(adv.system_includes.contains(&Feature::LocalName));

        let named = build_advertisement(
            &AdvertiseSettings::beacon(),
            &payload,
            Some("beacon".to_string()),
        );
        assert_eq!(named.local_name.as_deref(), Some("beacon"));
        assert!(!named.system_includes.contains(&Feature::LocalName));
    }
}
