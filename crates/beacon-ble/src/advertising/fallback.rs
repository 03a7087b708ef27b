//! Log-only radio for dry runs and unsupported platforms

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use beacon_core::radio::{
    callback_key, AdapterHandle, AdapterStateSink, AdvertiserHandle, EventKind, EventSource,
    RadioManager, SharedCallback, SubscriptionHandle,
};
use beacon_core::{AdvertiseFailure, AdvertiseSettings, AdvertisementPayload};
use tracing::{debug, info, warn};

// ----------------------------------------------------------------------------
// Fallback Implementation
// ----------------------------------------------------------------------------

#[derive(Default)]
struct LogState {
    live: Mutex<HashSet<usize>>,
    next_subscription: AtomicU64,
}

/// Radio that is always on and prints advertisements instead of sending them.
///
/// It never reports adapter-state changes.
#[derive(Clone, Default)]
pub struct LogRadio {
    state: Arc<LogState>,
}

impl LogRadio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of advertisements started and not yet stopped
    pub fn live_count(&self) -> usize {
        self.live().len()
    }

    fn live(&self) -> std::sync::MutexGuard<'_, HashSet<usize>> {
        self.state.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RadioManager for LogRadio {
    fn adapter(&self) -> Option<Arc<dyn AdapterHandle>> {
        Some(Arc::new(self.clone()))
    }
}

impl AdapterHandle for LogRadio {
    fn is_enabled(&self) -> bool {
        true
    }

    fn enable(&self) -> bool {
        true
    }

    fn is_multi_advertisement_supported(&self) -> bool {
        true
    }

    fn advertiser(&self) -> Option<Arc<dyn AdvertiserHandle>> {
        Some(Arc::new(self.clone()))
    }
}

impl AdvertiserHandle for LogRadio {
    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        payload: &AdvertisementPayload,
        callback: SharedCallback,
    ) {
        if !self.live().insert(callback_key(&callback)) {
            warn!("Advertisement already running for this callback");
            callback.on_start_failure(AdvertiseFailure::AlreadyStarted);
            return;
        }

        match payload.manufacturer() {
            Some(record) => info!(
                "[dry run] advertising AD structure {} ({:?})",
                hex::encode(record.ad_structure()),
                settings.mode
            ),
            None => info!(
                "[dry run] advertising device name={} tx_power={} ({:?})",
                payload.include_device_name(),
                payload.include_tx_power_level(),
                settings.mode
            ),
        }
        callback.on_start_success(settings);
    }

    fn stop_advertising(&self, callback: &SharedCallback) {
        if self.live().remove(&callback_key(callback)) {
            info!("[dry run] advertising stopped");
        } else {
            debug!("[dry run] stop for an advertisement that is not running");
        }
    }
}

impl EventSource for LogRadio {
    fn subscribe(&self, kind: EventKind, _sink: AdapterStateSink) -> SubscriptionHandle {
        let id = self.state.next_subscription.fetch_add(1, Ordering::Relaxed);
        debug!("[dry run] subscribed to {:?} as {}", kind, id);
        SubscriptionHandle(id)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        debug!("[dry run] unsubscribed {:?}", handle);
    }
}
