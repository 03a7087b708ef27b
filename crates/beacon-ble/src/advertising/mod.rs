//! Platform backend selection

pub mod fallback;
#[cfg(target_os = "linux")]
pub mod linux;

use std::sync::Arc;

use beacon_core::radio::{
    AdapterHandle, AdapterStateSink, EventKind, EventSource, RadioManager, SubscriptionHandle,
};
use crate::config::BleConfig;
use crate::error::Result;

// ----------------------------------------------------------------------------
// Platform Detection and Factory
// ----------------------------------------------------------------------------

/// Radio backend for the current platform
pub enum PlatformRadio {
    #[cfg(target_os = "linux")]
    Linux(linux::LinuxRadio),
    Fallback(fallback::LogRadio),
}

impl PlatformRadio {
    /// Connect the backend for this platform, or the log-only backend when
    /// `config.dry_run` is set
    pub async fn connect(config: &BleConfig) -> Result<Self> {
        if config.dry_run {
            return Ok(Self::Fallback(fallback::LogRadio::new()));
        }

        #[cfg(target_os = "linux")]
        {
            Ok(Self::Linux(linux::LinuxRadio::connect(config).await?))
        }
        #[cfg(not(target_os = "linux"))]
        {
            tracing::warn!(
                "BLE advertising not supported on this platform. Advertisements will only be logged. \
                Use Linux with BlueZ to transmit."
            );
            Ok(Self::Fallback(fallback::LogRadio::new()))
        }
    }

    /// Whether advertisements actually reach the air
    pub fn is_transmitting(&self) -> bool {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(_) => true,
            Self::Fallback(_) => false,
        }
    }
}

impl RadioManager for PlatformRadio {
    fn adapter(&self) -> Option<Arc<dyn AdapterHandle>> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(radio) => radio.adapter(),
            Self::Fallback(radio) => radio.adapter(),
        }
    }
}

impl EventSource for PlatformRadio {
    fn subscribe(&self, kind: EventKind, sink: AdapterStateSink) -> SubscriptionHandle {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(radio) => radio.subscribe(kind, sink),
            Self::Fallback(radio) => radio.subscribe(kind, sink),
        }
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(radio) => radio.unsubscribe(handle),
            Self::Fallback(radio) => radio.unsubscribe(handle),
        }
    }
}
