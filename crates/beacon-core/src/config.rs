//! Beacon configuration

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::radio::AdvertiseSettings;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Identifier advertised when none is configured
pub const DEFAULT_DEVICE_IDENTIFIER: Uuid = Uuid::from_u128(0x2F234454_CF6D_4A0F_ADF2_F4911BA9FFA6);

/// Configuration shared by every advertisement of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Beacon identifier placed in AltBeacon and iBeacon records
    pub device_identifier: Uuid,
    /// Radio settings used for every start request
    #[serde(skip)]
    pub settings: AdvertiseSettings,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            device_identifier: DEFAULT_DEVICE_IDENTIFIER,
            settings: AdvertiseSettings::beacon(),
        }
    }
}

impl BeaconConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device identifier
    pub fn with_device_identifier(mut self, device_identifier: Uuid) -> Self {
        self.device_identifier = device_identifier;
        self
    }

    /// Set the device identifier from its textual form
    pub fn with_device_identifier_str(self, device_identifier: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(device_identifier)?;
        Ok(self.with_device_identifier(uuid))
    }
}
