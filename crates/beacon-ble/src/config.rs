//! Radio backend configuration

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the platform radio backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Adapter to use (e.g. `hci0`); the system default when unset
    pub adapter_name: Option<String>,
    /// Local name advertised by the standard format; the adapter alias when unset
    pub device_name: Option<String>,
    /// Log advertisements instead of transmitting them
    pub dry_run: bool,
}

impl BleConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an adapter by name
    pub fn with_adapter_name(mut self, name: String) -> Self {
        self.adapter_name = Some(name);
        self
    }

    /// Set the advertised local name
    pub fn with_device_name(mut self, name: String) -> Self {
        self.device_name = Some(name);
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}
