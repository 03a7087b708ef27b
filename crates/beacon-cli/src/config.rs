//! Beacon CLI configuration management
//!
//! Configuration is read from a TOML file: the path given with `--config`,
//! otherwise `beacon/beacon.toml` under the platform configuration
//! directory when it exists, otherwise built-in defaults. Command-line flags
//! are applied on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use beacon_ble::BleConfig;
use beacon_core::BeaconConfig;

use crate::cli::Cli;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the beacon CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session configuration
    pub beacon: BeaconConfig,
    /// Radio backend configuration
    pub ble: BleConfig,
    /// Enable verbose logging output
    pub verbose: bool,
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Reading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load the file named on the command line, or the default file when present
    pub fn load(cli: &Cli) -> Result<Self> {
        if let Some(path) = &cli.config {
            return Self::load_from_file(path);
        }
        match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Default configuration file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("beacon").join("beacon.toml"))
    }

    /// Apply the global command-line overrides
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(adapter) = &cli.adapter {
            self.ble = self.ble.with_adapter_name(adapter.clone());
        }
        if let Some(name) = &cli.device_name {
            self.ble = self.ble.with_device_name(name.clone());
        }
        if let Some(device_id) = cli.device_id {
            self.beacon = self.beacon.with_device_identifier(device_id);
        }
        self.verbose |= cli.verbose;
        self
    }

    /// Serialize to TOML, e.g. for writing an example file
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }
}
