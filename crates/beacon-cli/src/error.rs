//! Error handling for the beacon CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Beacon error: {0}")]
    Beacon(#[from] beacon_core::BeaconError),

    #[error("Radio backend error: {0}")]
    Ble(#[from] beacon_ble::BleError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Advertising could not start: {0}")]
    Advertise(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
