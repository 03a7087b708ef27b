//! Error types for the radio backends

use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors raised while connecting a radio backend.
///
/// Once connected, backends report problems through logs and advertise
/// callbacks instead.
#[derive(Error, Debug)]
pub enum BleError {
    #[cfg(target_os = "linux")]
    #[error("BlueZ error: {0}")]
    Bluez(#[from] bluer::Error),

    #[error("BLE adapter not available: {0}")]
    AdapterNotAvailable(String),
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, BleError>;
