//! Error types for the beacon core

use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors raised while preparing beacon input.
///
/// Encoding itself is total and the session reports failures through logs
/// and [`crate::StartOutcome`], so these only surface at the edges: parsing
/// user text and loading configuration.
#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Unknown beacon format: {0}")]
    UnknownFormat(String),

    #[error("Invalid unique code '{input}': expected up to 8 hex digits")]
    InvalidUniqueCode { input: String },

    #[error("Unknown adapter state code: {0}")]
    UnknownAdapterState(i32),

    #[error("Invalid device identifier: {0}")]
    InvalidDeviceIdentifier(#[from] uuid::Error),
}

/// Result type for beacon core operations
pub type Result<T> = std::result::Result<T, BeaconError>;
