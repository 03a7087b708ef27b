//! Platform radio backends for beacon advertising
//!
//! This crate implements the radio interfaces of `beacon-core` on top of
//! real Bluetooth stacks.
//!
//! ## Architecture
//!
//! - [`config`] - backend configuration (adapter selection, dry run)
//! - [`error`] - error types for backend setup
//! - [`advertising`] - platform backends and selection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use beacon_ble::{BleConfig, PlatformRadio};
//! use beacon_core::{AdapterStateDispatcher, AdvertisingSession, BeaconConfig, BeaconFormat};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let radio = Arc::new(PlatformRadio::connect(&BleConfig::default()).await?);
//! let dispatcher = AdapterStateDispatcher::new(radio.clone());
//! let session = AdvertisingSession::new(radio, dispatcher, BeaconConfig::default());
//!
//! session.request_start(BeaconFormat::IBeacon, Default::default());
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! - **Linux**: BlueZ via the `bluer` crate
//! - **Other platforms**: log-only backend; payloads are printed, not transmitted

pub mod advertising;
pub mod config;
pub mod error;

// Public API exports
pub use advertising::fallback::LogRadio;
#[cfg(target_os = "linux")]
pub use advertising::linux::LinuxRadio;
pub use advertising::PlatformRadio;
pub use config::BleConfig;
pub use error::{BleError, Result};
