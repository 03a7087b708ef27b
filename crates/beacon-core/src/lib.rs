//! Beacon advertising core
//!
//! This crate turns a beacon request (format + unique code) into a
//! manufacturer-specific advertisement and keeps one advertisement alive
//! against a radio adapter whose power state can change underneath it.
//!
//! ## Architecture
//!
//! - [`encoder`] - bit-exact payload layouts for the supported beacon formats
//! - [`radio`] - the interfaces a platform radio stack has to provide
//! - [`dispatcher`] - routes adapter-state events to registered actions
//! - [`session`] - the enable → start → stop state machine
//! - [`config`] - beacon configuration (device identifier)
//! - [`error`] - error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use beacon_core::{AdapterStateDispatcher, AdvertisingSession, BeaconConfig, BeaconFormat};
//! # use beacon_core::radio::{EventSource, RadioManager};
//!
//! # fn example(radio: Arc<dyn RadioManager>, events: Arc<dyn EventSource>) {
//! let dispatcher = AdapterStateDispatcher::new(events);
//! let session = AdvertisingSession::new(radio, dispatcher, BeaconConfig::default());
//!
//! session.request_start(BeaconFormat::AltBeacon, 0x1234_5678.into());
//! // ... later
//! session.request_stop();
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod encoder;
pub mod error;
pub mod radio;
pub mod session;

// Public API exports
pub use config::{BeaconConfig, DEFAULT_DEVICE_IDENTIFIER};
pub use dispatcher::AdapterStateDispatcher;
pub use encoder::{
    encode, AdvertisementPayload, BeaconFormat, BeaconLayout, ManufacturerRecord, UniqueCode,
};
pub use error::{BeaconError, Result};
pub use radio::{AdapterState, AdvertiseFailure, AdvertiseSettings};
pub use session::{AdvertisingSession, AdvertisingSessionState, StartOutcome, Unavailable};
