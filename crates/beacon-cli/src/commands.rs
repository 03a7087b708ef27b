//! Command handlers for the beacon CLI

use std::sync::Arc;

use tracing::{info, warn};

use beacon_ble::PlatformRadio;
use beacon_core::{
    encode, AdapterStateDispatcher, AdvertisementPayload, AdvertisingSession, BeaconFormat,
    StartOutcome, UniqueCode,
};

use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::{CliError, Result};

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands, config: AppConfig) -> Result<()> {
        match command {
            Commands::Advertise {
                format,
                code,
                dry_run,
            } => {
                Self::handle_advertise_command(config, format, code.unwrap_or_default(), dry_run)
                    .await
            }
            Commands::Encode { format, code } => {
                let code = code.unwrap_or_default();
                let payload = encode(format, code, &config.beacon.device_identifier);
                for line in describe_payload(format, &payload) {
                    println!("{}", line);
                }
                Ok(())
            }
        }
    }

    /// Advertise until Ctrl-C, then stop
    async fn handle_advertise_command(
        mut config: AppConfig,
        format: BeaconFormat,
        code: UniqueCode,
        dry_run: bool,
    ) -> Result<()> {
        if !format.uses_unique_code() && code != UniqueCode::ZERO {
            warn!("{} ignores the unique code {}", format, code);
        }

        let dry_run = config.ble.dry_run || dry_run;
        config.ble = config.ble.with_dry_run(dry_run);
        let radio = Arc::new(PlatformRadio::connect(&config.ble).await?);
        if !radio.is_transmitting() {
            info!("Advertisements will be logged, not transmitted");
        }

        let dispatcher = AdapterStateDispatcher::new(radio.clone());
        let session = AdvertisingSession::new(radio, dispatcher, config.beacon.clone());

        match session.request_start(format, code) {
            StartOutcome::Started => info!("Advertising {} beacon", format),
            StartOutcome::WaitingForRadio => {
                info!("Bluetooth is off; advertising starts once it powers on")
            }
            StartOutcome::Unsupported => {
                return Err(CliError::Advertise(
                    "adapter does not support advertising".to_string(),
                ))
            }
            StartOutcome::Unavailable(missing) => {
                return Err(CliError::Advertise(format!("{:?} not available", missing)))
            }
        }

        tokio::signal::ctrl_c().await?;
        info!("Stopping advertisement");
        session.request_stop();
        Ok(())
    }
}

/// Human-readable lines for an encoded payload
pub fn describe_payload(format: BeaconFormat, payload: &AdvertisementPayload) -> Vec<String> {
    let mut lines = vec![format!("format: {}", format)];
    match payload.manufacturer() {
        Some(record) => {
            lines.push(format!("company id: 0x{:04X}", record.company_id()));
            lines.push(format!("manufacturer data: {}", hex::encode(record.data())));
            lines.push(format!("AD structure: {}", hex::encode(record.ad_structure())));
        }
        None => lines.push("manufacturer data: none".to_string()),
    }
    lines.push(format!("include device name: {}", payload.include_device_name()));
    lines.push(format!("include tx power: {}", payload.include_tx_power_level()));
    lines
}
