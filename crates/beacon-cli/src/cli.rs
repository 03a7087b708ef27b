//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};
use uuid::Uuid;

use beacon_core::{BeaconError, BeaconFormat, UniqueCode};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Bluetooth adapter to use (e.g. hci0)
    #[arg(short, long, global = true)]
    pub adapter: Option<String>,

    /// Device identifier placed in AltBeacon and iBeacon records
    #[arg(long, global = true)]
    pub device_id: Option<Uuid>,

    /// Local name sent with the standard format
    #[arg(long, global = true)]
    pub device_name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Advertise a beacon until interrupted with Ctrl-C
    Advertise {
        /// Payload format: standard, altbeacon or ibeacon
        #[arg(short, long, default_value = "altbeacon")]
        format: BeaconFormat,
        /// Unique code as hex (AltBeacon only)
        #[arg(long, value_parser = parse_code)]
        code: Option<UniqueCode>,
        /// Log the advertisement instead of transmitting it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the encoded payload without touching the radio
    Encode {
        /// Payload format: standard, altbeacon or ibeacon
        #[arg(short, long, default_value = "altbeacon")]
        format: BeaconFormat,
        /// Unique code as hex (AltBeacon only)
        #[arg(long, value_parser = parse_code)]
        code: Option<UniqueCode>,
    },
}

fn parse_code(input: &str) -> Result<UniqueCode, BeaconError> {
    UniqueCode::parse_hex(input)
}
