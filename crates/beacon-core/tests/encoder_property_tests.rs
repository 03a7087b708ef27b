//! Property-based tests for the beacon payload layouts
//!
//! These check the byte-level contract of every format across arbitrary
//! identifiers and unique codes.

use beacon_core::{encode, BeaconFormat, UniqueCode};
use proptest::prelude::*;
use uuid::Uuid;

/// Generate arbitrary device identifiers
fn arb_identifier() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Generate arbitrary unique codes
fn arb_code() -> impl Strategy<Value = UniqueCode> {
    any::<u32>().prop_map(UniqueCode::new)
}

proptest! {
    /// Property: AltBeacon records carry marker, identifier, code, rssi and reserved byte
    #[test]
    fn altbeacon_layout(id in arb_identifier(), code in arb_code()) {
        let payload = encode(BeaconFormat::AltBeacon, code, &id);
        let record = payload.manufacturer().expect("AltBeacon has manufacturer data");
        let data = record.data();

        prop_assert_eq!(data.len(), 24);
        prop_assert_eq!(record.company_id(), 224);
        prop_assert_eq!(&data[0..2], &[0xBE, 0xAC]);
        prop_assert_eq!(&data[2..18], &id.as_u128().to_be_bytes());
        prop_assert_eq!(u32::from_be_bytes([data[18], data[19], data[20], data[21]]), code.value());
        prop_assert_eq!(data[22], 0xCC);
        prop_assert_eq!(data[23], 0x00);
    }

    /// Property: iBeacon records carry prefix, identifier, fixed major/minor and rssi
    #[test]
    fn ibeacon_layout(id in arb_identifier(), code in arb_code()) {
        let payload = encode(BeaconFormat::IBeacon, code, &id);
        let record = payload.manufacturer().expect("iBeacon has manufacturer data");
        let data = record.data();

        prop_assert_eq!(data.len(), 23);
        prop_assert_eq!(record.company_id(), 76);
        prop_assert_eq!(&data[0..2], &[0x02, 0x15]);
        prop_assert_eq!(&data[2..18], id.as_bytes());
        prop_assert_eq!(&data[18..20], &[0x00, 0x01]);
        prop_assert_eq!(&data[20..22], &[0x00, 0x00]);
        prop_assert_eq!(data[22], 0xCC);
    }

    /// Property: the standard format never carries manufacturer data
    #[test]
    fn standard_has_no_record(id in arb_identifier(), code in arb_code()) {
        let payload = encode(BeaconFormat::Standard, code, &id);

        prop_assert!(payload.manufacturer().is_none());
        prop_assert!(payload.include_device_name());
        prop_assert!(payload.include_tx_power_level());
    }

    /// Property: hex text of any code parses back to that code
    #[test]
    fn unique_code_hex_text(value in any::<u32>()) {
        prop_assert_eq!(UniqueCode::parse_hex(&format!("{:x}", value)).unwrap().value(), value);
        prop_assert_eq!(UniqueCode::parse_hex(&format!("{}", UniqueCode::new(value))).unwrap().value(), value);
    }
}
