//! Beacon payload encoding
//!
//! Each manufacturer-data format is described by a static [`BeaconLayout`]:
//! a company identifier, a record length and a table of fields at fixed
//! offsets. [`encode`] fills the table in a single pass, so every format
//! shares one code path and the offsets live in exactly one place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BeaconError, Result};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// Calibrated signal strength at 1 m, in dBm (`0xCC` on the wire)
pub const REFERENCE_RSSI: i8 = -52;

/// Advertising data type tag for manufacturer-specific data
pub const MANUFACTURER_SPECIFIC_DATA: u8 = 0xFF;

/// Company identifier carried by AltBeacon records
pub const ALTBEACON_COMPANY_ID: u16 = 224;

/// Company identifier carried by iBeacon records
pub const IBEACON_COMPANY_ID: u16 = 76;

// ----------------------------------------------------------------------------
// Beacon Format
// ----------------------------------------------------------------------------

/// Supported beacon payload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeaconFormat {
    /// Plain discoverable device: name and tx power, no manufacturer data
    #[serde(alias = "ble1m")]
    Standard,
    /// Open AltBeacon format
    AltBeacon,
    /// Apple iBeacon format
    IBeacon,
}

impl BeaconFormat {
    /// All formats, in display order
    pub const ALL: [BeaconFormat; 3] = [Self::Standard, Self::AltBeacon, Self::IBeacon];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::AltBeacon => "altbeacon",
            Self::IBeacon => "ibeacon",
        }
    }

    /// Manufacturer record layout, if the format carries one
    pub fn layout(&self) -> Option<&'static BeaconLayout> {
        match self {
            Self::Standard => None,
            Self::AltBeacon => Some(&ALTBEACON_LAYOUT),
            Self::IBeacon => Some(&IBEACON_LAYOUT),
        }
    }

    /// Whether the unique code ends up in the payload
    pub fn uses_unique_code(&self) -> bool {
        self.layout().is_some_and(|layout| {
            layout
                .fields
                .iter()
                .any(|field| matches!(field.value, FieldValue::UniqueCode))
        })
    }
}

impl fmt::Display for BeaconFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BeaconFormat {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "ble1m" => Ok(Self::Standard),
            "altbeacon" => Ok(Self::AltBeacon),
            "ibeacon" => Ok(Self::IBeacon),
            _ => Err(BeaconError::UnknownFormat(s.to_string())),
        }
    }
}

// ----------------------------------------------------------------------------
// Unique Code
// ----------------------------------------------------------------------------

/// Caller-chosen 32-bit code embedded in AltBeacon records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueCode(u32);

impl UniqueCode {
    pub const ZERO: UniqueCode = UniqueCode(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Parse user-entered hex text.
    ///
    /// Blank input means "no code" and yields zero. An optional `0x` prefix
    /// is accepted.
    pub fn parse_hex(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::ZERO);
        }
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        // from_str_radix tolerates a leading sign
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BeaconError::InvalidUniqueCode {
                input: input.to_string(),
            });
        }
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| BeaconError::InvalidUniqueCode {
                input: input.to_string(),
            })
    }
}

impl From<u32> for UniqueCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for UniqueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Declarative Layouts
// ----------------------------------------------------------------------------

/// Where a field's bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// Constant bytes
    Fixed(&'static [u8]),
    /// The 16-byte big-endian form of the device identifier
    DeviceIdentifier,
    /// The unique code as a 4-byte big-endian integer
    UniqueCode,
}

impl FieldValue {
    /// Number of bytes this value produces
    pub fn width(&self) -> usize {
        match self {
            Self::Fixed(bytes) => bytes.len(),
            Self::DeviceIdentifier => 16,
            Self::UniqueCode => 4,
        }
    }
}

/// One field of a manufacturer record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutField {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub value: FieldValue,
}

impl LayoutField {
    const fn new(name: &'static str, offset: usize, width: usize, value: FieldValue) -> Self {
        Self {
            name,
            offset,
            width,
            value,
        }
    }
}

/// Fixed-length manufacturer record description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconLayout {
    pub company_id: u16,
    pub length: usize,
    pub fields: &'static [LayoutField],
}

pub const ALTBEACON_LAYOUT: BeaconLayout = BeaconLayout {
    company_id: ALTBEACON_COMPANY_ID,
    length: 24,
    fields: &[
        LayoutField::new("beacon code", 0, 2, FieldValue::Fixed(&[0xBE, 0xAC])),
        LayoutField::new("beacon id", 2, 16, FieldValue::DeviceIdentifier),
        LayoutField::new("unique code", 18, 4, FieldValue::UniqueCode),
        LayoutField::new("reference rssi", 22, 1, FieldValue::Fixed(&[REFERENCE_RSSI as u8])),
        LayoutField::new("reserved", 23, 1, FieldValue::Fixed(&[0x00])),
    ],
};

pub const IBEACON_LAYOUT: BeaconLayout = BeaconLayout {
    company_id: IBEACON_COMPANY_ID,
    length: 23,
    fields: &[
        LayoutField::new("beacon prefix", 0, 2, FieldValue::Fixed(&[0x02, 0x15])),
        LayoutField::new("proximity uuid", 2, 16, FieldValue::DeviceIdentifier),
        LayoutField::new("major", 18, 2, FieldValue::Fixed(&[0x00, 0x01])),
        LayoutField::new("minor", 20, 2, FieldValue::Fixed(&[0x00, 0x00])),
        LayoutField::new("reference rssi", 22, 1, FieldValue::Fixed(&[REFERENCE_RSSI as u8])),
    ],
};

impl BeaconLayout {
    /// Fill every field of the record in one pass
    pub fn fill(&self, code: UniqueCode, device_identifier: &Uuid) -> Vec<u8> {
        let mut data = vec![0u8; self.length];
        for field in self.fields {
            let slot = &mut data[field.offset..field.offset + field.width];
            match field.value {
                FieldValue::Fixed(bytes) => slot.copy_from_slice(bytes),
                FieldValue::DeviceIdentifier => slot.copy_from_slice(device_identifier.as_bytes()),
                FieldValue::UniqueCode => slot.copy_from_slice(&code.value().to_be_bytes()),
            }
        }
        data
    }
}

// ----------------------------------------------------------------------------
// Advertisement Payload
// ----------------------------------------------------------------------------

/// Manufacturer-specific data: company identifier plus vendor bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerRecord {
    company_id: u16,
    data: Vec<u8>,
}

impl ManufacturerRecord {
    pub fn company_id(&self) -> u16 {
        self.company_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// On-air AD structure: length, type `0xFF`, little-endian company id, data
    pub fn ad_structure(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 4);
        out.push((self.data.len() + 3) as u8);
        out.push(MANUFACTURER_SPECIFIC_DATA);
        out.extend_from_slice(&self.company_id.to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}

/// Advertisement contents for a single start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementPayload {
    manufacturer: Option<ManufacturerRecord>,
    include_device_name: bool,
    include_tx_power_level: bool,
}

impl AdvertisementPayload {
    pub fn manufacturer(&self) -> Option<&ManufacturerRecord> {
        self.manufacturer.as_ref()
    }

    pub fn include_device_name(&self) -> bool {
        self.include_device_name
    }

    pub fn include_tx_power_level(&self) -> bool {
        self.include_tx_power_level
    }
}

impl fmt::Display for AdvertisementPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.manufacturer {
            Some(record) => write!(
                f,
                "company=0x{:04X} data={}",
                record.company_id,
                hex::encode(&record.data)
            ),
            None => write!(
                f,
                "device_name={} tx_power={}",
                self.include_device_name, self.include_tx_power_level
            ),
        }
    }
}

// ----------------------------------------------------------------------------
// Encoder
// ----------------------------------------------------------------------------

/// Build the advertisement payload for `format`.
///
/// Formats without a unique-code field ignore `code`.
pub fn encode(
    format: BeaconFormat,
    code: UniqueCode,
    device_identifier: &Uuid,
) -> AdvertisementPayload {
    match format.layout() {
        Some(layout) => AdvertisementPayload {
            manufacturer: Some(ManufacturerRecord {
                company_id: layout.company_id,
                data: layout.fill(code, device_identifier),
            }),
            include_device_name: false,
            include_tx_power_level: false,
        },
        None => AdvertisementPayload {
            manufacturer: None,
            include_device_name: true,
            include_tx_power_level: true,
        },
    }
}
