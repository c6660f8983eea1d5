//! Bluetooth UUIDs
//!
//! A [`Uuid`] is a 128-bit value. Values that fall under the Bluetooth Base UUID
//! (`0000xxxx-0000-1000-8000-00805F9B34FB`) also have a 16-bit short form, which is
//! what goes on the wire whenever possible.

use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Represents a Bluetooth UUID.
///
/// Stored as 16 bytes in little-endian (wire) order. Equality, ordering and hashing
/// all operate on the 128-bit expansion, so a UUID built from `0x2800` and one parsed
/// from `"00002800-0000-1000-8000-00805f9b34fb"` are the same value.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Uuid {
    bytes: [u8; 16],
}

/// The Bluetooth Base UUID in little-endian order.
const BASE_UUID_BYTES: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Offset within the base UUID where the 16-bit value lives.
const BASE_OFFSET: usize = 12;

/// Length of the canonical hyphenated string form.
const LONG_FORM_LEN: usize = 36;

/// Hyphen positions in the canonical string form.
const HYPHENS: [usize; 4] = [8, 13, 18, 23];

/// Well-known GATT assigned numbers, sorted for binary search.
const KNOWN_UUIDS: &[(u16, &str)] = &[
    (0x1800, "Generic Access"),
    (0x1801, "Generic Attribute"),
    (0x180A, "Device Information"),
    (0x2800, "Primary Service"),
    (0x2801, "Secondary Service"),
    (0x2802, "Include"),
    (0x2803, "Characteristic"),
    (0x2900, "Characteristic Extended Properties"),
    (0x2901, "Characteristic User Description"),
    (0x2902, "Client Characteristic Configuration"),
    (0x2903, "Server Characteristic Configuration"),
    (0x2904, "Characteristic Presentation Format"),
    (0x2A00, "Device Name"),
    (0x2A01, "Appearance"),
    (0x2A02, "Peripheral Privacy Flag"),
    (0x2A03, "Reconnection Address"),
    (0x2A04, "Peripheral Preferred Connection Parameters"),
    (0x2A05, "Service Changed"),
    (0x2A23, "System ID"),
    (0x2A24, "Model Number String"),
    (0x2A25, "Serial Number String"),
    (0x2A26, "Firmware Revision String"),
    (0x2A27, "Hardware Revision String"),
    (0x2A28, "Software Revision String"),
    (0x2A29, "Manufacturer Name String"),
];

/// Errors produced while building a [`Uuid`] from untrusted input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UuidError {
    #[error("invalid UUID string length {0}")]
    InvalidLength(usize),

    #[error("malformed UUID string {0:?}")]
    Malformed(String),

    #[error("invalid UUID buffer length {0}, expected 2 or 16")]
    InvalidBufferLength(usize),

    #[error("invalid hex in UUID: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// The accepted inputs for [`Uuid::of`].
#[derive(Debug, Clone, Copy)]
pub enum UuidSource<'a> {
    /// A 16-bit assigned number
    Short(u16),
    /// `0xNNNN`, `NNNN` or the 36-character hyphenated form
    Str(&'a str),
    /// A 2 or 16 byte little-endian buffer
    Bytes(&'a [u8]),
}

impl From<u16> for UuidSource<'_> {
    fn from(value: u16) -> Self {
        UuidSource::Short(value)
    }
}

impl<'a> From<&'a str> for UuidSource<'a> {
    fn from(value: &'a str) -> Self {
        UuidSource::Str(value)
    }
}

impl<'a> From<&'a String> for UuidSource<'a> {
    fn from(value: &'a String) -> Self {
        UuidSource::Str(value.as_str())
    }
}

impl<'a> From<&'a [u8]> for UuidSource<'a> {
    fn from(value: &'a [u8]) -> Self {
        UuidSource::Bytes(value)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for UuidSource<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        UuidSource::Bytes(value.as_slice())
    }
}

impl Uuid {
    /// Builds a UUID from any of the supported input forms.
    pub fn of<'a>(value: impl Into<UuidSource<'a>>) -> Result<Self, UuidError> {
        match value.into() {
            UuidSource::Short(v) => Ok(Uuid::from_u16(v)),
            UuidSource::Str(s) => Uuid::parse_str(s),
            UuidSource::Bytes(b) => {
                Uuid::try_from_slice_le(b).ok_or(UuidError::InvalidBufferLength(b.len()))
            }
        }
    }

    /// Creates a UUID directly from 16 little-endian bytes.
    pub const fn from_bytes_le(bytes: [u8; 16]) -> Self {
        Uuid { bytes }
    }

    /// Creates a UUID from 16 big-endian bytes (display order).
    pub fn from_bytes_be(mut bytes: [u8; 16]) -> Self {
        bytes.reverse();
        Uuid { bytes }
    }

    /// Creates a UUID from a 16-bit SIG-assigned value.
    pub const fn from_u16(uuid16: u16) -> Self {
        let mut bytes = BASE_UUID_BYTES;
        bytes[BASE_OFFSET] = uuid16 as u8;
        bytes[BASE_OFFSET + 1] = (uuid16 >> 8) as u8;
        Uuid { bytes }
    }

    /// Creates a UUID from a little-endian wire buffer of 2 or 16 bytes.
    pub fn try_from_slice_le(slice: &[u8]) -> Option<Self> {
        match slice.len() {
            2 => Some(Uuid::from_u16(u16::from_le_bytes([slice[0], slice[1]]))),
            16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(slice);
                Some(Uuid::from_bytes_le(bytes))
            }
            _ => None,
        }
    }

    /// Parses `0xNNNN`, `NNNN` or the canonical 36-character form.
    pub fn parse_str(s: &str) -> Result<Self, UuidError> {
        match s.len() {
            LONG_FORM_LEN => {
                let raw = s.as_bytes();
                if HYPHENS.iter().any(|&i| raw[i] != b'-') {
                    return Err(UuidError::Malformed(s.to_string()));
                }
                let digits: String = s.chars().filter(|&c| c != '-').collect();
                if digits.len() != 32 {
                    return Err(UuidError::Malformed(s.to_string()));
                }
                let mut bytes_be = [0u8; 16];
                hex::decode_to_slice(&digits, &mut bytes_be)?;
                Ok(Uuid::from_bytes_be(bytes_be))
            }
            6 | 4 => {
                let digits = match s.len() {
                    6 => s
                        .strip_prefix("0x")
                        .or_else(|| s.strip_prefix("0X"))
                        .ok_or_else(|| UuidError::Malformed(s.to_string()))?,
                    _ => s,
                };
                let mut bytes_be = [0u8; 2];
                hex::decode_to_slice(digits, &mut bytes_be)?;
                Ok(Uuid::from_u16(u16::from_be_bytes(bytes_be)))
            }
            len => Err(UuidError::InvalidLength(len)),
        }
    }

    /// Generates a random (version 4) UUID, useful for vendor services.
    pub fn new_random_v4() -> Self {
        let mut bytes_be = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes_be);
        bytes_be[6] = (bytes_be[6] & 0x0F) | 0x40;
        bytes_be[8] = (bytes_be[8] & 0x3F) | 0x80;
        Uuid::from_bytes_be(bytes_be)
    }

    /// Returns the underlying 16 bytes in little-endian order.
    pub const fn as_bytes_le(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Returns the 16 bytes in big-endian (display) order.
    pub fn as_bytes_be(&self) -> [u8; 16] {
        let mut bytes = self.bytes;
        bytes.reverse();
        bytes
    }

    /// Returns the 16-bit form if this UUID sits under the Base UUID.
    pub fn as_u16(&self) -> Option<u16> {
        let under_base = self.bytes[..BASE_OFFSET] == BASE_UUID_BYTES[..BASE_OFFSET]
            && self.bytes[BASE_OFFSET + 2] == 0
            && self.bytes[BASE_OFFSET + 3] == 0;
        under_base
            .then(|| u16::from_le_bytes([self.bytes[BASE_OFFSET], self.bytes[BASE_OFFSET + 1]]))
    }

    /// True when only the 128-bit form can represent this UUID.
    pub fn is_long(&self) -> bool {
        self.as_u16().is_none()
    }

    /// Width of this UUID in a PDU field: 2 or 16.
    pub fn byte_length(&self) -> usize {
        if self.is_long() {
            16
        } else {
            2
        }
    }

    /// Wire encoding: 2 bytes little-endian when short, otherwise all 16 bytes reversed
    /// relative to the display string.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.as_u16() {
            Some(short) => short.to_le_bytes().to_vec(),
            None => self.bytes.to_vec(),
        }
    }

    /// Human readable name for well-known GATT types.
    pub fn name(&self) -> Option<&'static str> {
        let short = self.as_u16()?;
        KNOWN_UUIDS
            .binary_search_by_key(&short, |&(value, _)| value)
            .ok()
            .map(|index| KNOWN_UUIDS[index].1)
    }
}

impl From<u16> for Uuid {
    fn from(uuid16: u16) -> Self {
        Uuid::from_u16(uuid16)
    }
}

impl PartialEq<u16> for Uuid {
    fn eq(&self, other: &u16) -> bool {
        self.as_u16() == Some(*other)
    }
}

impl PartialEq<Uuid> for u16 {
    fn eq(&self, other: &Uuid) -> bool {
        other.as_u16() == Some(*self)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.as_bytes_be();
        write!(
            f,
            "{}-{}-{}-{}-{}",
            hex::encode(&b[0..4]),
            hex::encode(&b[4..6]),
            hex::encode(&b[6..8]),
            hex::encode(&b[8..10]),
            hex::encode(&b[10..16])
        )
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.as_u16(), self.name()) {
            (Some(short), Some(name)) => write!(f, "Uuid(0x{:04X} {})", short, name),
            (Some(short), None) => write!(f, "Uuid(0x{:04X})", short),
            _ => write!(f, "Uuid({})", self),
        }
    }
}

impl FromStr for Uuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_round_trip_all_values() {
        for v in 0..=u16::MAX {
            let uuid = Uuid::of(v).unwrap();
            assert!(!uuid.is_long());
            assert_eq!(uuid.byte_length(), 2);

            let bytes = uuid.to_bytes();
            assert_eq!(bytes, v.to_le_bytes().to_vec());
            assert_eq!(Uuid::of(bytes.as_slice()).unwrap(), uuid);
            assert_eq!(uuid.as_u16(), Some(v));
        }
    }

    #[test]
    fn test_long_string_round_trip() {
        for _ in 0..256 {
            let uuid = Uuid::new_random_v4();
            let text = uuid.to_string();
            assert_eq!(text.len(), 36);

            let bytes = uuid.to_bytes();
            let back = Uuid::of(bytes.as_slice()).unwrap();
            assert_eq!(back.to_string(), text);
            assert_eq!(Uuid::of(text.to_uppercase().as_str()).unwrap(), uuid);
        }
    }

    #[test]
    fn test_equality_across_forms() {
        let from_int = Uuid::of(0x2800).unwrap();
        let from_short = Uuid::of("0x2800").unwrap();
        let from_long = Uuid::of("00002800-0000-1000-8000-00805F9B34FB").unwrap();
        let from_buf = Uuid::of(&[0x00, 0x28]).unwrap();

        assert_eq!(from_int, from_short);
        assert_eq!(from_int, from_long);
        assert_eq!(from_int, from_buf);
        assert_eq!(from_long, 0x2800u16);
    }

    #[test]
    fn test_long_wire_order_is_reversed() {
        let uuid = Uuid::of("12345678-9abc-def0-1122-334455667788").unwrap();
        assert!(uuid.is_long());
        assert_eq!(uuid.byte_length(), 16);

        let bytes = uuid.to_bytes();
        assert_eq!(bytes[0], 0x88);
        assert_eq!(bytes[15], 0x12);
    }

    #[test]
    fn test_base_uuid_neighbour_is_long() {
        // Same prefix as a 16-bit value but with the 32-bit bytes populated
        let uuid = Uuid::of("00012800-0000-1000-8000-00805f9b34fb").unwrap();
        assert!(uuid.is_long());
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert_eq!(Uuid::of("0x2"), Err(UuidError::InvalidLength(3)));
        assert!(matches!(Uuid::of("0x28"), Err(UuidError::Hex(_))));
        assert!(matches!(Uuid::of("zz2800"), Err(UuidError::Malformed(_))));
        assert!(matches!(Uuid::of("0xZZZZ"), Err(UuidError::Hex(_))));
        assert!(matches!(
            Uuid::of("00002800+0000-1000-8000-00805f9b34fb"),
            Err(UuidError::Malformed(_))
        ));
        assert!(matches!(
            Uuid::of(&[0u8; 4]),
            Err(UuidError::InvalidBufferLength(4))
        ));
    }

    #[test]
    fn test_hex_errors_compare_by_value() {
        let err = Uuid::of("0xZZ00").unwrap_err();
        assert_eq!(
            err,
            UuidError::Hex(hex::FromHexError::InvalidHexCharacter { c: 'Z', index: 0 })
        );
        assert_ne!(err, UuidError::Hex(hex::FromHexError::OddLength));
        assert_eq!(err.clone(), err);
    }

    #[test]
    fn test_known_names() {
        assert_eq!(Uuid::from_u16(0x2A00).name(), Some("Device Name"));
        assert_eq!(Uuid::from_u16(0x1234).name(), None);
        assert_eq!(format!("{:?}", Uuid::from_u16(0x2803)), "Uuid(0x2803 Characteristic)");
    }
}
