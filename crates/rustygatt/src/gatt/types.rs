//! Common types for GATT operations
//!
//! [`AttributeValue`] is the application-facing value type of the server model. The
//! [`Service`], [`Characteristic`] and [`Descriptor`] structs describe what a client
//! discovered on a remote server.

use crate::att::CharacteristicProperties;
use crate::uuid::Uuid;

/// Value of a local attribute before it is stored in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Raw bytes, stored as-is
    Bytes(Vec<u8>),
    /// UTF-8 text
    Text(String),
    /// Single byte integer
    Integer(u8),
    /// UUID in its wire form (2 bytes if short, 16 otherwise)
    Uuid(Uuid),
}

impl AttributeValue {
    /// Encode to the bytes stored in the attribute database
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            AttributeValue::Bytes(bytes) => bytes.clone(),
            AttributeValue::Text(text) => text.as_bytes().to_vec(),
            AttributeValue::Integer(value) => vec![*value],
            AttributeValue::Uuid(uuid) => uuid.to_bytes(),
        }
    }
}

impl Default for AttributeValue {
    fn default() -> Self {
        AttributeValue::Bytes(Vec::new())
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttributeValue::Bytes(bytes)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(bytes: &[u8]) -> Self {
        AttributeValue::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for AttributeValue {
    fn from(bytes: [u8; N]) -> Self {
        AttributeValue::Bytes(bytes.to_vec())
    }
}

impl From<&str> for AttributeValue {
    fn from(text: &str) -> Self {
        AttributeValue::Text(text.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(text: String) -> Self {
        AttributeValue::Text(text)
    }
}

impl From<u8> for AttributeValue {
    fn from(value: u8) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<Uuid> for AttributeValue {
    fn from(uuid: Uuid) -> Self {
        AttributeValue::Uuid(uuid)
    }
}

/// A service found on a remote server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Service UUID
    pub uuid: Uuid,
    /// Whether this is a primary or secondary service
    pub is_primary: bool,
    /// Start handle for this service
    pub start_handle: u16,
    /// End handle for this service
    pub end_handle: u16,
}

/// A characteristic found on a remote server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Characteristic {
    /// Characteristic UUID
    pub uuid: Uuid,
    /// Declaration handle
    pub declaration_handle: u16,
    /// Value handle
    pub value_handle: u16,
    /// Last handle belonging to this characteristic (value or final descriptor)
    pub end_handle: u16,
    /// Characteristic properties
    pub properties: CharacteristicProperties,
}

/// A descriptor found on a remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Descriptor handle
    pub handle: u16,
    /// Descriptor type
    pub uuid: Uuid,
}
