//! RustyGatt - Bluetooth LE Attribute Protocol and Generic Attribute Profile
//!
//! This library implements ATT and GATT over any byte transport: a handle-indexed
//! attribute database, the ATT request engine with MTU-bounded responses, notification
//! and indication delivery with confirmation tracking, a blocking ATT client, and GATT
//! service modelling and discovery on top of them.
//!
//! The link itself (L2CAP channel, socket, test pipe) stays outside the crate: implement
//! [`att::Transport`] for it and feed every inbound PDU to the matching `handle_pdu`.

pub mod att;
pub mod gatt;
pub mod uuid;

// Re-export common types for convenience
pub use att::{
    AttClient, AttClientConfig, AttError, AttErrorCode, AttResult, AttServer, AttServerConfig,
    Attribute, AttributeDatabase, CharacteristicProperties, ClientConnection, DeliveryMode,
    Transport,
};
pub use gatt::{
    AttributeValue, Characteristic, GattCharacteristic, GattClient, GattDescriptor, GattError,
    GattServer, GattServerConfig, GattService, Service,
};
pub use uuid::{Uuid, UuidError};
