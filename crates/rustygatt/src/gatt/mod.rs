//! GATT (Generic Attribute Profile) implementation
//!
//! This module composes services, characteristics and descriptors into an ATT
//! attribute database, and discovers them on a remote server.

pub mod client;
pub mod server;
pub mod services;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{GattClient, GattError};
pub use server::{
    GattCharacteristic, GattDescriptor, GattServer, GattServerConfig, GattService, Include,
};
pub use services::{
    device_information_service, gap_service, gatt_service, DeviceInformation, GapServiceOptions,
    PreferredConnectionParameters,
};
pub use types::{AttributeValue, Characteristic, Descriptor, Service};
