//! GATT Server implementation
//!
//! Services are described with [`GattService`], [`GattCharacteristic`] and
//! [`GattDescriptor`], laid out into handles, flattened into attributes and loaded into
//! an [`AttributeDatabase`] served by an [`AttServer`].

use super::services::{
    gap_service, gatt_service, GapServiceOptions, GAP_SERVICE_UUID, GATT_SERVICE_UUID,
};
use super::types::AttributeValue;
use crate::att::{
    AttError, AttResult, AttServer, AttServerConfig, Attribute, AttributeDatabase,
    CharacteristicProperties, ClientConnection, Transport, ATT_DEFAULT_MTU, ATT_HANDLE_MIN,
    ATT_TRANSACTION_TIMEOUT_MS, CHARACTERISTIC_UUID, CLIENT_CHAR_CONFIG_UUID, INCLUDE_UUID,
    PRIMARY_SERVICE_UUID, SECONDARY_SERVICE_UUID,
};
use crate::uuid::Uuid;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// GATT Server configuration
#[derive(Debug, Clone)]
pub struct GattServerConfig {
    /// Maximum MTU size
    pub mtu: u16,
    /// Indication confirmation timeout, `None` to wait forever
    pub indication_timeout: Option<Duration>,
}

impl Default for GattServerConfig {
    fn default() -> Self {
        Self {
            mtu: ATT_DEFAULT_MTU,
            indication_timeout: Some(Duration::from_millis(ATT_TRANSACTION_TIMEOUT_MS)),
        }
    }
}

impl From<&GattServerConfig> for AttServerConfig {
    fn from(config: &GattServerConfig) -> Self {
        AttServerConfig {
            mtu: config.mtu,
            indication_timeout: config.indication_timeout,
        }
    }
}

fn next_handle(handle: u16) -> AttResult<u16> {
    handle.checked_add(1).ok_or(AttError::HandleSpaceExhausted)
}

/// GATT characteristic descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattDescriptor {
    /// Descriptor UUID
    pub uuid: Uuid,
    /// Descriptor value
    pub value: AttributeValue,
    /// Descriptor permissions
    pub permissions: CharacteristicProperties,
    /// Descriptor handle, 0 until laid out
    pub handle: u16,
}

impl GattDescriptor {
    pub fn new(
        uuid: Uuid,
        value: impl Into<AttributeValue>,
        permissions: CharacteristicProperties,
    ) -> Self {
        Self {
            uuid,
            value: value.into(),
            permissions,
            handle: 0,
        }
    }

    /// Client Characteristic Configuration descriptor, both deliveries off
    pub fn cccd() -> Self {
        Self::new(
            Uuid::from_u16(CLIENT_CHAR_CONFIG_UUID),
            [0u8, 0],
            CharacteristicProperties::READ | CharacteristicProperties::WRITE,
        )
    }

    fn attribute(&self) -> Attribute {
        Attribute::new(self.handle, self.uuid, self.value.to_bytes(), self.permissions)
    }
}

/// GATT characteristic with its descriptors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    /// Characteristic UUID
    pub uuid: Uuid,
    /// Characteristic properties, also the access mask of the value attribute
    pub properties: CharacteristicProperties,
    /// Initial value
    pub value: AttributeValue,
    /// Characteristic descriptors
    pub descriptors: Vec<GattDescriptor>,
    /// Characteristic declaration handle
    pub declaration_handle: u16,
    /// Characteristic value handle, always `declaration_handle + 1`
    pub value_handle: u16,
}

impl GattCharacteristic {
    pub fn new(
        uuid: Uuid,
        properties: CharacteristicProperties,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            uuid,
            properties,
            value: value.into(),
            descriptors: Vec::new(),
            declaration_handle: 0,
            value_handle: 0,
        }
    }

    pub fn with_descriptor(mut self, descriptor: GattDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Adds a Client Characteristic Configuration descriptor
    pub fn with_cccd(self) -> Self {
        self.with_descriptor(GattDescriptor::cccd())
    }

    /// Lay out handles starting at `base`; returns the last handle used.
    pub fn set_handle(&mut self, base: u16) -> AttResult<u16> {
        if base == 0 {
            return Err(AttError::InvalidHandle(base));
        }
        self.declaration_handle = base;
        self.value_handle = next_handle(base)?;

        let mut last = self.value_handle;
        for descriptor in &mut self.descriptors {
            last = next_handle(last)?;
            descriptor.handle = last;
        }
        Ok(last)
    }

    /// Last handle owned by this characteristic
    pub fn end_handle(&self) -> u16 {
        self.descriptors
            .last()
            .map_or(self.value_handle, |d| d.handle)
    }

    /// Declaration value: properties, value handle, UUID
    pub fn declaration_value(&self) -> Vec<u8> {
        let mut value = vec![self.properties.bits()];
        value.extend_from_slice(&self.value_handle.to_le_bytes());
        value.extend_from_slice(&self.uuid.to_bytes());
        value
    }

    /// Declaration, value and descriptor attributes in handle order
    pub fn get_attributes(&self) -> Vec<Attribute> {
        let mut attributes = Vec::with_capacity(2 + self.descriptors.len());
        attributes.push(Attribute::new(
            self.declaration_handle,
            Uuid::from_u16(CHARACTERISTIC_UUID),
            self.declaration_value(),
            CharacteristicProperties::READ,
        ));
        attributes.push(Attribute::new(
            self.value_handle,
            self.uuid,
            self.value.to_bytes(),
            self.properties,
        ));
        attributes.extend(self.descriptors.iter().map(GattDescriptor::attribute));
        attributes
    }
}

/// Reference from one service to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    /// UUID of the included service
    pub uuid: Uuid,
    /// Handle of the include declaration
    pub handle: u16,
    /// First handle of the included service, known once the server is built
    pub start_handle: u16,
    /// Last handle of the included service
    pub end_handle: u16,
}

impl Include {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            handle: 0,
            start_handle: 0,
            end_handle: 0,
        }
    }

    /// Include declaration value; the service UUID is only present when it is short
    pub fn value(&self) -> Vec<u8> {
        let mut value = Vec::with_capacity(6);
        value.extend_from_slice(&self.start_handle.to_le_bytes());
        value.extend_from_slice(&self.end_handle.to_le_bytes());
        if let Some(short) = self.uuid.as_u16() {
            value.extend_from_slice(&short.to_le_bytes());
        }
        value
    }
}

/// A GATT service with characteristics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    /// Service UUID
    pub uuid: Uuid,
    /// Is this a primary service?
    pub primary: bool,
    /// Included services
    pub includes: Vec<Include>,
    /// Service characteristics
    pub characteristics: Vec<GattCharacteristic>,
    /// Service declaration handle
    pub handle: u16,
    /// Service end handle
    pub end_handle: u16,
}

impl GattService {
    pub fn new(uuid: Uuid, primary: bool) -> Self {
        Self {
            uuid,
            primary,
            includes: Vec::new(),
            characteristics: Vec::new(),
            handle: 0,
            end_handle: 0,
        }
    }

    pub fn primary(uuid: Uuid) -> Self {
        Self::new(uuid, true)
    }

    pub fn secondary(uuid: Uuid) -> Self {
        Self::new(uuid, false)
    }

    pub fn with_characteristic(mut self, characteristic: GattCharacteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    /// Include the service identified by `uuid`; resolved when the server is built
    pub fn with_include(mut self, uuid: Uuid) -> Self {
        self.includes.push(Include::new(uuid));
        self
    }

    /// Lay out handles depth first starting at `base`: declaration, includes, then each
    /// characteristic. Returns the service's end handle. Safe to call again.
    pub fn set_handle(&mut self, base: u16) -> AttResult<u16> {
        if base == 0 {
            return Err(AttError::InvalidHandle(base));
        }
        self.handle = base;

        let mut last = base;
        for include in &mut self.includes {
            last = next_handle(last)?;
            include.handle = last;
        }
        for characteristic in &mut self.characteristics {
            last = characteristic.set_handle(next_handle(last)?)?;
        }

        self.end_handle = last;
        Ok(last)
    }

    /// Look up a characteristic by UUID
    pub fn characteristic(&self, uuid: &Uuid) -> Option<&GattCharacteristic> {
        self.characteristics.iter().find(|c| &c.uuid == uuid)
    }

    /// Flatten into attributes in handle order
    pub fn get_attributes(&self) -> Vec<Attribute> {
        let declaration_type = if self.primary {
            PRIMARY_SERVICE_UUID
        } else {
            SECONDARY_SERVICE_UUID
        };

        let mut attributes = vec![Attribute::new(
            self.handle,
            Uuid::from_u16(declaration_type),
            self.uuid.to_bytes(),
            CharacteristicProperties::READ,
        )
        .with_end_handle(self.end_handle)];

        attributes.extend(self.includes.iter().map(|include| {
            Attribute::new(
                include.handle,
                Uuid::from_u16(INCLUDE_UUID),
                include.value(),
                CharacteristicProperties::READ,
            )
        }));
        for characteristic in &self.characteristics {
            attributes.extend(characteristic.get_attributes());
        }
        attributes
    }
}

/// A GATT server
pub struct GattServer {
    /// Laid out services
    services: Vec<GattService>,
    /// Attribute database
    database: Arc<AttributeDatabase>,
    /// ATT server
    att_server: AttServer,
}

impl GattServer {
    /// Build a server from `services`, assigning handles from 1 in the given order.
    pub fn new(config: GattServerConfig, mut services: Vec<GattService>) -> AttResult<Self> {
        let mut base = Some(ATT_HANDLE_MIN);
        for service in &mut services {
            let start = base.ok_or(AttError::HandleSpaceExhausted)?;
            let end = service.set_handle(start)?;
            base = end.checked_add(1);
        }

        resolve_includes(&mut services)?;

        let database = Arc::new(AttributeDatabase::new());
        for service in &services {
            for attribute in service.get_attributes() {
                database.insert(attribute)?;
            }
        }
        debug!(
            "GATT server built: {} services, {} attributes",
            services.len(),
            database.len()
        );

        let att_server = AttServer::new(Arc::clone(&database), (&config).into());
        Ok(Self {
            services,
            database,
            att_server,
        })
    }

    /// Like [`GattServer::new`], but puts the GAP and GATT services first when the
    /// application did not provide them.
    pub fn with_default_services(
        config: GattServerConfig,
        device_name: &str,
        services: Vec<GattService>,
    ) -> AttResult<Self> {
        let has = |uuid: u16| services.iter().any(|s| s.uuid == uuid);
        let mut all = Vec::with_capacity(services.len() + 2);
        if !has(GAP_SERVICE_UUID) {
            all.push(gap_service(device_name, &GapServiceOptions::default()));
        }
        if !has(GATT_SERVICE_UUID) {
            all.push(gatt_service());
        }
        all.extend(services);
        Self::new(config, all)
    }

    /// Laid out services
    pub fn services(&self) -> &[GattService] {
        &self.services
    }

    /// Look up a service by UUID
    pub fn service(&self, uuid: &Uuid) -> Option<&GattService> {
        self.services.iter().find(|s| &s.uuid == uuid)
    }

    /// Attribute database
    pub fn database(&self) -> &Arc<AttributeDatabase> {
        &self.database
    }

    /// ATT server
    pub fn att_server(&self) -> &AttServer {
        &self.att_server
    }

    /// Accept a client on `transport`
    pub fn accept(&self, transport: Arc<dyn Transport>) -> Arc<ClientConnection> {
        self.att_server.accept_client(transport)
    }

    /// Replace a value; subscribed clients are notified or indicated.
    pub fn set_value(&self, handle: u16, value: impl Into<AttributeValue>) -> AttResult<()> {
        self.database.write_value(handle, value.into().to_bytes())
    }

    /// Current value at `handle`
    pub fn value(&self, handle: u16) -> Option<Vec<u8>> {
        self.database.get(handle).map(|attr| attr.value)
    }

    /// Close every client connection
    pub fn stop(&self) {
        self.att_server.stop();
    }
}

fn resolve_includes(services: &mut [GattService]) -> AttResult<()> {
    let ranges: HashMap<Uuid, (u16, u16)> = services
        .iter()
        .map(|s| (s.uuid, (s.handle, s.end_handle)))
        .collect();

    for service in services.iter_mut() {
        for include in &mut service.includes {
            let (start, end) = ranges.get(&include.uuid).copied().ok_or_else(|| {
                AttError::InvalidParameter(format!(
                    "included service {} is not part of this server",
                    include.uuid
                ))
            })?;
            include.start_handle = start;
            include.end_handle = end;
        }
    }
    Ok(())
}
