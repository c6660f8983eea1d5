//! GATT Client implementation
//!
//! Discovery runs as explicit paging loops over an [`AttClient`]. A remote
//! Attribute Not Found ends a loop; it is the normal end-of-list signal.

use super::types::{Characteristic, Descriptor, Service};
use crate::att::{
    AttClient, AttError, CharacteristicProperties, ATT_HANDLE_MAX, ATT_HANDLE_MIN, CCCD_INDICATE,
    CCCD_NOTIFY, CHARACTERISTIC_UUID, CLIENT_CHAR_CONFIG_UUID, PRIMARY_SERVICE_UUID,
};
use crate::uuid::Uuid;
use log::{debug, trace};
use std::sync::Arc;

/// Error types specific to GATT operations
#[derive(Debug, thiserror::Error)]
pub enum GattError {
    #[error("Service not found")]
    ServiceNotFound,

    #[error("Characteristic not found")]
    CharacteristicNotFound,

    #[error("Descriptor not found")]
    DescriptorNotFound,

    #[error("Attribute operation not permitted")]
    NotPermitted,

    #[error("Invalid data received")]
    InvalidData,

    #[error("ATT error: {0}")]
    AttError(#[from] AttError),
}

/// Result of one page request; `None` once the server reports no more attributes
fn page<T>(result: Result<Vec<T>, AttError>) -> Result<Option<Vec<T>>, GattError> {
    match result {
        Ok(entries) if entries.is_empty() => Ok(None),
        Ok(entries) => Ok(Some(entries)),
        Err(e) if e.is_attribute_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Start handle of the page after one that ended at `last`, or `None` when `last`
/// reaches `end`. A server that does not move forward is rejected.
fn next_start(start: u16, last: u16, end: u16) -> Result<Option<u16>, GattError> {
    if last < start {
        return Err(GattError::InvalidData);
    }
    if last >= end {
        return Ok(None);
    }
    Ok(Some(last + 1))
}

/// GATT Client
pub struct GattClient {
    att: Arc<AttClient>,
}

impl GattClient {
    pub fn new(att: Arc<AttClient>) -> Self {
        Self { att }
    }

    /// Underlying ATT client
    pub fn att_client(&self) -> &Arc<AttClient> {
        &self.att
    }

    /// Negotiate the MTU
    pub fn exchange_mtu(&self) -> Result<u16, GattError> {
        Ok(self.att.exchange_mtu()?)
    }

    /// Set notification callback
    pub fn set_notification_callback<F>(&self, callback: F)
    where
        F: Fn(u16, &[u8]) + Send + Sync + 'static,
    {
        self.att.set_notification_callback(callback);
    }

    /// Set indication callback
    pub fn set_indication_callback<F>(&self, callback: F)
    where
        F: Fn(u16, &[u8]) + Send + Sync + 'static,
    {
        self.att.set_indication_callback(callback);
    }

    /// Discover primary services, all of them or only those with UUID `filter`
    pub fn discover_services(&self, filter: Option<Uuid>) -> Result<Vec<Service>, GattError> {
        let services = match filter {
            Some(uuid) => self.discover_services_by_uuid(uuid)?,
            None => self.discover_all_services()?,
        };
        debug!("discovered {} services", services.len());
        Ok(services)
    }

    fn discover_all_services(&self) -> Result<Vec<Service>, GattError> {
        let primary = Uuid::from_u16(PRIMARY_SERVICE_UUID);
        let mut services = Vec::new();
        let mut start = ATT_HANDLE_MIN;

        loop {
            trace!("service discovery page from 0x{:04x}", start);
            let Some(entries) = page(self.att.read_by_group_type(start, ATT_HANDLE_MAX, primary))?
            else {
                break;
            };

            let mut last = 0;
            for entry in entries {
                let uuid = Uuid::try_from_slice_le(&entry.value).ok_or(GattError::InvalidData)?;
                services.push(Service {
                    uuid,
                    is_primary: true,
                    start_handle: entry.handle,
                    end_handle: entry.end_group_handle,
                });
                last = last.max(entry.end_group_handle);
            }

            match next_start(start, last, ATT_HANDLE_MAX)? {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(services)
    }

    fn discover_services_by_uuid(&self, uuid: Uuid) -> Result<Vec<Service>, GattError> {
        let value = uuid.to_bytes();
        let mut services = Vec::new();
        let mut start = ATT_HANDLE_MIN;

        loop {
            trace!("service discovery by {} from 0x{:04x}", uuid, start);
            let Some(ranges) = page(self.att.find_by_type_value(
                start,
                ATT_HANDLE_MAX,
                PRIMARY_SERVICE_UUID,
                &value,
            ))?
            else {
                break;
            };

            let mut last = 0;
            for range in ranges {
                services.push(Service {
                    uuid,
                    is_primary: true,
                    start_handle: range.found_handle,
                    end_handle: range.group_end_handle,
                });
                last = last.max(range.group_end_handle);
            }

            match next_start(start, last, ATT_HANDLE_MAX)? {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(services)
    }

    /// Discover the characteristics of `service`, optionally only those with UUID `filter`
    pub fn discover_characteristics(
        &self,
        service: &Service,
        filter: Option<Uuid>,
    ) -> Result<Vec<Characteristic>, GattError> {
        let declaration = Uuid::from_u16(CHARACTERISTIC_UUID);
        let mut characteristics: Vec<Characteristic> = Vec::new();
        let mut start = service.start_handle;

        while start <= service.end_handle {
            trace!("characteristic discovery page from 0x{:04x}", start);
            let Some(entries) = page(self.att.read_by_type(start, service.end_handle, declaration))?
            else {
                break;
            };

            let mut last = 0;
            for entry in entries {
                if entry.handle == 0
                    || entry.handle < service.start_handle
                    || entry.handle > service.end_handle
                {
                    return Err(GattError::InvalidData);
                }
                characteristics.push(parse_declaration(entry.handle, &entry.value)?);
                last = last.max(entry.handle);
            }

            match next_start(start, last, service.end_handle)? {
                Some(next) => start = next,
                None => break,
            }
        }

        characteristics.sort_by_key(|c| c.declaration_handle);
        characteristics.dedup_by_key(|c| c.declaration_handle);

        // Each characteristic ends right before the next declaration
        for i in 0..characteristics.len() {
            let end = match characteristics.get(i + 1) {
                Some(next) => next
                    .declaration_handle
                    .checked_sub(1)
                    .ok_or(GattError::InvalidData)?,
                None => service.end_handle,
            };
            characteristics[i].end_handle = end;
        }

        if let Some(uuid) = filter {
            characteristics.retain(|c| c.uuid == uuid);
        }
        Ok(characteristics)
    }

    /// Discover the descriptors that follow the value of `characteristic`
    pub fn discover_descriptors(
        &self,
        characteristic: &Characteristic,
    ) -> Result<Vec<Descriptor>, GattError> {
        let end = characteristic.end_handle;
        let mut descriptors = Vec::new();
        let Some(mut start) = characteristic.value_handle.checked_add(1) else {
            return Ok(descriptors);
        };

        while start <= end {
            let Some(pairs) = page(self.att.find_information(start, end))? else {
                break;
            };

            let mut last = 0;
            for pair in pairs {
                descriptors.push(Descriptor {
                    handle: pair.handle,
                    uuid: pair.uuid,
                });
                last = last.max(pair.handle);
            }

            match next_start(start, last, end)? {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(descriptors)
    }

    /// Find a primary service by UUID
    pub fn find_service(&self, uuid: Uuid) -> Result<Service, GattError> {
        self.discover_services(Some(uuid))?
            .into_iter()
            .next()
            .ok_or(GattError::ServiceNotFound)
    }

    /// Find a characteristic by UUID within a service
    pub fn find_characteristic(
        &self,
        service: &Service,
        uuid: Uuid,
    ) -> Result<Characteristic, GattError> {
        self.discover_characteristics(service, Some(uuid))?
            .into_iter()
            .next()
            .ok_or(GattError::CharacteristicNotFound)
    }

    /// Read a characteristic's value
    pub fn read_characteristic(
        &self,
        characteristic: &Characteristic,
    ) -> Result<Vec<u8>, GattError> {
        if !characteristic.properties.can_read() {
            return Err(GattError::NotPermitted);
        }
        Ok(self.att.read(characteristic.value_handle)?)
    }

    /// Write to a characteristic with response
    pub fn write_characteristic(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
    ) -> Result<(), GattError> {
        if !characteristic.properties.can_write() {
            return Err(GattError::NotPermitted);
        }
        Ok(self.att.write(characteristic.value_handle, data)?)
    }

    /// Write to a characteristic without response
    pub fn write_characteristic_without_response(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
    ) -> Result<(), GattError> {
        if !characteristic.properties.can_write_without_response() {
            return Err(GattError::NotPermitted);
        }
        Ok(self.att.write_command(characteristic.value_handle, data)?)
    }

    /// Enable notifications for a characteristic
    pub fn enable_notifications(&self, characteristic: &Characteristic) -> Result<(), GattError> {
        if !characteristic.properties.can_notify() {
            return Err(GattError::NotPermitted);
        }
        self.write_client_configuration(characteristic, CCCD_NOTIFY)
    }

    /// Enable indications for a characteristic
    pub fn enable_indications(&self, characteristic: &Characteristic) -> Result<(), GattError> {
        if !characteristic.properties.can_indicate() {
            return Err(GattError::NotPermitted);
        }
        self.write_client_configuration(characteristic, CCCD_INDICATE)
    }

    /// Disable notifications and indications for a characteristic
    pub fn disable_notifications(&self, characteristic: &Characteristic) -> Result<(), GattError> {
        self.write_client_configuration(characteristic, 0)
    }

    fn write_client_configuration(
        &self,
        characteristic: &Characteristic,
        bits: u16,
    ) -> Result<(), GattError> {
        let cccd = self
            .discover_descriptors(characteristic)?
            .into_iter()
            .find(|d| d.uuid == CLIENT_CHAR_CONFIG_UUID)
            .ok_or(GattError::DescriptorNotFound)?;
        debug!(
            "client configuration 0x{:04x} <- 0x{:04x}",
            cccd.handle, bits
        );
        Ok(self.att.write(cccd.handle, &bits.to_le_bytes())?)
    }
}

/// Parse a characteristic declaration value: properties, value handle, 2 or 16 byte UUID.
fn parse_declaration(handle: u16, value: &[u8]) -> Result<Characteristic, GattError> {
    if value.len() != 5 && value.len() != 19 {
        return Err(GattError::InvalidData);
    }
    let value_handle = u16::from_le_bytes([value[1], value[2]]);
    let uuid = Uuid::try_from_slice_le(&value[3..]).ok_or(GattError::InvalidData)?;

    Ok(Characteristic {
        uuid,
        declaration_handle: handle,
        value_handle,
        end_handle: value_handle,
        properties: CharacteristicProperties::from_bits_truncate(value[0]),
    })
}
