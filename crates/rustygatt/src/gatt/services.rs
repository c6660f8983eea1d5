//! Predefined services: GAP, GATT and Device Information

use super::server::{GattCharacteristic, GattService};
use super::types::AttributeValue;
use crate::att::CharacteristicProperties;
use crate::uuid::Uuid;

// Service UUIDs
pub const GAP_SERVICE_UUID: u16 = 0x1800;
pub const GATT_SERVICE_UUID: u16 = 0x1801;
pub const DEVICE_INFORMATION_SERVICE_UUID: u16 = 0x180A;

// Characteristic UUIDs
pub const DEVICE_NAME_UUID: u16 = 0x2A00;
pub const APPEARANCE_UUID: u16 = 0x2A01;
pub const PERIPHERAL_PRIVACY_FLAG_UUID: u16 = 0x2A02;
pub const RECONNECTION_ADDRESS_UUID: u16 = 0x2A03;
pub const PREFERRED_CONNECTION_PARAMS_UUID: u16 = 0x2A04;
pub const SERVICE_CHANGED_UUID: u16 = 0x2A05;
pub const SYSTEM_ID_UUID: u16 = 0x2A23;
pub const MODEL_NUMBER_UUID: u16 = 0x2A24;
pub const SERIAL_NUMBER_UUID: u16 = 0x2A25;
pub const FIRMWARE_REVISION_UUID: u16 = 0x2A26;
pub const HARDWARE_REVISION_UUID: u16 = 0x2A27;
pub const SOFTWARE_REVISION_UUID: u16 = 0x2A28;
pub const MANUFACTURER_NAME_UUID: u16 = 0x2A29;

/// Peripheral Preferred Connection Parameters, in controller units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferredConnectionParameters {
    pub min_interval: u16,
    pub max_interval: u16,
    pub slave_latency: u16,
    pub supervision_timeout: u16,
}

impl PreferredConnectionParameters {
    fn to_bytes(self) -> Vec<u8> {
        [
            self.min_interval,
            self.max_interval,
            self.slave_latency,
            self.supervision_timeout,
        ]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
    }
}

/// Optional GAP characteristics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapServiceOptions {
    /// Appearance category, 0 for unknown
    pub appearance: u16,
    pub privacy_flag: Option<bool>,
    /// Reconnection address, least significant byte first
    pub reconnection_address: Option<[u8; 6]>,
    pub preferred_connection_params: Option<PreferredConnectionParameters>,
}

/// Generic Access service. With default options it occupies five handles: the service
/// declaration plus Device Name and Appearance.
pub fn gap_service(device_name: &str, options: &GapServiceOptions) -> GattService {
    let read = CharacteristicProperties::READ;
    let mut service = GattService::primary(Uuid::from_u16(GAP_SERVICE_UUID))
        .with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(DEVICE_NAME_UUID),
            read,
            device_name,
        ))
        .with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(APPEARANCE_UUID),
            read,
            options.appearance.to_le_bytes(),
        ));

    if let Some(enabled) = options.privacy_flag {
        service = service.with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(PERIPHERAL_PRIVACY_FLAG_UUID),
            read,
            u8::from(enabled),
        ));
    }
    if let Some(address) = options.reconnection_address {
        service = service.with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(RECONNECTION_ADDRESS_UUID),
            CharacteristicProperties::WRITE,
            address,
        ));
    }
    if let Some(params) = options.preferred_connection_params {
        service = service.with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(PREFERRED_CONNECTION_PARAMS_UUID),
            read,
            params.to_bytes(),
        ));
    }
    service
}

/// Generic Attribute service carrying an indicatable Service Changed characteristic
pub fn gatt_service() -> GattService {
    GattService::primary(Uuid::from_u16(GATT_SERVICE_UUID)).with_characteristic(
        GattCharacteristic::new(
            Uuid::from_u16(SERVICE_CHANGED_UUID),
            CharacteristicProperties::INDICATE,
            [0x01u8, 0x00, 0xFF, 0xFF],
        )
        .with_cccd(),
    )
}

/// Device Information strings; absent fields are left out of the service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInformation {
    pub manufacturer_name: Option<String>,
    pub model_number: Option<String>,
    pub serial_number: Option<String>,
    pub hardware_revision: Option<String>,
    pub firmware_revision: Option<String>,
    pub software_revision: Option<String>,
    pub system_id: Option<[u8; 8]>,
}

/// Device Information service with one read-only characteristic per populated field
pub fn device_information_service(info: &DeviceInformation) -> GattService {
    let fields: [(u16, Option<AttributeValue>); 7] = [
        (MANUFACTURER_NAME_UUID, info.manufacturer_name.clone().map(Into::into)),
        (MODEL_NUMBER_UUID, info.model_number.clone().map(Into::into)),
        (SERIAL_NUMBER_UUID, info.serial_number.clone().map(Into::into)),
        (HARDWARE_REVISION_UUID, info.hardware_revision.clone().map(Into::into)),
        (FIRMWARE_REVISION_UUID, info.firmware_revision.clone().map(Into::into)),
        (SOFTWARE_REVISION_UUID, info.software_revision.clone().map(Into::into)),
        (SYSTEM_ID_UUID, info.system_id.map(Into::into)),
    ];

    fields
        .into_iter()
        .filter_map(|(uuid, value)| value.map(|v| (uuid, v)))
        .fold(
            GattService::primary(Uuid::from_u16(DEVICE_INFORMATION_SERVICE_UUID)),
            |service, (uuid, value)| {
                service.with_characteristic(GattCharacteristic::new(
                    Uuid::from_u16(uuid),
                    CharacteristicProperties::READ,
                    value,
                ))
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gap_layout() {
        let mut gap = gap_service("rusty", &GapServiceOptions::default());
        assert_eq!(gap.set_handle(1).unwrap(), 5);

        let attributes = gap.get_attributes();
        assert_eq!(attributes.len(), 5);
        assert_eq!(attributes[2].value, b"rusty".to_vec());
        assert_eq!(attributes[4].value, vec![0x00, 0x00]);
    }

    #[test]
    fn test_gap_optional_characteristics() {
        let options = GapServiceOptions {
            appearance: 0x0340,
            privacy_flag: Some(true),
            reconnection_address: Some([1, 2, 3, 4, 5, 6]),
            preferred_connection_params: Some(PreferredConnectionParameters {
                min_interval: 6,
                max_interval: 12,
                slave_latency: 0,
                supervision_timeout: 400,
            }),
        };
        let mut gap = gap_service("rusty", &options);
        assert_eq!(gap.set_handle(1).unwrap(), 11);

        let appearance = gap.characteristic(&Uuid::from_u16(APPEARANCE_UUID)).unwrap();
        assert_eq!(appearance.value.to_bytes(), vec![0x40, 0x03]);
        let params = gap
            .characteristic(&Uuid::from_u16(PREFERRED_CONNECTION_PARAMS_UUID))
            .unwrap();
        assert_eq!(params.value.to_bytes(), vec![6, 0, 12, 0, 0, 0, 0x90, 0x01]);
    }

    #[test]
    fn test_gatt_service_changed_is_indicatable() {
        let service = gatt_service();
        let changed = &service.characteristics[0];
        assert!(changed.properties.can_indicate());
        assert_eq!(changed.descriptors.len(), 1);
    }

    #[test]
    fn test_device_information_skips_missing_fields() {
        let info = DeviceInformation {
            manufacturer_name: Some("Acme".into()),
            firmware_revision: Some("1.0.2".into()),
            ..Default::default()
        };
        let service = device_information_service(&info);
        let uuids: Vec<Uuid> = service.characteristics.iter().map(|c| c.uuid).collect();
        assert_eq!(
            uuids,
            vec![
                Uuid::from_u16(MANUFACTURER_NAME_UUID),
                Uuid::from_u16(FIRMWARE_REVISION_UUID)
            ]
        );
        assert_eq!(service.characteristics[1].value.to_bytes(), b"1.0.2".to_vec());
    }
}
