//! Unit tests for GATT functionality

use super::*;
use crate::att::tests::{connect_pair, init_logging, wait_until, RecordingTransport};
use crate::att::{
    AttClient, AttClientConfig, AttError, AttPacket, AttResult, CharacteristicProperties,
    DeliveryMode, FindInformationResponse, Transport, ATT_DEFAULT_MTU,
    ATT_FIND_INFO_RSP_FORMAT_16BIT, CHARACTERISTIC_UUID, CLIENT_CHAR_CONFIG_UUID, INCLUDE_UUID,
    PRIMARY_SERVICE_UUID,
};
use crate::uuid::Uuid;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

const HEART_RATE_SERVICE: u16 = 0x180D;
const HEART_RATE_MEASUREMENT: u16 = 0x2A37;
const BODY_SENSOR_LOCATION: u16 = 0x2A38;
const HEART_RATE_CONTROL_POINT: u16 = 0x2A39;
const VENDOR_SERVICE: u16 = 0xFFE0;
const VENDOR_CHARACTERISTIC: u16 = 0xFFE1;

fn long_service_uuid() -> Uuid {
    Uuid::of("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap()
}

fn long_characteristic_uuid() -> Uuid {
    Uuid::of("6e400003-b5a3-f393-e0a9-e50e24dcca9e").unwrap()
}

fn heart_rate_service() -> GattService {
    GattService::primary(Uuid::from_u16(HEART_RATE_SERVICE))
        .with_characteristic(
            GattCharacteristic::new(
                Uuid::from_u16(HEART_RATE_MEASUREMENT),
                CharacteristicProperties::NOTIFY,
                [0x06u8, 60],
            )
            .with_cccd(),
        )
        .with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(BODY_SENSOR_LOCATION),
            CharacteristicProperties::READ,
            1u8,
        ))
        .with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(HEART_RATE_CONTROL_POINT),
            CharacteristicProperties::WRITE,
            0u8,
        ))
        .with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(VENDOR_CHARACTERISTIC),
            CharacteristicProperties::READ | CharacteristicProperties::WRITE_WITHOUT_RESPONSE,
            "idle",
        ))
}

fn uart_service() -> GattService {
    GattService::primary(long_service_uuid()).with_characteristic(GattCharacteristic::new(
        long_characteristic_uuid(),
        CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
        "hello",
    ))
}

/// GAP 1-5, GATT 6-9, heart rate 10-19, UART 20-22
fn sample_server() -> GattServer {
    GattServer::with_default_services(
        GattServerConfig::default(),
        "rusty",
        vec![heart_rate_service(), uart_service()],
    )
    .unwrap()
}

#[test]
fn test_handles_are_contiguous_from_one() {
    let server = sample_server();
    let attributes = server.database().attributes();
    let handles: Vec<u16> = attributes.iter().map(|a| a.handle).collect();
    assert_eq!(handles, (1..=22).collect::<Vec<u16>>());

    let ranges: Vec<(u16, u16)> = server
        .services()
        .iter()
        .map(|s| (s.handle, s.end_handle))
        .collect();
    assert_eq!(ranges, vec![(1, 5), (6, 9), (10, 19), (20, 22)]);
}

#[test]
fn test_declaration_embeds_value_handle() {
    let server = sample_server();
    for attr in server.database().attributes() {
        if attr.type_ == CHARACTERISTIC_UUID {
            let value_handle = u16::from_le_bytes([attr.value[1], attr.value[2]]);
            assert_eq!(value_handle, attr.handle + 1);
        }
    }
}

#[test]
fn test_set_handle_is_idempotent() {
    let mut service = heart_rate_service();
    assert_eq!(service.set_handle(1).unwrap(), 10);
    let first = service.clone();
    assert_eq!(service.set_handle(1).unwrap(), 10);
    assert_eq!(service, first);

    // Re-layout at another base moves everything along
    assert_eq!(service.set_handle(40).unwrap(), 49);
    let measurement = &service.characteristics[0];
    assert_eq!(measurement.declaration_handle, 41);
    assert_eq!(measurement.value_handle, 42);
    assert_eq!(measurement.end_handle(), 43);
    assert_eq!(measurement.declaration_value()[1..3], 42u16.to_le_bytes());

    let attributes = service.get_attributes();
    assert_eq!(attributes[0].handle, 40);
    assert_eq!(attributes[0].end_handle, 49);
    assert_eq!(attributes.last().map(|a| a.handle), Some(49));
}

#[test]
fn test_set_handle_rejects_exhausted_space() {
    let mut service = heart_rate_service();
    assert!(matches!(
        service.set_handle(0xFFF8),
        Err(AttError::HandleSpaceExhausted)
    ));
    assert!(matches!(service.set_handle(0), Err(AttError::InvalidHandle(0))));

    let mut small = GattService::primary(Uuid::from_u16(VENDOR_SERVICE));
    assert_eq!(small.set_handle(0xFFFF).unwrap(), 0xFFFF);
}

#[test]
fn test_server_rejects_overflowing_layout() {
    // 1 declaration + 0x7FFF two-handle characteristics fill the space exactly
    let full = (0..0x7FFF).fold(
        GattService::primary(Uuid::from_u16(VENDOR_SERVICE)),
        |service, _| {
            service.with_characteristic(GattCharacteristic::new(
                Uuid::from_u16(VENDOR_CHARACTERISTIC),
                CharacteristicProperties::READ,
                0u8,
            ))
        },
    );
    let mut laid_out = full.clone();
    assert_eq!(laid_out.set_handle(1).unwrap(), 0xFFFF);

    let services = vec![full, GattService::primary(Uuid::from_u16(HEART_RATE_SERVICE))];
    assert!(matches!(
        GattServer::new(GattServerConfig::default(), services),
        Err(AttError::HandleSpaceExhausted)
    ));
}

#[test]
fn test_includes_resolve_to_service_range() {
    let battery = GattService::secondary(Uuid::from_u16(0x180F)).with_characteristic(
        GattCharacteristic::new(Uuid::from_u16(0x2A19), CharacteristicProperties::READ, 90u8),
    );
    let main = GattService::primary(Uuid::from_u16(VENDOR_SERVICE))
        .with_include(Uuid::from_u16(0x180F))
        .with_characteristic(GattCharacteristic::new(
            Uuid::from_u16(VENDOR_CHARACTERISTIC),
            CharacteristicProperties::READ,
            1u8,
        ));

    let server = GattServer::new(GattServerConfig::default(), vec![main, battery]).unwrap();
    // main: 1 decl, 2 include, 3-4 characteristic; battery: 5-7
    let include = server.database().get(2).unwrap();
    assert_eq!(include.type_, INCLUDE_UUID);
    assert_eq!(include.value, vec![5, 0, 7, 0, 0x0F, 0x18]);
    assert_eq!(server.database().get(5).unwrap().type_, 0x2801u16);

    let dangling = GattService::primary(Uuid::from_u16(VENDOR_SERVICE))
        .with_include(Uuid::from_u16(0x180F));
    assert!(matches!(
        GattServer::new(GattServerConfig::default(), vec![dangling]),
        Err(AttError::InvalidParameter(_))
    ));
}

#[test]
fn test_default_services_not_duplicated() {
    let server = GattServer::with_default_services(
        GattServerConfig::default(),
        "rusty",
        vec![gap_service("mine", &GapServiceOptions::default())],
    )
    .unwrap();
    let uuids: Vec<Uuid> = server.services().iter().map(|s| s.uuid).collect();
    assert_eq!(uuids, vec![Uuid::from_u16(0x1801), Uuid::from_u16(0x1800)]);
    assert!(server
        .database()
        .attributes()
        .iter()
        .any(|a| a.value == b"mine".to_vec()));
}

#[test]
fn test_set_value_updates_database() {
    let server = sample_server();
    server.set_value(15, 3u8).unwrap();
    assert_eq!(server.value(15), Some(vec![3]));
    assert!(matches!(server.set_value(0x100, "x"), Err(AttError::InvalidHandle(0x100))));
}

#[test]
fn test_find_information_end_to_end() {
    init_logging();
    let vendor = GattService::primary(Uuid::from_u16(VENDOR_SERVICE)).with_characteristic(
        GattCharacteristic::new(
            Uuid::from_u16(VENDOR_CHARACTERISTIC),
            CharacteristicProperties::READ,
            "v",
        ),
    );
    let server = GattServer::new(
        GattServerConfig {
            mtu: 64,
            ..Default::default()
        },
        vec![gap_service("rusty", &GapServiceOptions::default()), vendor],
    )
    .unwrap();
    assert_eq!(server.services()[0].end_handle, 5);
    assert_eq!(
        (server.services()[1].handle, server.services()[1].end_handle),
        (6, 8)
    );

    let transport = RecordingTransport::new();
    let connection = server.accept(transport.clone());
    connection.handle_pdu(&[0x02, 64, 0]).unwrap();
    assert_eq!(transport.take(), vec![vec![0x03, 64, 0]]);

    connection.handle_pdu(&[0x04, 1, 0, 8, 0]).unwrap();
    let sent = transport.take();
    let rsp = FindInformationResponse::parse(&sent[0]).unwrap();
    assert_eq!(rsp.format, ATT_FIND_INFO_RSP_FORMAT_16BIT);

    let handles: Vec<u16> = rsp.information_data.iter().map(|p| p.handle).collect();
    assert_eq!(handles, (1..=8).collect::<Vec<u16>>());
    assert!(rsp.information_data.iter().all(|p| !p.uuid.is_long()));
    assert_eq!(rsp.information_data[0].uuid, PRIMARY_SERVICE_UUID);
    assert_eq!(rsp.information_data[7].uuid, VENDOR_CHARACTERISTIC);
}

fn connected(server: &GattServer) -> (GattClient, Arc<crate::att::ClientConnection>) {
    init_logging();
    let (att, connection) = connect_pair(server.att_server(), AttClientConfig::default());
    (GattClient::new(att), connection)
}

#[test]
fn test_discover_services_pages_through_all() {
    let server = sample_server();
    let (client, _connection) = connected(&server);

    let services = client.discover_services(None).unwrap();
    let found: Vec<(Uuid, u16, u16)> = services
        .iter()
        .map(|s| (s.uuid, s.start_handle, s.end_handle))
        .collect();
    assert_eq!(
        found,
        vec![
            (Uuid::from_u16(0x1800), 1, 5),
            (Uuid::from_u16(0x1801), 6, 9),
            (Uuid::from_u16(HEART_RATE_SERVICE), 10, 19),
            (long_service_uuid(), 20, 22),
        ]
    );
}

#[test]
fn test_discover_services_by_uuid() {
    let server = sample_server();
    let (client, _connection) = connected(&server);

    let heart_rate = client
        .find_service(Uuid::from_u16(HEART_RATE_SERVICE))
        .unwrap();
    assert_eq!((heart_rate.start_handle, heart_rate.end_handle), (10, 19));

    let uart = client.discover_services(Some(long_service_uuid())).unwrap();
    assert_eq!(uart.len(), 1);
    assert_eq!(uart[0].start_handle, 20);

    assert!(matches!(
        client.find_service(Uuid::from_u16(0x1810)),
        Err(GattError::ServiceNotFound)
    ));
}

#[test]
fn test_discover_characteristics_derives_end_handles() {
    let server = sample_server();
    let (client, _connection) = connected(&server);
    let heart_rate = client
        .find_service(Uuid::from_u16(HEART_RATE_SERVICE))
        .unwrap();

    let characteristics = client.discover_characteristics(&heart_rate, None).unwrap();
    let layout: Vec<(u16, u16, u16)> = characteristics
        .iter()
        .map(|c| (c.declaration_handle, c.value_handle, c.end_handle))
        .collect();
    assert_eq!(layout, vec![(11, 12, 13), (14, 15, 15), (16, 17, 17), (18, 19, 19)]);
    assert!(characteristics[0].properties.can_notify());

    let filtered = client
        .discover_characteristics(&heart_rate, Some(Uuid::from_u16(BODY_SENSOR_LOCATION)))
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].end_handle, 15);

    let uart = client.find_service(long_service_uuid()).unwrap();
    let tx = client
        .find_characteristic(&uart, long_characteristic_uuid())
        .unwrap();
    assert_eq!(tx.value_handle, 22);
    assert!(matches!(
        client.find_characteristic(&uart, Uuid::from_u16(0x2A00)),
        Err(GattError::CharacteristicNotFound)
    ));
}

#[test]
fn test_discover_descriptors() {
    let server = sample_server();
    let (client, _connection) = connected(&server);
    let heart_rate = client
        .find_service(Uuid::from_u16(HEART_RATE_SERVICE))
        .unwrap();
    let characteristics = client.discover_characteristics(&heart_rate, None).unwrap();

    let descriptors = client.discover_descriptors(&characteristics[0]).unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].handle, 13);
    assert_eq!(descriptors[0].uuid, CLIENT_CHAR_CONFIG_UUID);

    assert!(client.discover_descriptors(&characteristics[1]).unwrap().is_empty());
}

#[test]
fn test_read_and_write_characteristics() {
    let server = sample_server();
    let (client, _connection) = connected(&server);
    let heart_rate = client
        .find_service(Uuid::from_u16(HEART_RATE_SERVICE))
        .unwrap();
    let characteristics = client.discover_characteristics(&heart_rate, None).unwrap();
    let (location, control, vendor) = (
        &characteristics[1],
        &characteristics[2],
        &characteristics[3],
    );

    assert_eq!(client.read_characteristic(location).unwrap(), vec![1]);
    assert!(matches!(
        client.read_characteristic(control),
        Err(GattError::NotPermitted)
    ));

    client.write_characteristic(control, &[1]).unwrap();
    assert_eq!(server.value(17), Some(vec![1]));
    assert!(matches!(
        client.write_characteristic(location, &[2]),
        Err(GattError::NotPermitted)
    ));

    client
        .write_characteristic_without_response(vendor, b"busy")
        .unwrap();
    assert!(wait_until(|| server.value(19) == Some(b"busy".to_vec())));
    assert_eq!(client.read_characteristic(vendor).unwrap(), b"busy".to_vec());
}

#[test]
fn test_notifications_through_client_configuration() {
    let server = sample_server();
    let (client, connection) = connected(&server);

    let received: Arc<Mutex<Vec<(u16, Vec<u8>)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    client.set_notification_callback(move |handle, value| {
        sink.lock().push((handle, value.to_vec()));
    });

    let heart_rate = client
        .find_service(Uuid::from_u16(HEART_RATE_SERVICE))
        .unwrap();
    let measurement = client
        .find_characteristic(&heart_rate, Uuid::from_u16(HEART_RATE_MEASUREMENT))
        .unwrap();

    client.enable_notifications(&measurement).unwrap();
    assert!(wait_until(|| received.lock().len() == 1));
    assert_eq!(connection.delivery_mode(12), Some(DeliveryMode::Notify));

    server.set_value(12, [0x06u8, 72]).unwrap();
    assert!(wait_until(|| received.lock().len() == 2));
    assert_eq!(
        *received.lock(),
        vec![(12, vec![0x06, 60]), (12, vec![0x06, 72])]
    );

    client.disable_notifications(&measurement).unwrap();
    assert_eq!(connection.delivery_mode(12), None);

    assert!(matches!(
        client.enable_indications(&measurement),
        Err(GattError::NotPermitted)
    ));
}

#[test]
fn test_service_changed_indication_is_confirmed() {
    let server = sample_server();
    let (client, connection) = connected(&server);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    client.set_indication_callback(move |handle, value| {
        sink.lock().push((handle, value.to_vec()));
    });

    let gatt = client.find_service(Uuid::from_u16(0x1801)).unwrap();
    let changed = client
        .find_characteristic(&gatt, Uuid::from_u16(0x2A05))
        .unwrap();
    client.enable_indications(&changed).unwrap();

    assert!(wait_until(|| received.lock().len() == 1));
    assert_eq!(received.lock()[0], (8, vec![0x01, 0x00, 0xFF, 0xFF]));
    assert!(wait_until(|| !connection.awaiting_confirmation()));

    server.set_value(8, [0x0Au8, 0x00, 0x16, 0x00]).unwrap();
    assert!(wait_until(|| received.lock().len() == 2));
}

/// Peer that answers each request with the next canned PDU
struct ScriptedPeer {
    client: Mutex<Weak<AttClient>>,
    replies: Mutex<VecDeque<Vec<u8>>>,
}

impl Transport for ScriptedPeer {
    fn write(&self, _pdu: &[u8]) -> AttResult<()> {
        let reply = self.replies.lock().pop_front();
        let client = self.client.lock().upgrade();
        if let (Some(reply), Some(client)) = (reply, client) {
            client.handle_pdu(&reply)?;
        }
        Ok(())
    }

    fn mtu(&self) -> u16 {
        ATT_DEFAULT_MTU
    }

    fn set_mtu(&self, _mtu: u16) {}
}

fn scripted_client(replies: Vec<Vec<u8>>) -> GattClient {
    init_logging();
    let peer = Arc::new(ScriptedPeer {
        client: Mutex::new(Weak::new()),
        replies: Mutex::new(replies.into()),
    });
    let att = Arc::new(AttClient::new(peer.clone(), AttClientConfig::default()));
    *peer.client.lock() = Arc::downgrade(&att);
    GattClient::new(att)
}

/// Read By Type response carrying `(declaration handle, value handle, uuid)` entries
fn declarations(entries: &[(u16, u16, u16)]) -> Vec<u8> {
    let mut pdu = vec![0x09, 7];
    for &(handle, value_handle, uuid) in entries {
        pdu.extend_from_slice(&handle.to_le_bytes());
        pdu.push(CharacteristicProperties::READ.bits());
        pdu.extend_from_slice(&value_handle.to_le_bytes());
        pdu.extend_from_slice(&uuid.to_le_bytes());
    }
    pdu
}

fn scripted_service() -> Service {
    Service {
        uuid: Uuid::from_u16(VENDOR_SERVICE),
        is_primary: true,
        start_handle: 1,
        end_handle: 10,
    }
}

#[test]
fn test_characteristics_out_of_order_are_sorted() {
    let client = scripted_client(vec![
        declarations(&[(7, 8, 0xFFE2), (4, 5, 0xFFE1)]),
        vec![0x01, 0x08, 8, 0, 0x0A],
    ]);

    let characteristics = client
        .discover_characteristics(&scripted_service(), None)
        .unwrap();
    let layout: Vec<(u16, u16, u16)> = characteristics
        .iter()
        .map(|c| (c.declaration_handle, c.value_handle, c.end_handle))
        .collect();
    assert_eq!(layout, vec![(4, 5, 6), (7, 8, 10)]);
}

#[test]
fn test_characteristic_declaration_outside_service_is_rejected() {
    let client = scripted_client(vec![declarations(&[(5, 6, 0xFFE1), (0, 1, 0xFFE2)])]);
    assert!(matches!(
        client.discover_characteristics(&scripted_service(), None),
        Err(GattError::InvalidData)
    ));

    let client = scripted_client(vec![declarations(&[(5, 6, 0xFFE1), (12, 13, 0xFFE2)])]);
    assert!(matches!(
        client.discover_characteristics(&scripted_service(), None),
        Err(GattError::InvalidData)
    ));
}

#[test]
fn test_duplicate_characteristic_declarations_collapse() {
    let client = scripted_client(vec![
        declarations(&[(2, 3, 0xFFE1), (2, 3, 0xFFE1), (6, 7, 0xFFE2)]),
        declarations(&[(8, 9, 0xFFE3)]),
        vec![0x01, 0x08, 9, 0, 0x0A],
    ]);
    let characteristics = client
        .discover_characteristics(&scripted_service(), None)
        .unwrap();
    let ends: Vec<(u16, u16)> = characteristics
        .iter()
        .map(|c| (c.declaration_handle, c.end_handle))
        .collect();
    assert_eq!(ends, vec![(2, 5), (6, 7), (8, 10)]);
}
