//! Example connecting a GATT client to a GATT server in the same process
//!
//! Both sides talk over channel transports pumped by two threads, the way an
//! L2CAP fixed channel would be wired up. Run with `RUST_LOG=debug` to watch the PDUs.

use rustygatt::att::{AttClient, AttClientConfig, ChannelTransport};
use rustygatt::gatt::{GattCharacteristic, GattClient, GattServer, GattServerConfig, GattService};
use rustygatt::{CharacteristicProperties, Uuid};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Battery service with a notifying level
    let battery = GattService::primary(Uuid::from_u16(0x180F)).with_characteristic(
        GattCharacteristic::new(
            Uuid::from_u16(0x2A19),
            CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
            100u8,
        )
        .with_cccd(),
    );
    let server = GattServer::with_default_services(
        GattServerConfig {
            mtu: 247,
            ..Default::default()
        },
        "RustyGatt Loopback",
        vec![battery],
    )?;
    println!("Server ready with {} attributes", server.database().len());

    // Wire the two ends together
    let (server_transport, server_out) = ChannelTransport::new();
    let connection = server.accept(Arc::new(server_transport));
    let (client_transport, client_out) = ChannelTransport::new();
    let att = Arc::new(AttClient::new(
        Arc::new(client_transport),
        AttClientConfig {
            mtu: 247,
            ..Default::default()
        },
    ));

    let server_side = Arc::clone(&connection);
    thread::spawn(move || {
        for pdu in client_out {
            if let Err(e) = server_side.handle_pdu(&pdu) {
                eprintln!("server: {}", e);
            }
        }
    });
    let client_side = Arc::clone(&att);
    thread::spawn(move || {
        for pdu in server_out {
            if let Err(e) = client_side.handle_pdu(&pdu) {
                eprintln!("client: {}", e);
            }
        }
    });

    let client = GattClient::new(att);
    println!("Negotiated MTU: {}", client.exchange_mtu()?);

    for service in client.discover_services(None)? {
        println!(
            "Service {} (0x{:04x}-0x{:04x})",
            service.uuid, service.start_handle, service.end_handle
        );
        for characteristic in client.discover_characteristics(&service, None)? {
            println!(
                "  Characteristic {} value 0x{:04x} {:?}",
                characteristic.uuid, characteristic.value_handle, characteristic.properties
            );
            if characteristic.properties.can_read() {
                let value = client.read_characteristic(&characteristic)?;
                println!("    = {:02x?}", value);
            }
        }
    }

    client.set_notification_callback(|handle, value| {
        println!("Notification 0x{:04x}: {:02x?}", handle, value);
    });
    let battery = client.find_service(Uuid::from_u16(0x180F))?;
    let level = client.find_characteristic(&battery, Uuid::from_u16(0x2A19))?;
    client.enable_notifications(&level)?;

    for percent in [90u8, 80, 70] {
        server.set_value(level.value_handle, percent)?;
        thread::sleep(Duration::from_millis(50));
    }

    client.disable_notifications(&level)?;
    server.stop();
    Ok(())
}
