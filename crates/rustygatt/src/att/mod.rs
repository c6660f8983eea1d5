//! Attribute Protocol (ATT) implementation
//!
//! This module provides the ATT layer underneath GATT: the PDU codec, the attribute
//! database, the server-side request engine with notification and indication delivery,
//! and a blocking client.

pub mod client;
pub mod constants;
pub mod database;
pub mod error;
pub mod server;
pub mod transport;
pub mod types;


// Re-export the public API
pub use self::client::{AttClient, AttClientConfig, ValueCallback};
pub use self::constants::*;
pub use self::database::{Attribute, AttributeDatabase, ListenerId, ValueListener};
pub use self::error::{AttError, AttErrorCode, AttResult};
pub use self::server::{AttServer, AttServerConfig, ClientConnection, DeliveryMode};
pub use self::transport::{ChannelTransport, Transport};
pub use self::types::*;
