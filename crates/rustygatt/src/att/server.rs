//! ATT Server implementation
//!
//! [`AttServer`] owns the attribute database shared by every link. Each accepted link
//! gets a [`ClientConnection`] holding the per-link state: negotiated MTU, the pending
//! indication flag and the client's notify/indicate subscriptions.

use super::constants::*;
use super::database::{AttributeDatabase, ListenerId, ValueListener};
use super::error::{AttError, AttErrorCode, AttResult};
use super::transport::Transport;
use super::types::*;
use crate::uuid::Uuid;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// ATT Server configuration
#[derive(Debug, Clone)]
pub struct AttServerConfig {
    /// Server Rx MTU advertised during MTU exchange
    pub mtu: u16,
    /// How long an indication may stay unconfirmed before the link is failed.
    /// `None` waits forever.
    pub indication_timeout: Option<Duration>,
}

impl Default for AttServerConfig {
    fn default() -> Self {
        Self {
            mtu: ATT_DEFAULT_MTU,
            indication_timeout: Some(Duration::from_millis(ATT_TRANSACTION_TIMEOUT_MS)),
        }
    }
}

/// How value changes are pushed to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Handle Value Notification, unacknowledged
    Notify,
    /// Handle Value Indication, one in flight until confirmed
    Indicate,
}

struct Subscription {
    mode: DeliveryMode,
    listener: ListenerId,
}

/// Result of a request handler: the encoded response or the error to send back
type Reply = Result<Vec<u8>, ErrorResponse>;

/// ATT Server
pub struct AttServer {
    /// Attribute database
    database: Arc<AttributeDatabase>,
    /// Server configuration
    config: AttServerConfig,
    /// Accepted links
    clients: Mutex<Vec<Weak<ClientConnection>>>,
}

impl AttServer {
    /// Create a new ATT server over `database`
    pub fn new(database: Arc<AttributeDatabase>, mut config: AttServerConfig) -> Self {
        config.mtu = config.mtu.clamp(ATT_DEFAULT_MTU, ATT_MAX_MTU);
        Self {
            database,
            config,
            clients: Mutex::new(Vec::new()),
        }
    }

    /// Get server configuration
    pub fn config(&self) -> &AttServerConfig {
        &self.config
    }

    /// Attribute database served to every client
    pub fn database(&self) -> &Arc<AttributeDatabase> {
        &self.database
    }

    /// Accept a client connection on `transport`
    pub fn accept_client(&self, transport: Arc<dyn Transport>) -> Arc<ClientConnection> {
        let connection = Arc::new_cyclic(|weak_self| ClientConnection {
            database: Arc::clone(&self.database),
            transport,
            server_mtu: self.config.mtu,
            indication_timeout: self.config.indication_timeout,
            mtu: AtomicU16::new(ATT_DEFAULT_MTU),
            awaiting_confirmation: AtomicBool::new(false),
            indication_sent_at: Mutex::new(None),
            closed: AtomicBool::new(false),
            request_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
            subscriptions: Mutex::new(HashMap::new()),
            weak_self: weak_self.clone(),
        });

        let mut clients = self.clients.lock();
        clients.retain(|client| client.upgrade().is_some_and(|c| !c.is_closed()));
        clients.push(Arc::downgrade(&connection));
        debug!("ATT client accepted ({} connected)", clients.len());

        connection
    }

    /// Number of open client connections
    pub fn connected_clients(&self) -> usize {
        self.clients
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|c| !c.is_closed())
            .count()
    }

    /// Close every client connection
    pub fn stop(&self) {
        let clients: Vec<_> = self.clients.lock().drain(..).collect();
        for client in clients.iter().filter_map(Weak::upgrade) {
            client.close();
        }
    }
}

/// Server side of one ATT link
pub struct ClientConnection {
    database: Arc<AttributeDatabase>,
    transport: Arc<dyn Transport>,
    server_mtu: u16,
    indication_timeout: Option<Duration>,
    /// Negotiated MTU
    mtu: AtomicU16,
    /// Set while an indication waits for its confirmation
    awaiting_confirmation: AtomicBool,
    indication_sent_at: Mutex<Option<Instant>>,
    closed: AtomicBool,
    /// Held for the whole of one inbound PDU
    request_lock: Mutex<()>,
    /// Held for each transport write
    write_lock: Mutex<()>,
    /// Value handle -> active delivery
    subscriptions: Mutex<HashMap<u16, Subscription>>,
    weak_self: Weak<ClientConnection>,
}

impl ClientConnection {
    /// Negotiated MTU
    pub fn mtu(&self) -> u16 {
        self.mtu.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// True while an indication is waiting for confirmation
    pub fn awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation.load(Ordering::Acquire)
    }

    /// Active delivery mode for a value handle
    pub fn delivery_mode(&self, handle: u16) -> Option<DeliveryMode> {
        self.subscriptions.lock().get(&handle).map(|s| s.mode)
    }

    /// Process one inbound PDU. The response, if any, has been handed to the
    /// transport when this returns.
    pub fn handle_pdu(&self, data: &[u8]) -> AttResult<()> {
        self.ensure_open()?;
        let _request = self.request_lock.lock();

        let Some(&opcode) = data.first() else {
            return Err(AttError::InvalidPdu);
        };
        trace!("ATT rx opcode 0x{:02x}, {} bytes", opcode, data.len());

        match opcode {
            ATT_EXCHANGE_MTU_REQ => self.respond(self.handle_exchange_mtu_request(data)),
            ATT_FIND_INFO_REQ => self.respond(self.handle_find_information_request(data)),
            ATT_FIND_BY_TYPE_VALUE_REQ => {
                self.respond(self.handle_find_by_type_value_request(data))
            }
            ATT_READ_BY_TYPE_REQ => self.respond(self.handle_read_by_type_request(data)),
            ATT_READ_REQ => self.respond(self.handle_read_request(data)),
            ATT_READ_BLOB_REQ => self.respond(self.handle_read_blob_request(data)),
            ATT_READ_MULTIPLE_REQ => self.respond(self.handle_read_multiple_request(data)),
            ATT_READ_BY_GROUP_TYPE_REQ => {
                self.respond(self.handle_read_by_group_type_request(data))
            }
            ATT_WRITE_REQ => self.handle_write_request(data),
            ATT_WRITE_CMD => {
                self.handle_write_command(data);
                Ok(())
            }
            ATT_HANDLE_VALUE_CONF => {
                self.handle_confirmation();
                Ok(())
            }
            ATT_ERROR_RSP => {
                match ErrorResponse::parse(data) {
                    Ok(err) => warn!(
                        "peer reported {:?} for opcode 0x{:02x} on handle 0x{:04x}",
                        err.error_code, err.request_opcode, err.handle
                    ),
                    Err(_) => warn!("malformed error response from peer"),
                }
                Ok(())
            }
            _ => self.respond(Err(ErrorResponse::new(
                opcode,
                0,
                AttErrorCode::RequestNotSupported,
            ))),
        }
    }

    fn respond(&self, reply: Reply) -> AttResult<()> {
        match reply {
            Ok(pdu) => self.send(&pdu),
            Err(error) => {
                debug!(
                    "ATT error response {:?} for opcode 0x{:02x}, handle 0x{:04x}",
                    error.error_code, error.request_opcode, error.handle
                );
                self.send(&error.serialize())
            }
        }
    }

    fn handle_exchange_mtu_request(&self, data: &[u8]) -> Reply {
        let request =
            ExchangeMtuRequest::parse(data).map_err(|e| malformed(ATT_EXCHANGE_MTU_REQ, &e))?;

        let effective = request.client_mtu.min(self.server_mtu).max(ATT_DEFAULT_MTU);
        self.mtu.store(effective, Ordering::Release);
        self.transport.set_mtu(effective);
        debug!(
            "MTU exchange: client {} server {} -> {}",
            request.client_mtu, self.server_mtu, effective
        );

        Ok(ExchangeMtuResponse {
            server_mtu: self.server_mtu,
        }
        .serialize())
    }

    fn handle_find_information_request(&self, data: &[u8]) -> Reply {
        let request =
            FindInformationRequest::parse(data).map_err(|e| malformed(ATT_FIND_INFO_REQ, &e))?;
        check_range(ATT_FIND_INFO_REQ, request.start_handle, request.end_handle)?;

        let attributes = self
            .database
            .find_range(request.start_handle, request.end_handle, None, None);
        let Some(first) = attributes.first() else {
            return Err(not_found(ATT_FIND_INFO_REQ, request.start_handle));
        };

        // Width of the first entry fixes the format for the whole response
        let long = first.type_.is_long();
        let (format, pair_size) = if long {
            (ATT_FIND_INFO_RSP_FORMAT_128BIT, 18)
        } else {
            (ATT_FIND_INFO_RSP_FORMAT_16BIT, 4)
        };

        let mtu = self.mtu() as usize;
        let mut size = 2;
        let mut information_data = Vec::new();
        for attr in &attributes {
            if attr.type_.is_long() != long || size + pair_size > mtu {
                break;
            }
            information_data.push(HandleUuidPair {
                handle: attr.handle,
                uuid: attr.type_,
            });
            size += pair_size;
        }

        Ok(FindInformationResponse {
            format,
            information_data,
        }
        .serialize())
    }

    fn handle_find_by_type_value_request(&self, data: &[u8]) -> Reply {
        let request = FindByTypeValueRequest::parse(data)
            .map_err(|e| malformed(ATT_FIND_BY_TYPE_VALUE_REQ, &e))?;
        check_range(
            ATT_FIND_BY_TYPE_VALUE_REQ,
            request.start_handle,
            request.end_handle,
        )?;

        let type_ = Uuid::from_u16(request.attribute_type);
        let attributes = self.database.find_range(
            request.start_handle,
            request.end_handle,
            Some(&type_),
            Some(&request.attribute_value),
        );
        if attributes.is_empty() {
            return Err(not_found(ATT_FIND_BY_TYPE_VALUE_REQ, request.start_handle));
        }

        let capacity = (self.mtu() as usize - 1) / 4;
        let handles = attributes
            .iter()
            .take(capacity)
            .map(|attr| HandleRange {
                found_handle: attr.handle,
                group_end_handle: attr.end_handle,
            })
            .collect();

        Ok(FindByTypeValueResponse { handles }.serialize())
    }

    fn handle_read_by_type_request(&self, data: &[u8]) -> Reply {
        let request =
            ReadByTypeRequest::parse(data).map_err(|e| malformed(ATT_READ_BY_TYPE_REQ, &e))?;
        check_range(ATT_READ_BY_TYPE_REQ, request.start_handle, request.end_handle)?;

        let attributes = self.database.find_range(
            request.start_handle,
            request.end_handle,
            Some(&request.attribute_type),
            None,
        );
        let Some(first) = attributes.first() else {
            return Err(not_found(ATT_READ_BY_TYPE_REQ, request.start_handle));
        };
        first
            .check_read()
            .map_err(|e| ErrorResponse::from_error(ATT_READ_BY_TYPE_REQ, &e))?;

        let mtu = self.mtu() as usize;
        let raw_len = first.value.len();
        let value_len = raw_len.min(mtu - 4).min(ATT_MAX_READ_BY_TYPE_VALUE);

        let mut size = 2;
        let mut entries = Vec::new();
        for attr in &attributes {
            if attr.value.len() != raw_len || !attr.permissions.can_read() {
                break;
            }
            if size + 2 + value_len > mtu {
                break;
            }
            entries.push(HandleValue {
                handle: attr.handle,
                value: attr.value[..value_len].to_vec(),
            });
            size += 2 + value_len;
        }

        Ok(ReadByTypeResponse {
            length: (value_len + 2) as u8,
            data: entries,
        }
        .serialize())
    }

    fn handle_read_request(&self, data: &[u8]) -> Reply {
        let request = ReadRequest::parse(data).map_err(|e| malformed(ATT_READ_REQ, &e))?;

        let attr = self
            .database
            .get(request.handle)
            .ok_or_else(|| not_found(ATT_READ_REQ, request.handle))?;
        attr.check_read()
            .map_err(|e| ErrorResponse::from_error(ATT_READ_REQ, &e))?;

        let mut value = attr.value;
        value.truncate(self.mtu() as usize - 1);
        Ok(ReadResponse { value }.serialize())
    }

    fn handle_read_blob_request(&self, data: &[u8]) -> Reply {
        let request =
            ReadBlobRequest::parse(data).map_err(|e| malformed(ATT_READ_BLOB_REQ, &e))?;
        Err(ErrorResponse::new(
            ATT_READ_BLOB_REQ,
            request.handle,
            AttErrorCode::RequestNotSupported,
        ))
    }

    fn handle_read_multiple_request(&self, data: &[u8]) -> Reply {
        let request =
            ReadMultipleRequest::parse(data).map_err(|e| malformed(ATT_READ_MULTIPLE_REQ, &e))?;
        Err(ErrorResponse::new(
            ATT_READ_MULTIPLE_REQ,
            request.handles.first().copied().unwrap_or(0),
            AttErrorCode::RequestNotSupported,
        ))
    }

    fn handle_read_by_group_type_request(&self, data: &[u8]) -> Reply {
        let request = ReadByGroupTypeRequest::parse(data)
            .map_err(|e| malformed(ATT_READ_BY_GROUP_TYPE_REQ, &e))?;
        check_range(
            ATT_READ_BY_GROUP_TYPE_REQ,
            request.start_handle,
            request.end_handle,
        )?;

        if request.group_type != PRIMARY_SERVICE_UUID
            && request.group_type != SECONDARY_SERVICE_UUID
        {
            return Err(ErrorResponse::new(
                ATT_READ_BY_GROUP_TYPE_REQ,
                request.start_handle,
                AttErrorCode::UnsupportedGroupType,
            ));
        }

        let attributes = self.database.find_range(
            request.start_handle,
            request.end_handle,
            Some(&request.group_type),
            None,
        );
        let Some(first) = attributes.first() else {
            return Err(not_found(ATT_READ_BY_GROUP_TYPE_REQ, request.start_handle));
        };

        let mtu = self.mtu() as usize;
        let raw_len = first.value.len();
        let value_len = raw_len.min(mtu - 6).min(ATT_MAX_READ_BY_GROUP_TYPE_VALUE);

        let mut size = 2;
        let mut entries = Vec::new();
        for attr in &attributes {
            if attr.value.len() != raw_len || size + 4 + value_len > mtu {
                break;
            }
            entries.push(AttributeData {
                handle: attr.handle,
                end_group_handle: attr.end_handle,
                value: attr.value[..value_len].to_vec(),
            });
            size += 4 + value_len;
        }

        Ok(ReadByGroupTypeResponse {
            length: (value_len + 4) as u8,
            data: entries,
        }
        .serialize())
    }

    fn handle_write_request(&self, data: &[u8]) -> AttResult<()> {
        let request = match WriteRequest::parse(data) {
            Ok(request) => request,
            Err(e) => return self.respond(Err(malformed(ATT_WRITE_REQ, &e))),
        };

        match self.apply_write(request.handle, request.value, CharacteristicProperties::WRITE) {
            Ok(configuration) => {
                let initial = configuration
                    .and_then(|mode| self.apply_client_configuration(request.handle, mode));
                self.send(&WriteResponse.serialize())?;
                if let Some((handle, value, mode)) = initial {
                    self.push_initial_value(handle, &value, mode);
                }
                Ok(())
            }
            Err(e) => self.respond(Err(ErrorResponse::new(
                ATT_WRITE_REQ,
                request.handle,
                e.to_error_code(),
            ))),
        }
    }

    fn handle_write_command(&self, data: &[u8]) {
        let command = match WriteCommand::parse(data) {
            Ok(command) => command,
            Err(_) => {
                debug!("dropping malformed write command");
                return;
            }
        };

        match self.apply_write(
            command.handle,
            command.value,
            CharacteristicProperties::WRITE_WITHOUT_RESPONSE,
        ) {
            Ok(Some(mode)) => {
                if let Some((handle, value, mode)) =
                    self.apply_client_configuration(command.handle, mode)
                {
                    self.push_initial_value(handle, &value, mode);
                }
            }
            Ok(None) => {}
            Err(e) => debug!("write command on 0x{:04x} ignored: {}", command.handle, e),
        }
    }

    /// Validates and stores a written value. For Client Characteristic Configuration
    /// descriptors, returns the delivery change the client asked for.
    fn apply_write(
        &self,
        handle: u16,
        value: Vec<u8>,
        required: CharacteristicProperties,
    ) -> AttResult<Option<Option<DeliveryMode>>> {
        let attr = self
            .database
            .get(handle)
            .ok_or(AttError::InvalidHandle(handle))?;
        if !attr.permissions.contains(required) {
            return Err(AttError::WriteNotPermitted(handle));
        }

        let configuration = if attr.type_ == CLIENT_CHAR_CONFIG_UUID {
            Some(parse_client_configuration(&value)?)
        } else {
            None
        };

        self.database.write_value(handle, value)?;
        Ok(configuration)
    }

    /// Applies a Client Characteristic Configuration change to the subscriptions. A newly
    /// registered delivery is returned with the value to push once the write is answered.
    fn apply_client_configuration(
        &self,
        descriptor_handle: u16,
        mode: Option<DeliveryMode>,
    ) -> Option<(u16, Vec<u8>, DeliveryMode)> {
        let Some(value_handle) = self
            .database
            .characteristic_value_handle_for(descriptor_handle)
        else {
            warn!(
                "client configuration 0x{:04x} has no owning characteristic",
                descriptor_handle
            );
            return None;
        };

        if self.delivery_mode(value_handle) != mode {
            self.disable_delivery(value_handle);
        }
        let mode = mode?;
        match self.register_delivery(value_handle, mode) {
            Ok(initial) => initial.map(|value| (value_handle, value, mode)),
            Err(e) => {
                warn!("client configuration on 0x{:04x} failed: {}", value_handle, e);
                None
            }
        }
    }

    fn push_initial_value(&self, handle: u16, value: &[u8], mode: DeliveryMode) {
        if let Err(e) = self.push_value(handle, value, mode) {
            warn!("initial value push on 0x{:04x} failed: {}", handle, e);
        }
    }

    fn handle_confirmation(&self) {
        if self.awaiting_confirmation.swap(false, Ordering::AcqRel) {
            *self.indication_sent_at.lock() = None;
            trace!("indication confirmed");
        } else {
            debug!("unexpected handle value confirmation");
        }
    }

    /// Start pushing value changes of `handle` as notifications
    pub fn enable_notifications(&self, handle: u16) -> AttResult<()> {
        self.enable_delivery(handle, DeliveryMode::Notify)
    }

    /// Start pushing value changes of `handle` as indications
    pub fn enable_indications(&self, handle: u16) -> AttResult<()> {
        self.enable_delivery(handle, DeliveryMode::Indicate)
    }

    fn enable_delivery(&self, handle: u16, mode: DeliveryMode) -> AttResult<()> {
        match self.register_delivery(handle, mode)? {
            Some(value) => self.push_value(handle, &value, mode).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Subscribes to value changes of `handle`. Returns the current value when a new
    /// subscription was made, `None` when `mode` was already active.
    fn register_delivery(&self, handle: u16, mode: DeliveryMode) -> AttResult<Option<Vec<u8>>> {
        self.ensure_open()?;

        let attr = self
            .database
            .get(handle)
            .ok_or(AttError::InvalidHandle(handle))?;
        let supported = match mode {
            DeliveryMode::Notify => attr.permissions.can_notify(),
            DeliveryMode::Indicate => attr.permissions.can_indicate(),
        };
        if !supported {
            return Err(AttError::InvalidParameter(format!(
                "handle 0x{:04x} does not support {:?}",
                handle, mode
            )));
        }

        {
            let mut subscriptions = self.subscriptions.lock();
            if let Some(existing) = subscriptions.get(&handle) {
                if existing.mode == mode {
                    return Ok(None);
                }
                return Err(AttError::DeliveryModeConflict(handle));
            }

            let connection = self.weak_self.clone();
            let listener: ValueListener = Arc::new(move |handle, value| {
                if let Some(connection) = connection.upgrade() {
                    if let Err(e) = connection.push_value(handle, value, mode) {
                        warn!("value push on 0x{:04x} failed: {}", handle, e);
                    }
                }
            });
            let listener = self.database.subscribe(handle, listener)?;
            subscriptions.insert(handle, Subscription { mode, listener });
        }

        debug!("{:?} enabled on 0x{:04x}", mode, handle);
        Ok(Some(attr.value))
    }

    /// Stop pushing value changes of `handle`; returns false if nothing was active
    pub fn disable_delivery(&self, handle: u16) -> bool {
        match self.subscriptions.lock().remove(&handle) {
            Some(subscription) => {
                self.database.unsubscribe(handle, subscription.listener);
                debug!("{:?} disabled on 0x{:04x}", subscription.mode, handle);
                true
            }
            None => false,
        }
    }

    /// Push one value to the client. Returns false when an indication was suppressed
    /// because an earlier one is still unconfirmed.
    pub fn push_value(&self, handle: u16, value: &[u8], mode: DeliveryMode) -> AttResult<bool> {
        self.ensure_open()?;

        let max = self.mtu() as usize - ATT_NOTIFICATION_HEADER_SIZE;
        let value = value[..value.len().min(max)].to_vec();

        match mode {
            DeliveryMode::Notify => {
                self.send(&HandleValueNotification { handle, value }.serialize())?;
                Ok(true)
            }
            DeliveryMode::Indicate => {
                if self
                    .awaiting_confirmation
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    self.check_timeouts()?;
                    debug!("indication on 0x{:04x} suppressed, confirmation pending", handle);
                    return Ok(false);
                }

                *self.indication_sent_at.lock() = Some(Instant::now());
                if let Err(e) = self.send(&HandleValueIndication { handle, value }.serialize()) {
                    self.awaiting_confirmation.store(false, Ordering::Release);
                    *self.indication_sent_at.lock() = None;
                    return Err(e);
                }
                Ok(true)
            }
        }
    }

    /// Fails the connection if an indication has gone unconfirmed for longer than the
    /// configured timeout.
    pub fn check_timeouts(&self) -> AttResult<()> {
        let Some(timeout) = self.indication_timeout else {
            return Ok(());
        };
        if !self.awaiting_confirmation() {
            return Ok(());
        }

        let expired = self
            .indication_sent_at
            .lock()
            .is_some_and(|sent| sent.elapsed() >= timeout);
        if expired {
            warn!("indication unconfirmed after {:?}, closing connection", timeout);
            self.close();
            return Err(AttError::Timeout);
        }
        Ok(())
    }

    /// Close the link: later operations fail with `ConnectionClosed`, the pending
    /// indication flag is released and all subscriptions are dropped.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.awaiting_confirmation.store(false, Ordering::Release);
        *self.indication_sent_at.lock() = None;

        let subscriptions: Vec<_> = self.subscriptions.lock().drain().collect();
        for (handle, subscription) in subscriptions {
            self.database.unsubscribe(handle, subscription.listener);
        }
        debug!("ATT client connection closed");
    }

    fn ensure_open(&self) -> AttResult<()> {
        if self.is_closed() {
            Err(AttError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn send(&self, pdu: &[u8]) -> AttResult<()> {
        self.ensure_open()?;
        let _write = self.write_lock.lock();
        self.transport.write(pdu)
    }
}

fn malformed(opcode: u8, error: &AttError) -> ErrorResponse {
    ErrorResponse::from_error(opcode, error)
}

fn not_found(opcode: u8, handle: u16) -> ErrorResponse {
    ErrorResponse::new(opcode, handle, AttErrorCode::AttributeNotFound)
}

fn check_range(opcode: u8, start: u16, end: u16) -> Result<(), ErrorResponse> {
    if start == 0 || start > end {
        return Err(ErrorResponse::new(opcode, start, AttErrorCode::InvalidHandle));
    }
    Ok(())
}

fn parse_client_configuration(value: &[u8]) -> AttResult<Option<DeliveryMode>> {
    let bits = match value {
        [lo, hi] => u16::from_le_bytes([*lo, *hi]),
        _ => return Err(AttError::InvalidAttributeValueLength),
    };
    match (bits & CCCD_NOTIFY != 0, bits & CCCD_INDICATE != 0) {
        (false, false) => Ok(None),
        (true, false) => Ok(Some(DeliveryMode::Notify)),
        (false, true) => Ok(Some(DeliveryMode::Indicate)),
        (true, true) => Err(AttError::ValueNotAllowed),
    }
}
