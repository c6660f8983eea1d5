//! ATT Client implementation
//!
//! One request is outstanding at a time. The caller's thread blocks until the link
//! owner feeds the matching response (or an Error Response) into [`AttClient::handle_pdu`],
//! the configured timeout elapses, or the client is closed.

use super::constants::*;
use super::error::{AttError, AttResult};
use super::transport::Transport;
use super::types::*;
use crate::uuid::Uuid;
use log::{debug, trace, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::time::Duration;

/// Value notification / indication callback
pub type ValueCallback = Arc<dyn Fn(u16, &[u8]) + Send + Sync>;

/// ATT Client configuration
#[derive(Debug, Clone)]
pub struct AttClientConfig {
    /// Rx MTU offered in an MTU exchange
    pub mtu: u16,
    /// How long a request waits for its response
    pub request_timeout: Duration,
}

impl Default for AttClientConfig {
    fn default() -> Self {
        Self {
            mtu: ATT_DEFAULT_MTU,
            request_timeout: Duration::from_millis(ATT_TRANSACTION_TIMEOUT_MS),
        }
    }
}

/// Outstanding request
struct PendingRequest {
    /// Opcode of the request awaiting a response
    opcode: u8,
    responder: SyncSender<AttResult<Vec<u8>>>,
}

/// ATT Client
pub struct AttClient {
    transport: Arc<dyn Transport>,
    /// Rx MTU offered in an MTU exchange
    client_mtu: u16,
    /// Negotiated MTU
    mtu: AtomicU16,
    request_timeout: RwLock<Duration>,
    /// Serializes request/response transactions
    transaction_lock: Mutex<()>,
    pending: Mutex<Option<PendingRequest>>,
    notification_callback: RwLock<Option<ValueCallback>>,
    indication_callback: RwLock<Option<ValueCallback>>,
    closed: AtomicBool,
}

impl AttClient {
    /// Create a new ATT client on `transport`
    pub fn new(transport: Arc<dyn Transport>, config: AttClientConfig) -> Self {
        Self {
            transport,
            client_mtu: config.mtu.clamp(ATT_DEFAULT_MTU, ATT_MAX_MTU),
            mtu: AtomicU16::new(ATT_DEFAULT_MTU),
            request_timeout: RwLock::new(config.request_timeout),
            transaction_lock: Mutex::new(()),
            pending: Mutex::new(None),
            notification_callback: RwLock::new(None),
            indication_callback: RwLock::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Get the current MTU
    pub fn mtu(&self) -> u16 {
        self.mtu.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Change how long later requests wait for a response
    pub fn set_request_timeout(&self, timeout: Duration) {
        *self.request_timeout.write() = timeout;
    }

    /// Set notification callback
    pub fn set_notification_callback<F>(&self, callback: F)
    where
        F: Fn(u16, &[u8]) + Send + Sync + 'static,
    {
        *self.notification_callback.write() = Some(Arc::new(callback));
    }

    /// Set indication callback; the confirmation is sent after it returns
    pub fn set_indication_callback<F>(&self, callback: F)
    where
        F: Fn(u16, &[u8]) + Send + Sync + 'static,
    {
        *self.indication_callback.write() = Some(Arc::new(callback));
    }

    /// Exchange MTU
    pub fn exchange_mtu(&self) -> AttResult<u16> {
        let response: ExchangeMtuResponse = self.send_request(ExchangeMtuRequest {
            client_mtu: self.client_mtu,
        })?;

        let effective = response
            .server_mtu
            .max(ATT_DEFAULT_MTU)
            .min(self.client_mtu);
        self.mtu.store(effective, Ordering::Release);
        self.transport.set_mtu(effective);
        debug!("MTU negotiated: {}", effective);

        Ok(effective)
    }

    /// Find information
    pub fn find_information(
        &self,
        start_handle: u16,
        end_handle: u16,
    ) -> AttResult<Vec<HandleUuidPair>> {
        let response: FindInformationResponse = self.send_request(FindInformationRequest {
            start_handle,
            end_handle,
        })?;
        Ok(response.information_data)
    }

    /// Find by type value
    pub fn find_by_type_value(
        &self,
        start_handle: u16,
        end_handle: u16,
        attribute_type: u16,
        value: &[u8],
    ) -> AttResult<Vec<HandleRange>> {
        let response: FindByTypeValueResponse = self.send_request(FindByTypeValueRequest {
            start_handle,
            end_handle,
            attribute_type,
            attribute_value: value.to_vec(),
        })?;
        Ok(response.handles)
    }

    /// Read by type
    pub fn read_by_type(
        &self,
        start_handle: u16,
        end_handle: u16,
        attribute_type: Uuid,
    ) -> AttResult<Vec<HandleValue>> {
        let response: ReadByTypeResponse = self.send_request(ReadByTypeRequest {
            start_handle,
            end_handle,
            attribute_type,
        })?;
        Ok(response.data)
    }

    /// Read by group type
    pub fn read_by_group_type(
        &self,
        start_handle: u16,
        end_handle: u16,
        group_type: Uuid,
    ) -> AttResult<Vec<AttributeData>> {
        let response: ReadByGroupTypeResponse = self.send_request(ReadByGroupTypeRequest {
            start_handle,
            end_handle,
            group_type,
        })?;
        Ok(response.data)
    }

    /// Read attribute
    pub fn read(&self, handle: u16) -> AttResult<Vec<u8>> {
        let response: ReadResponse = self.send_request(ReadRequest { handle })?;
        Ok(response.value)
    }

    /// Write request
    pub fn write(&self, handle: u16, value: &[u8]) -> AttResult<()> {
        self.check_value_length(value)?;
        let _: WriteResponse = self.send_request(WriteRequest {
            handle,
            value: value.to_vec(),
        })?;
        Ok(())
    }

    /// Write command (no response)
    pub fn write_command(&self, handle: u16, value: &[u8]) -> AttResult<()> {
        self.check_value_length(value)?;
        self.send_command(WriteCommand {
            handle,
            value: value.to_vec(),
        })
    }

    /// Fail the outstanding request, if any, and refuse further ones
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(pending) = self.pending.lock().take() {
            let _ = pending.responder.try_send(Err(AttError::ConnectionClosed));
        }
        debug!("ATT client closed");
    }

    /// Route one inbound PDU from the server
    pub fn handle_pdu(&self, data: &[u8]) -> AttResult<()> {
        let Some(&opcode) = data.first() else {
            return Err(AttError::InvalidPdu);
        };
        trace!("ATT client rx opcode 0x{:02x}", opcode);

        match opcode {
            ATT_ERROR_RSP => {
                let error = ErrorResponse::parse(data)?;
                self.complete(
                    error.request_opcode,
                    Err(AttError::Protocol(error.error_code, error.handle)),
                );
                Ok(())
            }
            ATT_HANDLE_VALUE_NTF => {
                let notification = HandleValueNotification::parse(data)?;
                let callback = self.notification_callback.read().clone();
                match callback {
                    Some(callback) => callback(notification.handle, &notification.value),
                    None => trace!("notification on 0x{:04x} dropped", notification.handle),
                }
                Ok(())
            }
            ATT_HANDLE_VALUE_IND => {
                let indication = HandleValueIndication::parse(data)?;
                let callback = self.indication_callback.read().clone();
                if let Some(callback) = callback {
                    callback(indication.handle, &indication.value);
                }
                self.send_command(HandleValueConfirmation)
            }
            _ => match request_opcode_for(opcode) {
                Some(request_opcode) => {
                    self.complete(request_opcode, Ok(data.to_vec()));
                    Ok(())
                }
                None => {
                    warn!("unexpected ATT opcode 0x{:02x} from server", opcode);
                    Err(AttError::InvalidPdu)
                }
            },
        }
    }

    fn complete(&self, request_opcode: u8, result: AttResult<Vec<u8>>) {
        let mut pending = self.pending.lock();
        match pending.as_ref() {
            Some(request) if request.opcode == request_opcode => {
                if let Some(request) = pending.take() {
                    let _ = request.responder.try_send(result);
                }
            }
            _ => warn!(
                "response for opcode 0x{:02x} with no matching request",
                request_opcode
            ),
        }
    }

    fn check_value_length(&self, value: &[u8]) -> AttResult<()> {
        if value.len() > self.mtu() as usize - 3 {
            return Err(AttError::InvalidAttributeValueLength);
        }
        Ok(())
    }

    /// Send request and wait for response
    fn send_request<Req, Rsp>(&self, request: Req) -> AttResult<Rsp>
    where
        Req: AttPacket,
        Rsp: AttPacket,
    {
        let _transaction = self.transaction_lock.lock();
        if self.is_closed() {
            return Err(AttError::ConnectionClosed);
        }

        let (responder, response) = mpsc::sync_channel(1);
        *self.pending.lock() = Some(PendingRequest {
            opcode: Req::opcode(),
            responder,
        });
        // close() may have run before the request was registered
        if self.is_closed() {
            self.pending.lock().take();
            return Err(AttError::ConnectionClosed);
        }

        if let Err(e) = self.transport.write(&request.serialize()) {
            self.pending.lock().take();
            return Err(e);
        }

        let timeout = *self.request_timeout.read();
        match response.recv_timeout(timeout) {
            Ok(result) => Rsp::parse(&result?),
            Err(RecvTimeoutError::Timeout) => {
                self.pending.lock().take();
                warn!(
                    "ATT request 0x{:02x} timed out after {:?}",
                    Req::opcode(),
                    timeout
                );
                Err(AttError::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(AttError::ConnectionClosed),
        }
    }

    /// Send command (no response expected)
    fn send_command<Cmd: AttPacket>(&self, command: Cmd) -> AttResult<()> {
        if self.is_closed() {
            return Err(AttError::ConnectionClosed);
        }
        self.transport.write(&command.serialize())
    }
}
