//! Type definitions for the ATT protocol
use super::constants::*;
use super::error::{AttError, AttErrorCode, AttResult};
use crate::uuid::Uuid;
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

bitflags! {
    /// Characteristic properties, also used as the access mask of value attributes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CharacteristicProperties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
        const AUTHENTICATED_SIGNED_WRITES = 0x40;
        const EXTENDED_PROPERTIES = 0x80;
    }
}

impl CharacteristicProperties {
    pub fn can_read(&self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(&self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_write_without_response(&self) -> bool {
        self.contains(Self::WRITE_WITHOUT_RESPONSE)
    }

    pub fn can_notify(&self) -> bool {
        self.contains(Self::NOTIFY)
    }

    pub fn can_indicate(&self) -> bool {
        self.contains(Self::INDICATE)
    }
}

/// ATT packet formats
pub trait AttPacket: Sized {
    /// Opcode for this packet
    fn opcode() -> u8;

    /// Parse packet from bytes, opcode included
    fn parse(data: &[u8]) -> AttResult<Self>;

    /// Serialize packet to bytes
    fn serialize(&self) -> Vec<u8>;
}

/// Checks opcode and minimum length, returning a cursor past the opcode.
fn body<'a>(data: &'a [u8], opcode: u8, min_len: usize) -> AttResult<Cursor<&'a [u8]>> {
    if data.len() < min_len || data.first() != Some(&opcode) {
        return Err(AttError::InvalidPdu);
    }
    Ok(Cursor::new(&data[1..]))
}

fn read_u16(cursor: &mut Cursor<&[u8]>) -> AttResult<u16> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|_| AttError::InvalidPdu)
}

/// Remaining bytes after the cursor position.
fn rest<'a>(cursor: &Cursor<&'a [u8]>) -> &'a [u8] {
    let inner: &'a [u8] = *cursor.get_ref();
    inner.get(cursor.position() as usize..).unwrap_or(&[])
}

fn parse_type(bytes: &[u8]) -> AttResult<Uuid> {
    Uuid::try_from_slice_le(bytes).ok_or(AttError::InvalidPdu)
}

/// Error response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Request opcode in error
    pub request_opcode: u8,
    /// Attribute handle in error
    pub handle: u16,
    /// Error code
    pub error_code: AttErrorCode,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(request_opcode: u8, handle: u16, error_code: AttErrorCode) -> Self {
        Self {
            request_opcode,
            handle,
            error_code,
        }
    }

    /// Create a new error response from an AttError
    pub fn from_error(request_opcode: u8, error: &AttError) -> Self {
        Self::new(
            request_opcode,
            error.handle().unwrap_or(0),
            error.to_error_code(),
        )
    }
}

impl AttPacket for ErrorResponse {
    fn opcode() -> u8 {
        ATT_ERROR_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 5)?;
        let request_opcode = data[1];
        cursor.set_position(1);
        let handle = read_u16(&mut cursor)?;

        Ok(Self {
            request_opcode,
            handle,
            error_code: data[4].into(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5);
        packet.push(Self::opcode());
        packet.push(self.request_opcode);
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.push(self.error_code.into());
        packet
    }
}

/// Exchange MTU Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeMtuRequest {
    /// Client Rx MTU size
    pub client_mtu: u16,
}

impl AttPacket for ExchangeMtuRequest {
    fn opcode() -> u8 {
        ATT_EXCHANGE_MTU_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 3)?;
        Ok(Self {
            client_mtu: read_u16(&mut cursor)?,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode()];
        packet.extend_from_slice(&self.client_mtu.to_le_bytes());
        packet
    }
}

/// Exchange MTU Response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeMtuResponse {
    /// Server Rx MTU size
    pub server_mtu: u16,
}

impl AttPacket for ExchangeMtuResponse {
    fn opcode() -> u8 {
        ATT_EXCHANGE_MTU_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 3)?;
        Ok(Self {
            server_mtu: read_u16(&mut cursor)?,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode()];
        packet.extend_from_slice(&self.server_mtu.to_le_bytes());
        packet
    }
}

/// Find Information Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindInformationRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
}

impl AttPacket for FindInformationRequest {
    fn opcode() -> u8 {
        ATT_FIND_INFO_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 5)?;
        Ok(Self {
            start_handle: read_u16(&mut cursor)?,
            end_handle: read_u16(&mut cursor)?,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5);
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet
    }
}

/// Handle and attribute type in a Find Information Response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleUuidPair {
    /// Attribute handle
    pub handle: u16,
    /// Attribute type
    pub uuid: Uuid,
}

/// Find Information Response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindInformationResponse {
    /// Format of information data (16-bit or 128-bit types)
    pub format: u8,
    /// List of handle-UUID pairs, all of the width given by `format`
    pub information_data: Vec<HandleUuidPair>,
}

impl FindInformationResponse {
    /// Width of one (handle, type) record for a given format byte.
    pub fn pair_size(format: u8) -> AttResult<usize> {
        match format {
            ATT_FIND_INFO_RSP_FORMAT_16BIT => Ok(4),
            ATT_FIND_INFO_RSP_FORMAT_128BIT => Ok(18),
            _ => Err(AttError::InvalidPdu),
        }
    }
}

impl AttPacket for FindInformationResponse {
    fn opcode() -> u8 {
        ATT_FIND_INFO_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        body(data, Self::opcode(), 2)?;
        let format = data[1];
        let pair_size = Self::pair_size(format)?;
        let records = &data[2..];
        if records.is_empty() || records.len() % pair_size != 0 {
            return Err(AttError::InvalidPdu);
        }

        let information_data = records
            .chunks_exact(pair_size)
            .map(|chunk| {
                Ok(HandleUuidPair {
                    handle: u16::from_le_bytes([chunk[0], chunk[1]]),
                    uuid: parse_type(&chunk[2..])?,
                })
            })
            .collect::<AttResult<Vec<_>>>()?;

        Ok(Self {
            format,
            information_data,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode(), self.format];
        for pair in &self.information_data {
            packet.extend_from_slice(&pair.handle.to_le_bytes());
            if self.format == ATT_FIND_INFO_RSP_FORMAT_128BIT {
                packet.extend_from_slice(pair.uuid.as_bytes_le());
            } else {
                packet.extend_from_slice(&pair.uuid.to_bytes());
            }
        }
        packet
    }
}

/// Find By Type Value Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindByTypeValueRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Attribute type (always a 16-bit UUID on the wire)
    pub attribute_type: u16,
    /// Attribute value to match
    pub attribute_value: Vec<u8>,
}

impl AttPacket for FindByTypeValueRequest {
    fn opcode() -> u8 {
        ATT_FIND_BY_TYPE_VALUE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 7)?;
        let start_handle = read_u16(&mut cursor)?;
        let end_handle = read_u16(&mut cursor)?;
        let attribute_type = read_u16(&mut cursor)?;

        Ok(Self {
            start_handle,
            end_handle,
            attribute_type,
            attribute_value: rest(&cursor).to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(7 + self.attribute_value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet.extend_from_slice(&self.attribute_type.to_le_bytes());
        packet.extend_from_slice(&self.attribute_value);
        packet
    }
}

/// Handle range in Find By Type Value Response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleRange {
    /// Found handle
    pub found_handle: u16,
    /// Group end handle
    pub group_end_handle: u16,
}

/// Find By Type Value Response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindByTypeValueResponse {
    /// List of handle ranges
    pub handles: Vec<HandleRange>,
}

impl AttPacket for FindByTypeValueResponse {
    fn opcode() -> u8 {
        ATT_FIND_BY_TYPE_VALUE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        body(data, Self::opcode(), 5)?;
        let records = &data[1..];
        if records.len() % 4 != 0 {
            return Err(AttError::InvalidPdu);
        }

        let handles = records
            .chunks_exact(4)
            .map(|chunk| HandleRange {
                found_handle: u16::from_le_bytes([chunk[0], chunk[1]]),
                group_end_handle: u16::from_le_bytes([chunk[2], chunk[3]]),
            })
            .collect();

        Ok(Self { handles })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(1 + self.handles.len() * 4);
        packet.push(Self::opcode());
        for range in &self.handles {
            packet.extend_from_slice(&range.found_handle.to_le_bytes());
            packet.extend_from_slice(&range.group_end_handle.to_le_bytes());
        }
        packet
    }
}

/// Read By Type Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadByTypeRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Attribute type UUID
    pub attribute_type: Uuid,
}

impl AttPacket for ReadByTypeRequest {
    fn opcode() -> u8 {
        ATT_READ_BY_TYPE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 7)?;
        let start_handle = read_u16(&mut cursor)?;
        let end_handle = read_u16(&mut cursor)?;

        Ok(Self {
            start_handle,
            end_handle,
            attribute_type: parse_type(rest(&cursor))?,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode()];
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet.extend_from_slice(&self.attribute_type.to_bytes());
        packet
    }
}

/// Handle and value in Read By Type Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleValue {
    /// Attribute handle
    pub handle: u16,
    /// Attribute value
    pub value: Vec<u8>,
}

/// Read By Type Response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadByTypeResponse {
    /// Length of each entry (value length + 2)
    pub length: u8,
    /// List of handle-value pairs
    pub data: Vec<HandleValue>,
}

impl AttPacket for ReadByTypeResponse {
    fn opcode() -> u8 {
        ATT_READ_BY_TYPE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        body(data, Self::opcode(), 2)?;
        let length = data[1];
        let entry = length as usize;
        let records = &data[2..];
        if entry < 2 || records.is_empty() || records.len() % entry != 0 {
            return Err(AttError::InvalidPdu);
        }

        let entries = records
            .chunks_exact(entry)
            .map(|chunk| HandleValue {
                handle: u16::from_le_bytes([chunk[0], chunk[1]]),
                value: chunk[2..].to_vec(),
            })
            .collect();

        Ok(Self {
            length,
            data: entries,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode(), self.length];
        for item in &self.data {
            packet.extend_from_slice(&item.handle.to_le_bytes());
            packet.extend_from_slice(&item.value);
        }
        packet
    }
}

/// Read Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    /// Attribute handle
    pub handle: u16,
}

impl AttPacket for ReadRequest {
    fn opcode() -> u8 {
        ATT_READ_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 3)?;
        Ok(Self {
            handle: read_u16(&mut cursor)?,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode()];
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet
    }
}

/// Read Response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    /// Attribute value
    pub value: Vec<u8>,
}

impl AttPacket for ReadResponse {
    fn opcode() -> u8 {
        ATT_READ_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        body(data, Self::opcode(), 1)?;
        Ok(Self {
            value: data[1..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(1 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Read Blob Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBlobRequest {
    /// Attribute handle
    pub handle: u16,
    /// Value offset
    pub offset: u16,
}

impl AttPacket for ReadBlobRequest {
    fn opcode() -> u8 {
        ATT_READ_BLOB_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 5)?;
        Ok(Self {
            handle: read_u16(&mut cursor)?,
            offset: read_u16(&mut cursor)?,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode()];
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.offset.to_le_bytes());
        packet
    }
}

/// Read Multiple Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadMultipleRequest {
    /// Set of handles, at least two
    pub handles: Vec<u16>,
}

impl AttPacket for ReadMultipleRequest {
    fn opcode() -> u8 {
        ATT_READ_MULTIPLE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        body(data, Self::opcode(), 5)?;
        let records = &data[1..];
        if records.len() % 2 != 0 {
            return Err(AttError::InvalidPdu);
        }

        let handles = records
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();

        Ok(Self { handles })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode()];
        for handle in &self.handles {
            packet.extend_from_slice(&handle.to_le_bytes());
        }
        packet
    }
}

/// Read By Group Type Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadByGroupTypeRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Group type UUID
    pub group_type: Uuid,
}

impl AttPacket for ReadByGroupTypeRequest {
    fn opcode() -> u8 {
        ATT_READ_BY_GROUP_TYPE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 7)?;
        let start_handle = read_u16(&mut cursor)?;
        let end_handle = read_u16(&mut cursor)?;

        Ok(Self {
            start_handle,
            end_handle,
            group_type: parse_type(rest(&cursor))?,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode()];
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet.extend_from_slice(&self.group_type.to_bytes());
        packet
    }
}

/// Entry in a Read By Group Type Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeData {
    /// Attribute handle
    pub handle: u16,
    /// Last handle in the group
    pub end_group_handle: u16,
    /// Attribute value
    pub value: Vec<u8>,
}

/// Read By Group Type Response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadByGroupTypeResponse {
    /// Length of each entry (value length + 4)
    pub length: u8,
    /// List of attribute data
    pub data: Vec<AttributeData>,
}

impl AttPacket for ReadByGroupTypeResponse {
    fn opcode() -> u8 {
        ATT_READ_BY_GROUP_TYPE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        body(data, Self::opcode(), 2)?;
        let length = data[1];
        let entry = length as usize;
        let records = &data[2..];
        if entry < 4 || records.is_empty() || records.len() % entry != 0 {
            return Err(AttError::InvalidPdu);
        }

        let entries = records
            .chunks_exact(entry)
            .map(|chunk| AttributeData {
                handle: u16::from_le_bytes([chunk[0], chunk[1]]),
                end_group_handle: u16::from_le_bytes([chunk[2], chunk[3]]),
                value: chunk[4..].to_vec(),
            })
            .collect();

        Ok(Self {
            length,
            data: entries,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = vec![Self::opcode(), self.length];
        for item in &self.data {
            packet.extend_from_slice(&item.handle.to_le_bytes());
            packet.extend_from_slice(&item.end_group_handle.to_le_bytes());
            packet.extend_from_slice(&item.value);
        }
        packet
    }
}

/// Write Request packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Attribute handle
    pub handle: u16,
    /// Value to write
    pub value: Vec<u8>,
}

impl AttPacket for WriteRequest {
    fn opcode() -> u8 {
        ATT_WRITE_REQ
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 3)?;
        let handle = read_u16(&mut cursor)?;
        Ok(Self {
            handle,
            value: rest(&cursor).to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Write Response packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResponse;

impl AttPacket for WriteResponse {
    fn opcode() -> u8 {
        ATT_WRITE_RSP
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        body(data, Self::opcode(), 1)?;
        Ok(Self)
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::opcode()]
    }
}

/// Write Command packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCommand {
    /// Attribute handle
    pub handle: u16,
    /// Value to write
    pub value: Vec<u8>,
}

impl AttPacket for WriteCommand {
    fn opcode() -> u8 {
        ATT_WRITE_CMD
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 3)?;
        let handle = read_u16(&mut cursor)?;
        Ok(Self {
            handle,
            value: rest(&cursor).to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Handle Value Notification packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleValueNotification {
    /// Attribute handle
    pub handle: u16,
    /// Attribute value
    pub value: Vec<u8>,
}

impl AttPacket for HandleValueNotification {
    fn opcode() -> u8 {
        ATT_HANDLE_VALUE_NTF
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 3)?;
        let handle = read_u16(&mut cursor)?;
        Ok(Self {
            handle,
            value: rest(&cursor).to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Handle Value Indication packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleValueIndication {
    /// Attribute handle
    pub handle: u16,
    /// Attribute value
    pub value: Vec<u8>,
}

impl AttPacket for HandleValueIndication {
    fn opcode() -> u8 {
        ATT_HANDLE_VALUE_IND
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        let mut cursor = body(data, Self::opcode(), 3)?;
        let handle = read_u16(&mut cursor)?;
        Ok(Self {
            handle,
            value: rest(&cursor).to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());
        packet.push(Self::opcode());
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);
        packet
    }
}

/// Handle Value Confirmation packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleValueConfirmation;

impl AttPacket for HandleValueConfirmation {
    fn opcode() -> u8 {
        ATT_HANDLE_VALUE_CONF
    }

    fn parse(data: &[u8]) -> AttResult<Self> {
        body(data, Self::opcode(), 1)?;
        Ok(Self)
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::opcode()]
    }
}

/// Maps a response opcode back to the request that produced it.
pub fn request_opcode_for(response_opcode: u8) -> Option<u8> {
    match response_opcode {
        ATT_EXCHANGE_MTU_RSP => Some(ATT_EXCHANGE_MTU_REQ),
        ATT_FIND_INFO_RSP => Some(ATT_FIND_INFO_REQ),
        ATT_FIND_BY_TYPE_VALUE_RSP => Some(ATT_FIND_BY_TYPE_VALUE_REQ),
        ATT_READ_BY_TYPE_RSP => Some(ATT_READ_BY_TYPE_REQ),
        ATT_READ_RSP => Some(ATT_READ_REQ),
        ATT_READ_BLOB_RSP => Some(ATT_READ_BLOB_REQ),
        ATT_READ_MULTIPLE_RSP => Some(ATT_READ_MULTIPLE_REQ),
        ATT_READ_BY_GROUP_TYPE_RSP => Some(ATT_READ_BY_GROUP_TYPE_REQ),
        ATT_WRITE_RSP => Some(ATT_WRITE_REQ),
        ATT_PREPARE_WRITE_RSP => Some(ATT_PREPARE_WRITE_REQ),
        ATT_EXECUTE_WRITE_RSP => Some(ATT_EXECUTE_WRITE_REQ),
        _ => None,
    }
}
