//! Error handling for the ATT protocol
use super::constants::*;
use crate::uuid::UuidError;
use thiserror::Error;

/// ATT error codes as carried in an Error Response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttErrorCode {
    /// Invalid handle
    InvalidHandle,
    /// Read not permitted
    ReadNotPermitted,
    /// Write not permitted
    WriteNotPermitted,
    /// Invalid PDU
    InvalidPdu,
    /// Insufficient authentication
    InsufficientAuthentication,
    /// Request not supported
    RequestNotSupported,
    /// Invalid offset
    InvalidOffset,
    /// Insufficient authorization
    InsufficientAuthorization,
    /// Prepare queue full
    PrepareQueueFull,
    /// Attribute not found
    AttributeNotFound,
    /// Attribute not long
    AttributeNotLong,
    /// Insufficient encryption key size
    InsufficientEncryptionKeySize,
    /// Invalid attribute value length
    InvalidAttributeValueLength,
    /// Unlikely error
    Unlikely,
    /// Insufficient encryption
    InsufficientEncryption,
    /// Unsupported group type
    UnsupportedGroupType,
    /// Insufficient resources
    InsufficientResources,
    /// Database out of sync
    DatabaseOutOfSync,
    /// Value not allowed
    ValueNotAllowed,
    /// Application error
    ApplicationError(u8),
    /// Common profile error
    CommonProfileError(u8),
    /// Unknown error code
    Unknown(u8),
}

impl From<u8> for AttErrorCode {
    fn from(code: u8) -> Self {
        match code {
            ATT_ERROR_INVALID_HANDLE => AttErrorCode::InvalidHandle,
            ATT_ERROR_READ_NOT_PERMITTED => AttErrorCode::ReadNotPermitted,
            ATT_ERROR_WRITE_NOT_PERMITTED => AttErrorCode::WriteNotPermitted,
            ATT_ERROR_INVALID_PDU => AttErrorCode::InvalidPdu,
            ATT_ERROR_INSUFFICIENT_AUTHENTICATION => AttErrorCode::InsufficientAuthentication,
            ATT_ERROR_REQUEST_NOT_SUPPORTED => AttErrorCode::RequestNotSupported,
            ATT_ERROR_INVALID_OFFSET => AttErrorCode::InvalidOffset,
            ATT_ERROR_INSUFFICIENT_AUTHORIZATION => AttErrorCode::InsufficientAuthorization,
            ATT_ERROR_PREPARE_QUEUE_FULL => AttErrorCode::PrepareQueueFull,
            ATT_ERROR_ATTRIBUTE_NOT_FOUND => AttErrorCode::AttributeNotFound,
            ATT_ERROR_ATTRIBUTE_NOT_LONG => AttErrorCode::AttributeNotLong,
            ATT_ERROR_INSUFFICIENT_ENCRYPTION_KEY_SIZE => {
                AttErrorCode::InsufficientEncryptionKeySize
            }
            ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH => AttErrorCode::InvalidAttributeValueLength,
            ATT_ERROR_UNLIKELY => AttErrorCode::Unlikely,
            ATT_ERROR_INSUFFICIENT_ENCRYPTION => AttErrorCode::InsufficientEncryption,
            ATT_ERROR_UNSUPPORTED_GROUP_TYPE => AttErrorCode::UnsupportedGroupType,
            ATT_ERROR_INSUFFICIENT_RESOURCES => AttErrorCode::InsufficientResources,
            ATT_ERROR_DATABASE_OUT_OF_SYNC => AttErrorCode::DatabaseOutOfSync,
            ATT_ERROR_VALUE_NOT_ALLOWED => AttErrorCode::ValueNotAllowed,
            ATT_ERROR_APPLICATION_ERROR_START..=ATT_ERROR_APPLICATION_ERROR_END => {
                AttErrorCode::ApplicationError(code)
            }
            ATT_ERROR_COMMON_PROFILE_ERROR_START..=ATT_ERROR_COMMON_PROFILE_ERROR_END => {
                AttErrorCode::CommonProfileError(code)
            }
            _ => AttErrorCode::Unknown(code),
        }
    }
}

impl From<AttErrorCode> for u8 {
    fn from(code: AttErrorCode) -> u8 {
        match code {
            AttErrorCode::InvalidHandle => ATT_ERROR_INVALID_HANDLE,
            AttErrorCode::ReadNotPermitted => ATT_ERROR_READ_NOT_PERMITTED,
            AttErrorCode::WriteNotPermitted => ATT_ERROR_WRITE_NOT_PERMITTED,
            AttErrorCode::InvalidPdu => ATT_ERROR_INVALID_PDU,
            AttErrorCode::InsufficientAuthentication => ATT_ERROR_INSUFFICIENT_AUTHENTICATION,
            AttErrorCode::RequestNotSupported => ATT_ERROR_REQUEST_NOT_SUPPORTED,
            AttErrorCode::InvalidOffset => ATT_ERROR_INVALID_OFFSET,
            AttErrorCode::InsufficientAuthorization => ATT_ERROR_INSUFFICIENT_AUTHORIZATION,
            AttErrorCode::PrepareQueueFull => ATT_ERROR_PREPARE_QUEUE_FULL,
            AttErrorCode::AttributeNotFound => ATT_ERROR_ATTRIBUTE_NOT_FOUND,
            AttErrorCode::AttributeNotLong => ATT_ERROR_ATTRIBUTE_NOT_LONG,
            AttErrorCode::InsufficientEncryptionKeySize => {
                ATT_ERROR_INSUFFICIENT_ENCRYPTION_KEY_SIZE
            }
            AttErrorCode::InvalidAttributeValueLength => ATT_ERROR_INVALID_ATTRIBUTE_VALUE_LENGTH,
            AttErrorCode::Unlikely => ATT_ERROR_UNLIKELY,
            AttErrorCode::InsufficientEncryption => ATT_ERROR_INSUFFICIENT_ENCRYPTION,
            AttErrorCode::UnsupportedGroupType => ATT_ERROR_UNSUPPORTED_GROUP_TYPE,
            AttErrorCode::InsufficientResources => ATT_ERROR_INSUFFICIENT_RESOURCES,
            AttErrorCode::DatabaseOutOfSync => ATT_ERROR_DATABASE_OUT_OF_SYNC,
            AttErrorCode::ValueNotAllowed => ATT_ERROR_VALUE_NOT_ALLOWED,
            AttErrorCode::ApplicationError(code)
            | AttErrorCode::CommonProfileError(code)
            | AttErrorCode::Unknown(code) => code,
        }
    }
}

/// ATT Error type
///
/// `Protocol` carries an error the remote peer reported. The remaining variants are
/// raised locally; the ones with a wire counterpart are what the request engine
/// encodes into Error Responses.
#[derive(Debug, Error)]
pub enum AttError {
    #[error("ATT error: {0:?} on handle 0x{1:04x}")]
    Protocol(AttErrorCode, u16),

    #[error("Attribute not found")]
    AttributeNotFound,

    #[error("Read not permitted on handle 0x{0:04x}")]
    ReadNotPermitted(u16),

    #[error("Write not permitted on handle 0x{0:04x}")]
    WriteNotPermitted(u16),

    #[error("Invalid handle: 0x{0:04x}")]
    InvalidHandle(u16),

    #[error("Invalid PDU")]
    InvalidPdu,

    #[error("Invalid attribute value length")]
    InvalidAttributeValueLength,

    #[error("Request not supported")]
    RequestNotSupported,

    #[error("Unsupported group type")]
    UnsupportedGroupType,

    #[error("Value not allowed")]
    ValueNotAllowed,

    #[error("Handle 0x{0:04x} already in use")]
    HandleInUse(u16),

    #[error("Handle space exhausted")]
    HandleSpaceExhausted,

    #[error("Notify and indicate both requested for handle 0x{0:04x}")]
    DeliveryModeConflict(u16),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] UuidError),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Operation timed out")]
    Timeout,

    #[error("Operation aborted")]
    Aborted,

    #[error("Transport I/O error: {0}")]
    Io(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl AttError {
    /// Convert to ATT error code
    pub fn to_error_code(&self) -> AttErrorCode {
        match self {
            AttError::Protocol(code, _) => *code,
            AttError::AttributeNotFound => AttErrorCode::AttributeNotFound,
            AttError::ReadNotPermitted(_) => AttErrorCode::ReadNotPermitted,
            AttError::WriteNotPermitted(_) => AttErrorCode::WriteNotPermitted,
            AttError::InvalidHandle(_) | AttError::HandleInUse(_) => AttErrorCode::InvalidHandle,
            AttError::InvalidPdu => AttErrorCode::InvalidPdu,
            AttError::InvalidAttributeValueLength => AttErrorCode::InvalidAttributeValueLength,
            AttError::RequestNotSupported => AttErrorCode::RequestNotSupported,
            AttError::UnsupportedGroupType => AttErrorCode::UnsupportedGroupType,
            AttError::ValueNotAllowed | AttError::DeliveryModeConflict(_) => {
                AttErrorCode::ValueNotAllowed
            }
            AttError::HandleSpaceExhausted => AttErrorCode::InsufficientResources,
            AttError::Io(_) | AttError::ConnectionClosed => {
                AttErrorCode::ApplicationError(ATT_LOCAL_ERROR_IO)
            }
            AttError::Timeout => AttErrorCode::ApplicationError(ATT_LOCAL_ERROR_TIMEOUT),
            AttError::Aborted => AttErrorCode::ApplicationError(ATT_LOCAL_ERROR_ABORTED),
            AttError::InvalidUuid(_) | AttError::InvalidParameter(_) => AttErrorCode::Unlikely,
        }
    }

    /// Get the handle associated with this error, if any
    pub fn handle(&self) -> Option<u16> {
        match self {
            AttError::Protocol(_, handle)
            | AttError::ReadNotPermitted(handle)
            | AttError::WriteNotPermitted(handle)
            | AttError::InvalidHandle(handle)
            | AttError::HandleInUse(handle)
            | AttError::DeliveryModeConflict(handle) => Some(*handle),
            _ => None,
        }
    }

    /// True for failures that stay on this side of the link.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AttError::HandleInUse(_)
                | AttError::HandleSpaceExhausted
                | AttError::InvalidUuid(_)
                | AttError::ConnectionClosed
                | AttError::Timeout
                | AttError::Aborted
                | AttError::Io(_)
                | AttError::InvalidParameter(_)
        )
    }

    /// True when the remote peer answered with Attribute Not Found.
    pub fn is_attribute_not_found(&self) -> bool {
        matches!(
            self,
            AttError::Protocol(AttErrorCode::AttributeNotFound, _) | AttError::AttributeNotFound
        )
    }
}

/// ATT Result type
pub type AttResult<T> = Result<T, AttError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_round_trip() {
        for raw in 0x01..=0x13u8 {
            let code = AttErrorCode::from(raw);
            assert!(!matches!(code, AttErrorCode::Unknown(_)));
            assert_eq!(u8::from(code), raw);
        }
        assert_eq!(AttErrorCode::from(0x85), AttErrorCode::ApplicationError(0x85));
        assert_eq!(AttErrorCode::from(0xFE), AttErrorCode::CommonProfileError(0xFE));
        assert_eq!(AttErrorCode::from(0x40), AttErrorCode::Unknown(0x40));
    }

    #[test]
    fn test_local_errors() {
        assert!(AttError::Timeout.is_local());
        assert!(AttError::ConnectionClosed.is_local());
        assert!(!AttError::InvalidHandle(3).is_local());
        assert_eq!(
            u8::from(AttError::Timeout.to_error_code()),
            ATT_LOCAL_ERROR_TIMEOUT
        );
    }

    #[test]
    fn test_handle_accessor() {
        assert_eq!(AttError::WriteNotPermitted(7).handle(), Some(7));
        assert_eq!(AttError::InvalidPdu.handle(), None);
        assert!(AttError::Protocol(AttErrorCode::AttributeNotFound, 1).is_attribute_not_found());
    }
}
