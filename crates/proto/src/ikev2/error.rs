//! Error types for the IKEv2 initiator
//!
//! Every failure is terminal for the message being processed: the exchange
//! context is left untouched and the caller decides whether to abandon the
//! session. [`ErrorKind`] groups the variants into the categories a transport
//! or EAP layer acts on.

use eapike_platform::{EapikeError, Severity};
use std::fmt;

/// Result type for IKEv2 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed header or payload framing
    Framing,
    /// No mutually acceptable proposal or key exchange parameters
    Negotiation,
    /// SKEYSEED or key expansion failed (fatal for the exchange)
    KeyDerivation,
    /// Integrity check or decryption failed
    Crypto,
    /// AUTH mismatch, identity mismatch or unknown user
    Authentication,
    /// Message does not fit the current exchange state
    StateViolation,
    /// Buffer allocation failed
    Allocation,
    /// Invalid local configuration
    Configuration,
    /// Internal error
    Internal,
}

/// IKEv2 protocol errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Buffer too short for operation
    BufferTooShort {
        /// Required length
        required: usize,
        /// Available length
        available: usize,
    },

    /// Declared length does not match the buffer
    LengthMismatch {
        /// Length declared on the wire
        declared: usize,
        /// Actual buffer length
        actual: usize,
    },

    /// Unsupported protocol version
    UnsupportedVersion(u8),

    /// Payload length exceeds the remaining bytes
    TruncatedPayload {
        /// Payload type tag
        payload_type: u8,
        /// Declared payload length
        declared: usize,
        /// Remaining bytes
        available: usize,
    },

    /// Bytes left over after the payload chain ended
    TrailingData(usize),

    /// Invalid payload contents
    InvalidPayload(String),

    /// Unrecognized payload marked critical
    UnsupportedCriticalPayload(u8),

    /// Required payload is absent
    MissingPayload(&'static str),

    /// Nonce length out of range
    InvalidNonce(usize),

    /// No acceptable proposal found
    NoProposalChosen,

    /// Malformed proposal or transform substructure
    InvalidProposal(String),

    /// KE payload does not fit the negotiated group
    InvalidKeyExchange(String),

    /// Peer sent an error notification
    PeerError(u16),

    /// Key derivation failed
    KeyDerivationFailed(String),

    /// Encrypted payload failed integrity check or decryption
    EncryptedPayloadInvalid,

    /// Cryptographic operation failed
    CryptoError(String),

    /// Peer identity differs from the one already recorded
    IdentityMismatch,

    /// Authentication failed
    AuthenticationFailed(String),

    /// Authentication used the placeholder secret of an unresolved identity
    UnknownUser,

    /// Unsupported exchange type
    UnsupportedExchangeType(u8),

    /// Exchange type does not match the current state
    InvalidExchangeType {
        /// Expected exchange type
        expected: u8,
        /// Received exchange type
        actual: u8,
    },

    /// Message ID does not match the current state
    InvalidMessageId {
        /// Expected message ID
        expected: u32,
        /// Received message ID
        actual: u32,
    },

    /// Response/initiator flags are wrong for a response to our request
    InvalidFlags(u8),

    /// SPI pair differs from the recorded one
    SpiMismatch,

    /// State machine error
    InvalidState(String),

    /// Buffer allocation failed
    AllocationFailed(String),

    /// Invalid configuration parameter
    InvalidParameter(String),

    /// Internal error (should not happen)
    Internal(String),
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BufferTooShort { .. }
            | Error::LengthMismatch { .. }
            | Error::UnsupportedVersion(_)
            | Error::TruncatedPayload { .. }
            | Error::TrailingData(_)
            | Error::InvalidPayload(_)
            | Error::UnsupportedCriticalPayload(_)
            | Error::MissingPayload(_)
            | Error::InvalidNonce(_) => ErrorKind::Framing,
            Error::NoProposalChosen
            | Error::InvalidProposal(_)
            | Error::InvalidKeyExchange(_)
            | Error::PeerError(_) => ErrorKind::Negotiation,
            Error::KeyDerivationFailed(_) => ErrorKind::KeyDerivation,
            Error::EncryptedPayloadInvalid | Error::CryptoError(_) => ErrorKind::Crypto,
            Error::IdentityMismatch | Error::AuthenticationFailed(_) | Error::UnknownUser => {
                ErrorKind::Authentication
            }
            Error::UnsupportedExchangeType(_)
            | Error::InvalidExchangeType { .. }
            | Error::InvalidMessageId { .. }
            | Error::InvalidFlags(_)
            | Error::SpiMismatch
            | Error::InvalidState(_) => ErrorKind::StateViolation,
            Error::AllocationFailed(_) => ErrorKind::Allocation,
            Error::InvalidParameter(_) => ErrorKind::Configuration,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Severity used when reporting this error
    pub fn severity(&self) -> Severity {
        match self.kind() {
            ErrorKind::Authentication => Severity::Critical,
            ErrorKind::Crypto => Severity::High,
            ErrorKind::Negotiation | ErrorKind::KeyDerivation | ErrorKind::Allocation => {
                Severity::Medium
            }
            ErrorKind::Framing | ErrorKind::StateViolation => Severity::Low,
            ErrorKind::Configuration | ErrorKind::Internal => Severity::Info,
        }
    }

    /// Whether this error is evidence of tampering or forgery and must be
    /// surfaced to the application as a hard security event
    pub fn is_security_event(&self) -> bool {
        matches!(self.kind(), ErrorKind::Authentication | ErrorKind::Crypto)
    }

    /// Whether a transport may log and drop the message (stray or duplicate
    /// packets)
    pub fn is_droppable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Framing | ErrorKind::StateViolation)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooShort {
                required,
                available,
            } => {
                write!(
                    f,
                    "Buffer too short: need {} bytes, have {}",
                    required, available
                )
            }
            Error::LengthMismatch { declared, actual } => {
                write!(
                    f,
                    "Length mismatch: declared {}, buffer has {}",
                    declared, actual
                )
            }
            Error::UnsupportedVersion(v) => {
                write!(f, "Unsupported IKE version: 0x{:02x}", v)
            }
            Error::TruncatedPayload {
                payload_type,
                declared,
                available,
            } => {
                write!(
                    f,
                    "Truncated payload {}: length {} exceeds remaining {} bytes",
                    payload_type, declared, available
                )
            }
            Error::TrailingData(n) => write!(f, "{} bytes of trailing data", n),
            Error::InvalidPayload(msg) => write!(f, "Invalid IKE payload: {}", msg),
            Error::UnsupportedCriticalPayload(t) => {
                write!(f, "Unsupported critical payload type: {}", t)
            }
            Error::MissingPayload(name) => write!(f, "Missing {} payload", name),
            Error::InvalidNonce(len) => write!(f, "Invalid nonce length: {}", len),
            Error::NoProposalChosen => {
                write!(f, "No acceptable proposal found in negotiation")
            }
            Error::InvalidProposal(msg) => write!(f, "Invalid proposal: {}", msg),
            Error::InvalidKeyExchange(msg) => write!(f, "Invalid key exchange: {}", msg),
            Error::PeerError(t) => write!(f, "Peer reported error notification {}", t),
            Error::KeyDerivationFailed(msg) => write!(f, "Key derivation failed: {}", msg),
            Error::EncryptedPayloadInvalid => write!(f, "Invalid encrypted payload"),
            Error::CryptoError(msg) => write!(f, "Cryptographic error: {}", msg),
            Error::IdentityMismatch => write!(f, "Peer identity mismatch"),
            Error::AuthenticationFailed(msg) => {
                write!(f, "Authentication failed: {}", msg)
            }
            Error::UnknownUser => write!(f, "Authentication failed: unknown user"),
            Error::UnsupportedExchangeType(t) => {
                write!(f, "Unsupported exchange type: {}", t)
            }
            Error::InvalidExchangeType { expected, actual } => {
                write!(
                    f,
                    "Unexpected exchange type: expected {}, got {}",
                    expected, actual
                )
            }
            Error::InvalidMessageId { expected, actual } => {
                write!(
                    f,
                    "Unexpected message ID: expected {}, got {}",
                    expected, actual
                )
            }
            Error::InvalidFlags(flags) => write!(f, "Unexpected flags: 0x{:02x}", flags),
            Error::SpiMismatch => write!(f, "IKE SA SPI mismatch"),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::AllocationFailed(msg) => write!(f, "Allocation failed: {}", msg),
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::collections::TryReserveError> for Error {
    fn from(err: std::collections::TryReserveError) -> Self {
        Error::AllocationFailed(err.to_string())
    }
}

impl From<Error> for EapikeError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::Authentication | ErrorKind::Crypto => {
                EapikeError::Security(err.to_string())
            }
            ErrorKind::Configuration => EapikeError::Config(err.to_string()),
            _ => EapikeError::Protocol(err.to_string()),
        }
    }
}
