//! IKEv2 protocol constants from RFC 7296 and RFC 5106

/// IKE version 2 (major version = 2, minor version = 0)
pub const IKE_VERSION: u8 = 0x20;

/// IKE header size (28 bytes)
pub const IKE_HEADER_SIZE: usize = 28;

/// Generic payload header size (4 bytes)
pub const PAYLOAD_HEADER_SIZE: usize = 4;

/// IKE SA SPI size (8 bytes)
pub const IKE_SPI_SIZE: usize = 8;

/// Minimum nonce length (RFC 7296 Section 3.9)
pub const NONCE_MIN_LEN: usize = 16;

/// Maximum nonce length (RFC 7296 Section 3.9)
pub const NONCE_MAX_LEN: usize = 256;

/// Length of the random secret substituted for an unresolved identity
pub const PLACEHOLDER_SECRET_LEN: usize = 16;

/// Key pad for shared-key AUTH computation (RFC 7296 Section 2.15)
pub const KEY_PAD_IKEV2: &[u8] = b"Key Pad for IKEv2";

/// Notify types below this value are errors (RFC 7296 Section 3.10.1)
pub const NOTIFY_ERROR_MAX: u16 = 16383;

/// Security protocol identifier for IKE SA proposals
pub const PROTOCOL_ID_IKE: u8 = 1;

/// Exchange Types (RFC 7296 Section 3.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExchangeType {
    /// IKE_SA_INIT exchange (34)
    IkeSaInit = 34,
    /// IKE_AUTH exchange (35), IKE_SA_AUTH in EAP-IKEv2
    IkeAuth = 35,
    /// CREATE_CHILD_SA exchange (36)
    CreateChildSa = 36,
}

impl ExchangeType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            34 => Some(ExchangeType::IkeSaInit),
            35 => Some(ExchangeType::IkeAuth),
            36 => Some(ExchangeType::CreateChildSa),
            _ => None,
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// IKE message flags (RFC 7296 Section 3.1)
///
/// The raw octet is preserved so a parsed header serializes back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IkeFlags(u8);

impl IkeFlags {
    /// Response flag (bit 5)
    pub const RESPONSE: u8 = 0x20;
    /// Version flag (bit 4)
    pub const VERSION: u8 = 0x10;
    /// Initiator flag (bit 3)
    pub const INITIATOR: u8 = 0x08;

    /// Create flags from the raw octet
    pub fn new(value: u8) -> Self {
        IkeFlags(value)
    }

    /// Flags for a request sent by the original initiator
    pub fn initiator_request() -> Self {
        IkeFlags(Self::INITIATOR)
    }

    /// Flags for a response sent by the original responder
    pub fn responder_response() -> Self {
        IkeFlags(Self::RESPONSE)
    }

    /// Check if this is a response
    pub fn is_response(self) -> bool {
        (self.0 & Self::RESPONSE) != 0
    }

    /// Check if this is from initiator
    pub fn is_initiator(self) -> bool {
        (self.0 & Self::INITIATOR) != 0
    }

    /// Get raw value
    pub fn value(self) -> u8 {
        self.0
    }
}

/// Payload Types (RFC 7296 Section 3.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PayloadType {
    /// No next payload (0)
    None = 0,
    /// Security Association (33)
    SA = 33,
    /// Key Exchange (34)
    KE = 34,
    /// Identification - Initiator (35)
    IDi = 35,
    /// Identification - Responder (36)
    IDr = 36,
    /// Certificate (37)
    CERT = 37,
    /// Certificate Request (38)
    CERTREQ = 38,
    /// Authentication (39)
    AUTH = 39,
    /// Nonce (40)
    Nonce = 40,
    /// Notify (41)
    N = 41,
    /// Vendor ID (43)
    V = 43,
    /// Encrypted and Authenticated (46)
    SK = 46,
}

impl PayloadType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PayloadType::None),
            33 => Some(PayloadType::SA),
            34 => Some(PayloadType::KE),
            35 => Some(PayloadType::IDi),
            36 => Some(PayloadType::IDr),
            37 => Some(PayloadType::CERT),
            38 => Some(PayloadType::CERTREQ),
            39 => Some(PayloadType::AUTH),
            40 => Some(PayloadType::Nonce),
            41 => Some(PayloadType::N),
            43 => Some(PayloadType::V),
            46 => Some(PayloadType::SK),
            _ => None,
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_type_conversion() {
        assert_eq!(ExchangeType::from_u8(34), Some(ExchangeType::IkeSaInit));
        assert_eq!(ExchangeType::from_u8(35), Some(ExchangeType::IkeAuth));
        assert_eq!(ExchangeType::from_u8(36), Some(ExchangeType::CreateChildSa));
        assert_eq!(ExchangeType::from_u8(37), None);
        assert_eq!(ExchangeType::from_u8(99), None);
        assert_eq!(ExchangeType::IkeAuth.to_u8(), 35);
    }

    #[test]
    fn test_flags() {
        let flags = IkeFlags::initiator_request();
        assert!(flags.is_initiator());
        assert!(!flags.is_response());

        let flags = IkeFlags::responder_response();
        assert!(flags.is_response());
        assert!(!flags.is_initiator());

        // Reserved bits are kept
        assert_eq!(IkeFlags::new(0xff).value(), 0xff);
    }

    #[test]
    fn test_payload_type_conversion() {
        assert_eq!(PayloadType::from_u8(46), Some(PayloadType::SK));
        assert_eq!(PayloadType::from_u8(0), Some(PayloadType::None));
        assert_eq!(PayloadType::from_u8(42), None);
        assert_eq!(PayloadType::from_u8(44), None);
        assert_eq!(PayloadType::Nonce.to_u8(), 40);
    }
}
