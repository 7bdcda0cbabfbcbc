//! IKEv2 payload structures and the payload chain codec
//!
//! Implements the payloads of RFC 7296 Section 3.2 - 3.14 that the IKE_SA_INIT
//! and IKE_SA_AUTH exchanges carry. Every payload starts with a generic
//! header whose Next Payload field names the type of the following payload,
//! so a message is a chain that can only be walked front to back.
//!
//! ```text
//! HDR(next=SA) | SA(next=KE) | KE(next=Ni) | Ni(next=0)
//! HDR(next=SK) | SK(next=IDi) { IDi(next=AUTH) | AUTH(next=0) }
//! ```
//!
//! Unknown payloads are skipped by length unless their critical bit is set.

use super::constants::{PayloadType, PAYLOAD_HEADER_SIZE};
use super::{Error, Result};
use bytes::BufMut;

/// Generic IKE payload header (4 bytes)
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Next Payload  |C|  RESERVED   |         Payload Length        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadHeader {
    /// Next payload type tag
    pub next_payload: u8,

    /// Critical bit (if set, must understand this payload)
    pub critical: bool,

    /// Total payload length including header (4 bytes + data)
    pub length: u16,
}

impl PayloadHeader {
    /// Payload header size
    pub const SIZE: usize = PAYLOAD_HEADER_SIZE;

    /// Parse payload header from bytes
    ///
    /// # Errors
    ///
    /// Returns error if the buffer is too short or the declared length is
    /// smaller than the header itself.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::BufferTooShort {
                required: Self::SIZE,
                available: data.len(),
            });
        }

        let length = u16::from_be_bytes([data[2], data[3]]);
        if (length as usize) < Self::SIZE {
            return Err(Error::InvalidPayload(format!(
                "payload length {} shorter than header",
                length
            )));
        }

        Ok(PayloadHeader {
            next_payload: data[0],
            critical: (data[1] & 0x80) != 0,
            length,
        })
    }

    /// Serialize payload header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0] = self.next_payload;
        bytes[1] = if self.critical { 0x80 } else { 0x00 };
        bytes[2..4].copy_from_slice(&self.length.to_be_bytes());
        bytes
    }
}

/// Security Association payload
///
/// The proposal substructures are kept as raw bytes; they are interpreted by
/// [`negotiate`](super::proposal::negotiate) and produced by
/// [`Proposal::to_bytes`](super::proposal::Proposal::to_bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaPayload {
    /// Raw proposal substructures
    pub proposals: Vec<u8>,
}

/// Key Exchange payload
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Diffie-Hellman Group Num    |           RESERVED            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                       Key Exchange Data                       ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KePayload {
    /// DH group transform ID
    pub dh_group: u16,

    /// Public value
    pub key_data: Vec<u8>,
}

impl KePayload {
    /// Create new KE payload
    pub fn new(dh_group: u16, key_data: Vec<u8>) -> Self {
        KePayload { dh_group, key_data }
    }

    /// Parse from payload data (excluding generic header)
    pub fn from_payload_data(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::InvalidPayload("KE payload too short".into()));
        }
        Ok(KePayload {
            dh_group: u16::from_be_bytes([data[0], data[1]]),
            key_data: data[4..].to_vec(),
        })
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_u16(self.dh_group);
        buf.put_u16(0);
        buf.put_slice(&self.key_data);
    }
}

/// Nonce payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoncePayload {
    /// Nonce data
    pub nonce: Vec<u8>,
}

impl NoncePayload {
    /// Minimum nonce size
    pub const MIN_SIZE: usize = super::constants::NONCE_MIN_LEN;

    /// Maximum nonce size
    pub const MAX_SIZE: usize = super::constants::NONCE_MAX_LEN;

    /// Create a nonce payload, checking the length range
    pub fn new(nonce: Vec<u8>) -> Result<Self> {
        let payload = NoncePayload { nonce };
        payload.validate()?;
        Ok(payload)
    }

    /// Check the nonce length is within [16, 256]
    pub fn validate(&self) -> Result<()> {
        if self.nonce.len() < Self::MIN_SIZE || self.nonce.len() > Self::MAX_SIZE {
            return Err(Error::InvalidNonce(self.nonce.len()));
        }
        Ok(())
    }
}

/// Identification type (RFC 7296 Section 3.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdType {
    /// IPv4 address (1)
    Ipv4Addr,
    /// Fully-qualified domain name (2)
    Fqdn,
    /// RFC 822 email address (3)
    Rfc822Addr,
    /// IPv6 address (5)
    Ipv6Addr,
    /// DER-encoded ASN.1 X.500 Distinguished Name (9)
    DerAsn1Dn,
    /// DER-encoded ASN.1 X.509 GeneralName (10)
    DerAsn1Gn,
    /// Opaque key identifier (11)
    KeyId,
    /// Any other type, kept verbatim
    Other(u8),
}

impl IdType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => IdType::Ipv4Addr,
            2 => IdType::Fqdn,
            3 => IdType::Rfc822Addr,
            5 => IdType::Ipv6Addr,
            9 => IdType::DerAsn1Dn,
            10 => IdType::DerAsn1Gn,
            11 => IdType::KeyId,
            other => IdType::Other(other),
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        match self {
            IdType::Ipv4Addr => 1,
            IdType::Fqdn => 2,
            IdType::Rfc822Addr => 3,
            IdType::Ipv6Addr => 5,
            IdType::DerAsn1Dn => 9,
            IdType::DerAsn1Gn => 10,
            IdType::KeyId => 11,
            IdType::Other(value) => value,
        }
    }
}

/// Identification payload (IDi or IDr)
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   ID Type     |                 RESERVED                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                   Identification Data                         ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdPayload {
    /// Identification type
    pub id_type: IdType,

    /// Identification data (may be empty)
    pub data: Vec<u8>,
}

impl IdPayload {
    /// Create new ID payload
    pub fn new(id_type: IdType, data: Vec<u8>) -> Self {
        IdPayload { id_type, data }
    }

    /// Create from FQDN
    pub fn from_fqdn(fqdn: &str) -> Self {
        IdPayload::new(IdType::Fqdn, fqdn.as_bytes().to_vec())
    }

    /// Create from email address
    pub fn from_email(email: &str) -> Self {
        IdPayload::new(IdType::Rfc822Addr, email.as_bytes().to_vec())
    }

    /// Create from key ID
    pub fn from_key_id(key_id: &[u8]) -> Self {
        IdPayload::new(IdType::KeyId, key_id.to_vec())
    }

    /// Parse from payload data (excluding generic header)
    pub fn from_payload_data(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::InvalidPayload("ID payload too short".into()));
        }
        Ok(IdPayload {
            id_type: IdType::from_u8(data[0]),
            data: data[4..].to_vec(),
        })
    }

    /// Serialize to payload data: `ID Type | RESERVED | Identification Data`
    ///
    /// This is also the ID' octet string hashed into the AUTH computation.
    pub fn to_payload_data(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.data.len());
        self.write_body(&mut buf);
        buf
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_u8(self.id_type.to_u8());
        buf.put_slice(&[0, 0, 0]);
        buf.put_slice(&self.data);
    }
}

/// Certificate encoding (RFC 7296 Section 3.6, RFC 7670)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertEncoding {
    /// X.509 Certificate - Signature (4)
    X509Signature,
    /// Raw Public Key (15)
    RawPublicKey,
    /// Any other encoding, kept verbatim
    Other(u8),
}

impl CertEncoding {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Self {
        match value {
            4 => CertEncoding::X509Signature,
            15 => CertEncoding::RawPublicKey,
            other => CertEncoding::Other(other),
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        match self {
            CertEncoding::X509Signature => 4,
            CertEncoding::RawPublicKey => 15,
            CertEncoding::Other(value) => value,
        }
    }
}

/// Certificate payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPayload {
    /// Certificate encoding
    pub encoding: CertEncoding,

    /// Certificate data
    pub data: Vec<u8>,
}

impl CertPayload {
    /// Create new CERT payload
    pub fn new(encoding: CertEncoding, data: Vec<u8>) -> Self {
        CertPayload { encoding, data }
    }

    /// Parse from payload data (excluding generic header)
    pub fn from_payload_data(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::InvalidPayload("CERT payload too short".into()));
        }
        Ok(CertPayload {
            encoding: CertEncoding::from_u8(data[0]),
            data: data[1..].to_vec(),
        })
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_u8(self.encoding.to_u8());
        buf.put_slice(&self.data);
    }
}

/// Authentication method (RFC 7296 Section 3.8, RFC 4754, RFC 7427)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// RSA Digital Signature (1)
    RsaSig,
    /// Shared Key Message Integrity Code (2)
    SharedKeyMic,
    /// DSS Digital Signature (3)
    DssSig,
    /// ECDSA with SHA-256 on the P-256 curve (9)
    EcdsaSha256P256,
    /// ECDSA with SHA-384 on the P-384 curve (10)
    EcdsaSha384P384,
    /// ECDSA with SHA-512 on the P-521 curve (11)
    EcdsaSha512P521,
    /// Digital Signature (14)
    DigitalSignature,
    /// Any other method, kept verbatim
    Other(u8),
}

impl AuthMethod {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => AuthMethod::RsaSig,
            2 => AuthMethod::SharedKeyMic,
            3 => AuthMethod::DssSig,
            9 => AuthMethod::EcdsaSha256P256,
            10 => AuthMethod::EcdsaSha384P384,
            11 => AuthMethod::EcdsaSha512P521,
            14 => AuthMethod::DigitalSignature,
            other => AuthMethod::Other(other),
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        match self {
            AuthMethod::RsaSig => 1,
            AuthMethod::SharedKeyMic => 2,
            AuthMethod::DssSig => 3,
            AuthMethod::EcdsaSha256P256 => 9,
            AuthMethod::EcdsaSha384P384 => 10,
            AuthMethod::EcdsaSha512P521 => 11,
            AuthMethod::DigitalSignature => 14,
            AuthMethod::Other(value) => value,
        }
    }
}

/// Authentication payload
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Auth Method   |                RESERVED                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                      Authentication Data                      ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPayload {
    /// Authentication method
    pub auth_method: AuthMethod,

    /// Authentication data
    pub auth_data: Vec<u8>,
}

impl AuthPayload {
    /// Create new AUTH payload
    pub fn new(auth_method: AuthMethod, auth_data: Vec<u8>) -> Self {
        AuthPayload {
            auth_method,
            auth_data,
        }
    }

    /// Parse from payload data (excluding generic header)
    pub fn from_payload_data(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::InvalidPayload("AUTH payload too short".into()));
        }
        Ok(AuthPayload {
            auth_method: AuthMethod::from_u8(data[0]),
            auth_data: data[4..].to_vec(),
        })
    }

    fn write_body(&self, buf: &mut Vec<u8>) {
        buf.put_u8(self.auth_method.to_u8());
        buf.put_slice(&[0, 0, 0]);
        buf.put_slice(&self.auth_data);
    }
}

/// Notify payload
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Protocol ID  |   SPI Size    |      Notify Message Type      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                Security Parameter Index (SPI)                 ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                       Notification Data                       ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyPayload {
    /// Protocol ID (0 when not SA specific)
    pub protocol_id: u8,

    /// SPI (empty when not SA specific)
    pub spi: Vec<u8>,

    /// Notify message type
    pub notify_type: u16,

    /// Notification data
    pub data: Vec<u8>,
}

impl NotifyPayload {
    /// NO_PROPOSAL_CHOSEN
    pub const NO_PROPOSAL_CHOSEN: u16 = 14;
    /// INVALID_KE_PAYLOAD
    pub const INVALID_KE_PAYLOAD: u16 = 17;
    /// AUTHENTICATION_FAILED
    pub const AUTHENTICATION_FAILED: u16 = 24;

    /// Create a notification that is not tied to an SA
    pub fn new(notify_type: u16, data: Vec<u8>) -> Self {
        NotifyPayload {
            protocol_id: 0,
            spi: Vec::new(),
            notify_type,
            data,
        }
    }

    /// Whether this is an error notification (types 1 through 16383)
    pub fn is_error(&self) -> bool {
        (1..=super::constants::NOTIFY_ERROR_MAX).contains(&self.notify_type)
    }

    /// Parse from payload data (excluding generic header)
    pub fn from_payload_data(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::InvalidPayload("Notify payload too short".into()));
        }
        let spi_end = 4 + data[1] as usize;
        if spi_end > data.len() {
            return Err(Error::InvalidPayload("Notify SPI overruns payload".into()));
        }
        Ok(NotifyPayload {
            protocol_id: data[0],
            spi: data[4..spi_end].to_vec(),
            notify_type: u16::from_be_bytes([data[2], data[3]]),
            data: data[spi_end..].to_vec(),
        })
    }

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        let spi_size = u8::try_from(self.spi.len())
            .map_err(|_| Error::InvalidPayload("Notify SPI too long".into()))?;
        buf.put_u8(self.protocol_id);
        buf.put_u8(spi_size);
        buf.put_u16(self.notify_type);
        buf.put_slice(&self.spi);
        buf.put_slice(&self.data);
        Ok(())
    }
}

/// Encrypted and Authenticated payload, still sealed
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Next Payload  |C|  RESERVED   |         Payload Length        |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     Initialization Vector                     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                    Encrypted IKE Payloads                     ~
/// +               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |               |             Padding (0-255 octets)            |
/// +-+-+-+-+-+-+-+-+                               +-+-+-+-+-+-+-+-+
/// |                                               |  Pad Length   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                    Integrity Checksum Data                    ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The Next Payload field of its header names the first inner payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Type tag of the first payload inside the ciphertext
    pub first_inner: u8,

    /// IV, ciphertext and integrity checksum
    pub data: Vec<u8>,
}

/// IKE payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IkePayload {
    /// Security Association payload
    SA(SaPayload),

    /// Key Exchange payload
    KE(KePayload),

    /// Nonce payload
    Nonce(NoncePayload),

    /// Identification payload (Initiator)
    IDi(IdPayload),

    /// Identification payload (Responder)
    IDr(IdPayload),

    /// Certificate payload
    CERT(CertPayload),

    /// Authentication payload
    AUTH(AuthPayload),

    /// Notify payload
    Notify(NotifyPayload),

    /// Encrypted and Authenticated payload
    SK(EncryptedPayload),

    /// Payload this engine does not interpret (raw body kept)
    Unknown {
        /// Payload type tag
        payload_type: u8,
        /// Critical bit
        critical: bool,
        /// Raw payload data (excluding header)
        data: Vec<u8>,
    },
}

impl IkePayload {
    /// Type tag of this payload
    pub fn type_code(&self) -> u8 {
        match self {
            IkePayload::SA(_) => PayloadType::SA.to_u8(),
            IkePayload::KE(_) => PayloadType::KE.to_u8(),
            IkePayload::Nonce(_) => PayloadType::Nonce.to_u8(),
            IkePayload::IDi(_) => PayloadType::IDi.to_u8(),
            IkePayload::IDr(_) => PayloadType::IDr.to_u8(),
            IkePayload::CERT(_) => PayloadType::CERT.to_u8(),
            IkePayload::AUTH(_) => PayloadType::AUTH.to_u8(),
            IkePayload::Notify(_) => PayloadType::N.to_u8(),
            IkePayload::SK(_) => PayloadType::SK.to_u8(),
            IkePayload::Unknown { payload_type, .. } => *payload_type,
        }
    }

    fn critical(&self) -> bool {
        matches!(self, IkePayload::Unknown { critical: true, .. })
    }

    fn body_len(&self) -> usize {
        match self {
            IkePayload::SA(sa) => sa.proposals.len(),
            IkePayload::KE(ke) => 4 + ke.key_data.len(),
            IkePayload::Nonce(n) => n.nonce.len(),
            IkePayload::IDi(id) | IkePayload::IDr(id) => 4 + id.data.len(),
            IkePayload::CERT(cert) => 1 + cert.data.len(),
            IkePayload::AUTH(auth) => 4 + auth.auth_data.len(),
            IkePayload::Notify(n) => 4 + n.spi.len() + n.data.len(),
            IkePayload::SK(sk) => sk.data.len(),
            IkePayload::Unknown { data, .. } => data.len(),
        }
    }

    fn write_body(&self, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            IkePayload::SA(sa) => buf.put_slice(&sa.proposals),
            IkePayload::KE(ke) => ke.write_body(buf),
            IkePayload::Nonce(n) => buf.put_slice(&n.nonce),
            IkePayload::IDi(id) | IkePayload::IDr(id) => id.write_body(buf),
            IkePayload::CERT(cert) => cert.write_body(buf),
            IkePayload::AUTH(auth) => auth.write_body(buf),
            IkePayload::Notify(n) => n.write_body(buf)?,
            IkePayload::SK(sk) => buf.put_slice(&sk.data),
            IkePayload::Unknown { data, .. } => buf.put_slice(data),
        }
        Ok(())
    }

    fn parse(payload_type: u8, header: &PayloadHeader, body: &[u8]) -> Result<Self> {
        let payload = match PayloadType::from_u8(payload_type) {
            Some(PayloadType::SA) => IkePayload::SA(SaPayload {
                proposals: body.to_vec(),
            }),
            Some(PayloadType::KE) => IkePayload::KE(KePayload::from_payload_data(body)?),
            Some(PayloadType::Nonce) => IkePayload::Nonce(NoncePayload {
                nonce: body.to_vec(),
            }),
            Some(PayloadType::IDi) => IkePayload::IDi(IdPayload::from_payload_data(body)?),
            Some(PayloadType::IDr) => IkePayload::IDr(IdPayload::from_payload_data(body)?),
            Some(PayloadType::CERT) => IkePayload::CERT(CertPayload::from_payload_data(body)?),
            Some(PayloadType::AUTH) => IkePayload::AUTH(AuthPayload::from_payload_data(body)?),
            Some(PayloadType::N) => IkePayload::Notify(NotifyPayload::from_payload_data(body)?),
            Some(PayloadType::SK) => IkePayload::SK(EncryptedPayload {
                first_inner: header.next_payload,
                data: body.to_vec(),
            }),
            _ => {
                if header.critical {
                    return Err(Error::UnsupportedCriticalPayload(payload_type));
                }
                IkePayload::Unknown {
                    payload_type,
                    critical: false,
                    data: body.to_vec(),
                }
            }
        };
        Ok(payload)
    }
}

/// Parsed payload chain with typed lookups
///
/// Lookups return the first payload of the requested kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadSet {
    payloads: Vec<IkePayload>,
}

impl PayloadSet {
    /// Create from a list of payloads
    pub fn new(payloads: Vec<IkePayload>) -> Self {
        PayloadSet { payloads }
    }

    /// All payloads in wire order
    pub fn as_slice(&self) -> &[IkePayload] {
        &self.payloads
    }

    /// Consume into the payload list
    pub fn into_vec(self) -> Vec<IkePayload> {
        self.payloads
    }

    /// Number of payloads
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Whether the chain was empty
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// SA payload
    pub fn sa(&self) -> Option<&SaPayload> {
        self.payloads.iter().find_map(|p| match p {
            IkePayload::SA(sa) => Some(sa),
            _ => None,
        })
    }

    /// KE payload
    pub fn ke(&self) -> Option<&KePayload> {
        self.payloads.iter().find_map(|p| match p {
            IkePayload::KE(ke) => Some(ke),
            _ => None,
        })
    }

    /// Nonce payload
    pub fn nonce(&self) -> Option<&NoncePayload> {
        self.payloads.iter().find_map(|p| match p {
            IkePayload::Nonce(n) => Some(n),
            _ => None,
        })
    }

    /// IDi payload
    pub fn idi(&self) -> Option<&IdPayload> {
        self.payloads.iter().find_map(|p| match p {
            IkePayload::IDi(id) => Some(id),
            _ => None,
        })
    }

    /// IDr payload
    pub fn idr(&self) -> Option<&IdPayload> {
        self.payloads.iter().find_map(|p| match p {
            IkePayload::IDr(id) => Some(id),
            _ => None,
        })
    }

    /// CERT payload
    pub fn cert(&self) -> Option<&CertPayload> {
        self.payloads.iter().find_map(|p| match p {
            IkePayload::CERT(cert) => Some(cert),
            _ => None,
        })
    }

    /// AUTH payload
    pub fn auth(&self) -> Option<&AuthPayload> {
        self.payloads.iter().find_map(|p| match p {
            IkePayload::AUTH(auth) => Some(auth),
            _ => None,
        })
    }

    /// All Notify payloads
    pub fn notifications(&self) -> impl Iterator<Item = &NotifyPayload> {
        self.payloads.iter().filter_map(|p| match p {
            IkePayload::Notify(n) => Some(n),
            _ => None,
        })
    }

    /// SK payload
    pub fn encrypted(&self) -> Option<&EncryptedPayload> {
        self.payloads.iter().find_map(|p| match p {
            IkePayload::SK(sk) => Some(sk),
            _ => None,
        })
    }
}

impl From<Vec<IkePayload>> for PayloadSet {
    fn from(payloads: Vec<IkePayload>) -> Self {
        PayloadSet::new(payloads)
    }
}

/// Parse a payload chain starting with payload type `first`
///
/// The chain must consume `data` exactly. An SK payload ends the chain; its
/// Next Payload field is kept as the first inner type.
///
/// # Errors
///
/// - [`Error::TruncatedPayload`] if a payload (or its header) runs past the end
/// - [`Error::TrailingData`] if bytes remain after the last payload
/// - [`Error::UnsupportedCriticalPayload`] for an unknown critical payload
/// - [`Error::InvalidPayload`] for malformed payload bodies
pub fn parse_payload_chain(first: u8, data: &[u8]) -> Result<PayloadSet> {
    let mut payloads = Vec::new();
    let mut next = first;
    let mut pos = 0;

    while next != PayloadType::None.to_u8() {
        let remaining = data.len() - pos;
        if remaining < PayloadHeader::SIZE {
            return Err(Error::TruncatedPayload {
                payload_type: next,
                declared: PayloadHeader::SIZE,
                available: remaining,
            });
        }

        let header = PayloadHeader::from_bytes(&data[pos..])?;
        let plen = header.length as usize;
        if plen > remaining {
            return Err(Error::TruncatedPayload {
                payload_type: next,
                declared: plen,
                available: remaining,
            });
        }

        let body = &data[pos + PayloadHeader::SIZE..pos + plen];
        let payload = IkePayload::parse(next, &header, body)?;
        pos += plen;

        if let IkePayload::SK(_) = payload {
            payloads.push(payload);
            break;
        }

        payloads.push(payload);
        next = header.next_payload;
    }

    if pos != data.len() {
        return Err(Error::TrailingData(data.len() - pos));
    }

    Ok(PayloadSet::new(payloads))
}

/// Serialize a payload chain
///
/// Each payload's Next Payload field is set from the following payload and
/// its length backfilled once the body is written. An SK payload must come
/// last.
pub fn build_payload_chain(payloads: &[IkePayload]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_payload_chain(&mut buf, payloads)?;
    Ok(buf)
}

pub(crate) fn write_payload_chain(buf: &mut Vec<u8>, payloads: &[IkePayload]) -> Result<()> {
    for (i, payload) in payloads.iter().enumerate() {
        let next = match (payload, payloads.get(i + 1)) {
            (IkePayload::SK(sk), None) => sk.first_inner,
            (IkePayload::SK(_), Some(_)) => {
                return Err(Error::InvalidPayload(
                    "SK payload must be the last payload".into(),
                ))
            }
            (_, Some(following)) => following.type_code(),
            (_, None) => PayloadType::None.to_u8(),
        };

        buf.try_reserve(PayloadHeader::SIZE + payload.body_len())?;
        let start = buf.len();
        buf.put_slice(&[0u8; PayloadHeader::SIZE]);
        payload.write_body(buf)?;

        let length = u16::try_from(buf.len() - start).map_err(|_| {
            Error::InvalidPayload(format!("payload of {} bytes", buf.len() - start))
        })?;
        let header = PayloadHeader {
            next_payload: next,
            critical: payload.critical(),
            length,
        };
        buf[start..start + PayloadHeader::SIZE].copy_from_slice(&header.to_bytes());
    }
    Ok(())
}
