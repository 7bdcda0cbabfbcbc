//! IKEv2 message header and whole-message framing
//!
//! Implements the IKE message format defined in RFC 7296 Section 3.1

use super::constants::*;
use super::payload::{write_payload_chain, IkePayload};
use super::{Error, Result};

/// IKE message header (28 bytes)
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       IKE SA Initiator's SPI                  |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       IKE SA Responder's SPI                  |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Next Payload | MjVer | MnVer | Exchange Type |     Flags     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          Message ID                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Length                             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IkeHeader {
    /// Initiator's Security Parameter Index (8 bytes)
    pub initiator_spi: [u8; IKE_SPI_SIZE],

    /// Responder's Security Parameter Index (8 bytes, zero for IKE_SA_INIT request)
    pub responder_spi: [u8; IKE_SPI_SIZE],

    /// Type tag of the first payload (raw, so unknown types survive parsing)
    pub next_payload: u8,

    /// Protocol version (0x20 for IKEv2)
    pub version: u8,

    /// Exchange type
    pub exchange_type: ExchangeType,

    /// Message flags
    pub flags: IkeFlags,

    /// Message ID
    pub message_id: u32,

    /// Total message length in bytes (including header)
    pub length: u32,
}

impl IkeHeader {
    /// Create a new IKE header
    ///
    /// `next_payload` and `length` are filled in by [`build_message`].
    pub fn new(
        initiator_spi: [u8; IKE_SPI_SIZE],
        responder_spi: [u8; IKE_SPI_SIZE],
        exchange_type: ExchangeType,
        flags: IkeFlags,
        message_id: u32,
    ) -> Self {
        IkeHeader {
            initiator_spi,
            responder_spi,
            next_payload: PayloadType::None.to_u8(),
            version: IKE_VERSION,
            exchange_type,
            flags,
            message_id,
            length: IKE_HEADER_SIZE as u32,
        }
    }

    /// Parse the fixed header fields from the first 28 bytes of `data`
    ///
    /// Does not compare the declared length with the buffer; see
    /// [`parse_header`].
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Buffer is too short (< 28 bytes)
    /// - Exchange type is unknown
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < IKE_HEADER_SIZE {
            return Err(Error::BufferTooShort {
                required: IKE_HEADER_SIZE,
                available: data.len(),
            });
        }

        let mut initiator_spi = [0u8; IKE_SPI_SIZE];
        let mut responder_spi = [0u8; IKE_SPI_SIZE];
        initiator_spi.copy_from_slice(&data[0..8]);
        responder_spi.copy_from_slice(&data[8..16]);

        let exchange_type =
            ExchangeType::from_u8(data[18]).ok_or(Error::UnsupportedExchangeType(data[18]))?;

        Ok(IkeHeader {
            initiator_spi,
            responder_spi,
            next_payload: data[16],
            version: data[17],
            exchange_type,
            flags: IkeFlags::new(data[19]),
            message_id: u32::from_be_bytes([data[20], data[21], data[22], data[23]]),
            length: u32::from_be_bytes([data[24], data[25], data[26], data[27]]),
        })
    }

    /// Serialize IKE header to bytes
    pub fn to_bytes(&self) -> [u8; IKE_HEADER_SIZE] {
        let mut bytes = [0u8; IKE_HEADER_SIZE];

        bytes[0..8].copy_from_slice(&self.initiator_spi);
        bytes[8..16].copy_from_slice(&self.responder_spi);
        bytes[16] = self.next_payload;
        bytes[17] = self.version;
        bytes[18] = self.exchange_type.to_u8();
        bytes[19] = self.flags.value();
        bytes[20..24].copy_from_slice(&self.message_id.to_be_bytes());
        bytes[24..28].copy_from_slice(&self.length.to_be_bytes());

        bytes
    }
}

/// Parse and frame-check the header of a complete inbound message
///
/// # Errors
///
/// - [`Error::BufferTooShort`] if `message` is shorter than the fixed header
/// - [`Error::LengthMismatch`] if the declared length differs from `message.len()`
/// - [`Error::UnsupportedExchangeType`] for unknown exchange types
pub fn parse_header(message: &[u8]) -> Result<IkeHeader> {
    if message.len() < IKE_HEADER_SIZE {
        return Err(Error::BufferTooShort {
            required: IKE_HEADER_SIZE,
            available: message.len(),
        });
    }

    let declared = u32::from_be_bytes([message[24], message[25], message[26], message[27]]);
    if declared as usize != message.len() {
        return Err(Error::LengthMismatch {
            declared: declared as usize,
            actual: message.len(),
        });
    }

    IkeHeader::from_bytes(message)
}

/// Serialize a header followed by a payload chain
///
/// The header's `next_payload` and `length` fields are taken from the chain.
pub fn build_message(header: &IkeHeader, payloads: &[IkePayload]) -> Result<Vec<u8>> {
    let mut header = header.clone();
    header.next_payload = payloads
        .first()
        .map(|p| p.type_code())
        .unwrap_or(PayloadType::None.to_u8());

    let mut buf = Vec::new();
    buf.try_reserve(IKE_HEADER_SIZE)?;
    buf.extend_from_slice(&header.to_bytes());
    write_payload_chain(&mut buf, payloads)?;
    set_message_length(&mut buf)?;
    Ok(buf)
}

/// Backfill the header length field with the buffer length
pub(crate) fn set_message_length(buf: &mut [u8]) -> Result<()> {
    if buf.len() < IKE_HEADER_SIZE {
        return Err(Error::Internal("message shorter than header".into()));
    }
    let len = u32::try_from(buf.len())
        .map_err(|_| Error::InvalidPayload(format!("message of {} bytes", buf.len())))?;
    buf[24..28].copy_from_slice(&len.to_be_bytes());
    Ok(())
}
