//! IKEv2 Proposal and Transform structures
//!
//! Implements SA proposal negotiation as defined in RFC 7296 Section 3.3.
//!
//! # Structure
//!
//! ```text
//! SA Payload
//!   └── Proposal (exactly one, protocol IKE, no SPI)
//!         └── Transform(s): ENCR, PRF, INTEG, D-H
//!               └── Attribute (Key Length, ENCR only)
//! ```
//!
//! Negotiation is a strict intersection: the initiator offers one value per
//! transform type and the responder's single proposal must echo each of
//! them.

use super::constants::PROTOCOL_ID_IKE;
use super::crypto::{DhGroup, EncrAlgorithm, IntegAlgorithm, PrfAlgorithm};
use super::payload::SaPayload;
use super::{Error, Result};
use bytes::BufMut;
use tracing::debug;

/// Transform attribute type for Key Length, with the AF (TV format) bit set
pub const KEY_LENGTH_ATTRIBUTE: u16 = 0x8000 | 14;

const PROPOSAL_HEADER_SIZE: usize = 8;
const TRANSFORM_HEADER_SIZE: usize = 8;

const PROPOSAL_LAST: u8 = 0;
const PROPOSAL_MORE: u8 = 2;
const TRANSFORM_LAST: u8 = 0;
const TRANSFORM_MORE: u8 = 3;

/// Transform Type (RFC 7296 Section 3.3.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransformType {
    /// Encryption Algorithm (ENCR)
    Encr = 1,
    /// Pseudo-random Function (PRF)
    Prf = 2,
    /// Integrity Algorithm (INTEG)
    Integ = 3,
    /// Diffie-Hellman Group (D-H)
    Dh = 4,
}

impl TransformType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(TransformType::Encr),
            2 => Some(TransformType::Prf),
            3 => Some(TransformType::Integ),
            4 => Some(TransformType::Dh),
            _ => None,
        }
    }

    /// Convert to u8
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Locally offered algorithm for each transform type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalProposal {
    /// Encryption algorithm
    pub encr: EncrAlgorithm,
    /// Pseudo-random function
    pub prf: PrfAlgorithm,
    /// Integrity algorithm
    pub integ: IntegAlgorithm,
    /// Diffie-Hellman group
    pub dh: DhGroup,
}

impl Default for LocalProposal {
    /// AES-CBC-128, HMAC-SHA1, HMAC-SHA1-96, MODP group 2
    fn default() -> Self {
        LocalProposal {
            encr: EncrAlgorithm::AesCbc,
            prf: PrfAlgorithm::HmacSha1,
            integ: IntegAlgorithm::HmacSha1_96,
            dh: DhGroup::Modp1024,
        }
    }
}

/// Proposal accepted from the responder's SA payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedProposal {
    /// Proposal number carried by the accepted proposal
    pub proposal_num: u8,
    /// Encryption algorithm
    pub encr: EncrAlgorithm,
    /// Pseudo-random function
    pub prf: PrfAlgorithm,
    /// Integrity algorithm
    pub integ: IntegAlgorithm,
    /// Diffie-Hellman group
    pub dh: DhGroup,
}

/// Transform substructure
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Last Substruc |   RESERVED    |        Transform Length       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Transform Type |   RESERVED    |          Transform ID         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                      Transform Attributes                     ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    /// Transform type (raw, so any value can be encoded)
    pub transform_type: u8,
    /// Transform ID
    pub transform_id: u16,
    /// Raw attribute bytes
    pub attributes: Vec<u8>,
}

impl Transform {
    /// Create a transform without attributes
    pub fn new(transform_type: TransformType, transform_id: u16) -> Self {
        Transform {
            transform_type: transform_type.to_u8(),
            transform_id,
            attributes: Vec::new(),
        }
    }

    /// ENCR transform, with a Key Length attribute when the cipher needs one
    pub fn encr(alg: EncrAlgorithm) -> Self {
        let mut transform = Transform::new(TransformType::Encr, alg.id());
        if let Some(bits) = alg.key_length_attribute() {
            transform = transform.with_key_length(bits);
        }
        transform
    }

    /// PRF transform
    pub fn prf(alg: PrfAlgorithm) -> Self {
        Transform::new(TransformType::Prf, alg.id())
    }

    /// INTEG transform
    pub fn integ(alg: IntegAlgorithm) -> Self {
        Transform::new(TransformType::Integ, alg.id())
    }

    /// D-H transform
    pub fn dh(group: DhGroup) -> Self {
        Transform::new(TransformType::Dh, group.id())
    }

    /// Replace the attributes with a single Key Length attribute
    pub fn with_key_length(mut self, bits: u16) -> Self {
        self.attributes.clear();
        self.attributes.put_u16(KEY_LENGTH_ATTRIBUTE);
        self.attributes.put_u16(bits);
        self
    }

    fn write(&self, buf: &mut Vec<u8>, last: bool) -> Result<()> {
        let length = u16::try_from(TRANSFORM_HEADER_SIZE + self.attributes.len())
            .map_err(|_| Error::InvalidProposal("transform too long".into()))?;
        buf.put_u8(if last { TRANSFORM_LAST } else { TRANSFORM_MORE });
        buf.put_u8(0);
        buf.put_u16(length);
        buf.put_u8(self.transform_type);
        buf.put_u8(0);
        buf.put_u16(self.transform_id);
        buf.put_slice(&self.attributes);
        Ok(())
    }
}

/// Proposal substructure
///
/// ```text
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Last Substruc |   RESERVED    |         Proposal Length       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// | Proposal Num  |  Protocol ID  |    SPI Size   |Num  Transforms|
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                        SPI (variable)                         ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ~                        <Transforms>                           ~
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Proposal number
    pub proposal_num: u8,
    /// Security protocol ID
    pub protocol_id: u8,
    /// SPI (empty for the initial IKE SA)
    pub spi: Vec<u8>,
    /// Transforms
    pub transforms: Vec<Transform>,
}

impl Proposal {
    /// Create an empty IKE proposal
    pub fn new(proposal_num: u8) -> Self {
        Proposal {
            proposal_num,
            protocol_id: PROTOCOL_ID_IKE,
            spi: Vec::new(),
            transforms: Vec::new(),
        }
    }

    /// IKE proposal offering exactly the local algorithms
    pub fn ike(proposal_num: u8, local: &LocalProposal) -> Self {
        Proposal::new(proposal_num)
            .add_transform(Transform::encr(local.encr))
            .add_transform(Transform::prf(local.prf))
            .add_transform(Transform::integ(local.integ))
            .add_transform(Transform::dh(local.dh))
    }

    /// Add transform to proposal
    pub fn add_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Serialize proposal substructure
    pub fn to_bytes(&self, last: bool) -> Result<Vec<u8>> {
        let spi_size = u8::try_from(self.spi.len())
            .map_err(|_| Error::InvalidProposal("SPI too long".into()))?;
        let num_transforms = u8::try_from(self.transforms.len())
            .map_err(|_| Error::InvalidProposal("too many transforms".into()))?;

        let mut buf = Vec::new();
        buf.put_u8(if last { PROPOSAL_LAST } else { PROPOSAL_MORE });
        buf.put_u8(0);
        buf.put_u16(0);
        buf.put_u8(self.proposal_num);
        buf.put_u8(self.protocol_id);
        buf.put_u8(spi_size);
        buf.put_u8(num_transforms);
        buf.put_slice(&self.spi);

        for (i, transform) in self.transforms.iter().enumerate() {
            transform.write(&mut buf, i + 1 == self.transforms.len())?;
        }

        let length = u16::try_from(buf.len())
            .map_err(|_| Error::InvalidProposal("proposal too long".into()))?;
        buf[2..4].copy_from_slice(&length.to_be_bytes());
        Ok(buf)
    }

    /// SA payload carrying only this proposal
    pub fn to_sa_payload(&self) -> Result<SaPayload> {
        Ok(SaPayload {
            proposals: self.to_bytes(true)?,
        })
    }
}

#[derive(Default)]
struct Selection {
    encr: Option<EncrAlgorithm>,
    prf: Option<PrfAlgorithm>,
    integ: Option<IntegAlgorithm>,
    dh: Option<DhGroup>,
}

/// Select the proposal in a responder SA payload
///
/// `sa` is the SA payload body. Exactly one proposal is parsed; the
/// algorithms it carries must include the local choice for each of ENCR,
/// PRF, INTEG and D-H.
///
/// # Errors
///
/// - [`Error::InvalidProposal`] for malformed proposal or transform framing,
///   a non-IKE protocol, a non-empty SPI, zero transforms or extra bytes after
///   the proposal
/// - [`Error::NoProposalChosen`] if any category is left unmatched
pub fn negotiate(sa: &[u8], local: &LocalProposal) -> Result<NegotiatedProposal> {
    let mut counter: u8 = 1;
    let (selection, proposal_num, consumed) = parse_proposal(sa, &mut counter, local)?;
    if consumed != sa.len() {
        return Err(Error::InvalidProposal(format!(
            "{} unexpected bytes after proposal",
            sa.len() - consumed
        )));
    }

    match (selection.encr, selection.prf, selection.integ, selection.dh) {
        (Some(encr), Some(prf), Some(integ), Some(dh)) => Ok(NegotiatedProposal {
            proposal_num,
            encr,
            prf,
            integ,
            dh,
        }),
        _ => Err(Error::NoProposalChosen),
    }
}

fn parse_proposal(
    data: &[u8],
    counter: &mut u8,
    local: &LocalProposal,
) -> Result<(Selection, u8, usize)> {
    if data.len() < PROPOSAL_HEADER_SIZE {
        return Err(Error::InvalidProposal("too short proposal".into()));
    }

    if data[0] != PROPOSAL_LAST && data[0] != PROPOSAL_MORE {
        return Err(Error::InvalidProposal(format!(
            "unexpected proposal type {}",
            data[0]
        )));
    }

    let plen = u16::from_be_bytes([data[2], data[3]]) as usize;
    if plen < PROPOSAL_HEADER_SIZE || plen > data.len() {
        return Err(Error::InvalidProposal(format!(
            "invalid proposal length {}",
            plen
        )));
    }

    let proposal_num = data[4];
    if proposal_num != *counter {
        if Some(proposal_num) == counter.checked_add(1) {
            *counter = proposal_num;
        } else {
            return Err(Error::InvalidProposal(format!(
                "unexpected proposal #{}",
                proposal_num
            )));
        }
    }

    if data[5] != PROTOCOL_ID_IKE {
        return Err(Error::InvalidProposal(format!(
            "unexpected protocol ID {}",
            data[5]
        )));
    }

    let spi_size = data[6] as usize;
    if PROPOSAL_HEADER_SIZE + spi_size > plen {
        return Err(Error::InvalidProposal("not enough room for SPI".into()));
    }
    if spi_size != 0 {
        return Err(Error::InvalidProposal(format!(
            "unexpected SPI size {}",
            spi_size
        )));
    }

    let num_transforms = data[7];
    if num_transforms == 0 {
        return Err(Error::InvalidProposal("at least one transform required".into()));
    }

    let mut selection = Selection::default();
    let mut pos = PROPOSAL_HEADER_SIZE + spi_size;
    for _ in 0..num_transforms {
        pos += parse_transform(&data[pos..plen], &mut selection, local)?;
    }

    if pos != plen {
        return Err(Error::InvalidProposal(
            "unexpected data after transforms".into(),
        ));
    }

    Ok((selection, proposal_num, plen))
}

fn parse_transform(data: &[u8], selection: &mut Selection, local: &LocalProposal) -> Result<usize> {
    if data.len() < TRANSFORM_HEADER_SIZE {
        return Err(Error::InvalidProposal("too short transform".into()));
    }

    if data[0] != TRANSFORM_LAST && data[0] != TRANSFORM_MORE {
        return Err(Error::InvalidProposal(format!(
            "unexpected transform type {}",
            data[0]
        )));
    }

    let tlen = u16::from_be_bytes([data[2], data[3]]) as usize;
    if tlen < TRANSFORM_HEADER_SIZE || tlen > data.len() {
        return Err(Error::InvalidProposal(format!(
            "invalid transform length {}",
            tlen
        )));
    }

    let transform_id = u16::from_be_bytes([data[6], data[7]]);
    let attributes = &data[TRANSFORM_HEADER_SIZE..tlen];

    match TransformType::from_u8(data[4]) {
        Some(TransformType::Encr) => {
            if EncrAlgorithm::from_id(transform_id) == Some(local.encr) {
                if key_length_matches(local.encr, attributes) {
                    selection.encr = Some(local.encr);
                } else {
                    debug!(
                        transform_id = transform_id,
                        "skipping ENCR transform with unsupported key length"
                    );
                }
            }
        }
        Some(TransformType::Prf) => {
            if PrfAlgorithm::from_id(transform_id) == Some(local.prf) {
                selection.prf = Some(local.prf);
            }
        }
        Some(TransformType::Integ) => {
            if IntegAlgorithm::from_id(transform_id) == Some(local.integ) {
                selection.integ = Some(local.integ);
            }
        }
        Some(TransformType::Dh) => {
            if DhGroup::from_id(transform_id) == Some(local.dh) {
                selection.dh = Some(local.dh);
            }
        }
        None => {
            debug!(transform_type = data[4], "ignoring unknown transform type");
        }
    }

    Ok(tlen)
}

fn key_length_matches(alg: EncrAlgorithm, attributes: &[u8]) -> bool {
    match alg.key_length_attribute() {
        Some(bits) => {
            attributes.len() == 4
                && u16::from_be_bytes([attributes[0], attributes[1]]) == KEY_LENGTH_ATTRIBUTE
                && u16::from_be_bytes([attributes[2], attributes[3]]) == bits
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> LocalProposal {
        LocalProposal {
            encr: EncrAlgorithm::AesCbc,
            prf: PrfAlgorithm::HmacSha256,
            integ: IntegAlgorithm::HmacSha256_128,
            dh: DhGroup::Curve25519,
        }
    }

    fn sa_bytes(proposal: &Proposal) -> Vec<u8> {
        proposal.to_bytes(true).unwrap()
    }

    #[test]
    fn test_transform_type_conversion() {
        assert_eq!(TransformType::from_u8(1), Some(TransformType::Encr));
        assert_eq!(TransformType::from_u8(4), Some(TransformType::Dh));
        assert_eq!(TransformType::from_u8(5), None);
        assert_eq!(TransformType::Integ.to_u8(), 3);
    }

    #[test]
    fn test_proposal_layout() {
        let bytes = sa_bytes(&Proposal::ike(1, &local()));
        // header + ENCR(8+4) + PRF(8) + INTEG(8) + DH(8)
        assert_eq!(bytes.len(), 8 + 12 + 8 + 8 + 8);
        assert_eq!(bytes[0], PROPOSAL_LAST);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]) as usize, bytes.len());
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[5], PROTOCOL_ID_IKE);
        assert_eq!(bytes[6], 0);
        assert_eq!(bytes[7], 4);

        // First transform: ENCR AES-CBC with key length 128
        assert_eq!(bytes[8], TRANSFORM_MORE);
        assert_eq!(&bytes[10..12], &[0, 12]);
        assert_eq!(bytes[12], TransformType::Encr.to_u8());
        assert_eq!(&bytes[14..16], &[0, 12]);
        assert_eq!(&bytes[16..20], &[0x80, 0x0e, 0x00, 0x80]);

        // Last transform is marked last
        assert_eq!(bytes[bytes.len() - 8], TRANSFORM_LAST);
    }

    #[test]
    fn test_negotiate_matching_proposal() {
        let bytes = sa_bytes(&Proposal::ike(1, &local()));
        let negotiated = negotiate(&bytes, &local()).unwrap();
        assert_eq!(negotiated.proposal_num, 1);
        assert_eq!(negotiated.encr, EncrAlgorithm::AesCbc);
        assert_eq!(negotiated.prf, PrfAlgorithm::HmacSha256);
        assert_eq!(negotiated.integ, IntegAlgorithm::HmacSha256_128);
        assert_eq!(negotiated.dh, DhGroup::Curve25519);
    }

    #[test]
    fn test_negotiate_is_deterministic() {
        let bytes = sa_bytes(&Proposal::ike(1, &local()));
        let first = negotiate(&bytes, &local()).unwrap();
        for _ in 0..10 {
            assert_eq!(negotiate(&bytes, &local()).unwrap(), first);
        }
    }

    #[test]
    fn test_negotiate_accepts_next_proposal_number() {
        let bytes = sa_bytes(&Proposal::ike(2, &local()));
        assert_eq!(negotiate(&bytes, &local()).unwrap().proposal_num, 2);

        let bytes = sa_bytes(&Proposal::ike(3, &local()));
        assert!(matches!(
            negotiate(&bytes, &local()),
            Err(Error::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_negotiate_ignores_extra_transforms() {
        let proposal = Proposal::new(1)
            .add_transform(Transform::new(TransformType::Encr, 20))
            .add_transform(Transform::encr(EncrAlgorithm::AesCbc))
            .add_transform(Transform::prf(PrfAlgorithm::HmacSha1))
            .add_transform(Transform::prf(PrfAlgorithm::HmacSha256))
            .add_transform(Transform::integ(IntegAlgorithm::HmacSha256_128))
            .add_transform(Transform::dh(DhGroup::Modp2048))
            .add_transform(Transform::dh(DhGroup::Curve25519))
            .add_transform(Transform {
                transform_type: 5,
                transform_id: 0,
                attributes: Vec::new(),
            });
        let negotiated = negotiate(&sa_bytes(&proposal), &local()).unwrap();
        assert_eq!(negotiated.prf, PrfAlgorithm::HmacSha256);
        assert_eq!(negotiated.dh, DhGroup::Curve25519);
    }

    #[test]
    fn test_negotiate_missing_category() {
        let proposal = Proposal::new(1)
            .add_transform(Transform::encr(EncrAlgorithm::AesCbc))
            .add_transform(Transform::prf(PrfAlgorithm::HmacSha256))
            .add_transform(Transform::integ(IntegAlgorithm::HmacSha256_128))
            .add_transform(Transform::dh(DhGroup::Modp2048));
        assert!(matches!(
            negotiate(&sa_bytes(&proposal), &local()),
            Err(Error::NoProposalChosen)
        ));
    }

    #[test]
    fn test_encr_key_length_must_be_128() {
        let proposal = Proposal::ike(1, &local());
        let mut wrong_len = proposal.clone();
        wrong_len.transforms[0] = Transform::encr(EncrAlgorithm::AesCbc).with_key_length(256);
        assert!(matches!(
            negotiate(&sa_bytes(&wrong_len), &local()),
            Err(Error::NoProposalChosen)
        ));

        let mut no_attr = proposal.clone();
        no_attr.transforms[0] = Transform::new(TransformType::Encr, 12);
        assert!(matches!(
            negotiate(&sa_bytes(&no_attr), &local()),
            Err(Error::NoProposalChosen)
        ));

        let mut extra_attr = proposal;
        extra_attr.transforms[0]
            .attributes
            .extend_from_slice(&[0x80, 0x0e, 0x00, 0x80]);
        assert!(matches!(
            negotiate(&sa_bytes(&extra_attr), &local()),
            Err(Error::NoProposalChosen)
        ));
    }

    #[test]
    fn test_reject_nonzero_spi_size() {
        let mut proposal = Proposal::ike(1, &local());
        proposal.spi = vec![0x11; 8];
        assert!(matches!(
            negotiate(&sa_bytes(&proposal), &local()),
            Err(Error::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_reject_zero_transforms() {
        let proposal = Proposal::new(1);
        assert!(matches!(
            negotiate(&sa_bytes(&proposal), &local()),
            Err(Error::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_reject_non_ike_protocol() {
        let mut proposal = Proposal::ike(1, &local());
        proposal.protocol_id = 3;
        assert!(matches!(
            negotiate(&sa_bytes(&proposal), &local()),
            Err(Error::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_reject_data_after_proposal() {
        let mut bytes = Proposal::ike(1, &local()).to_bytes(false).unwrap();
        bytes.extend_from_slice(&Proposal::ike(2, &local()).to_bytes(true).unwrap());
        assert!(matches!(
            negotiate(&bytes, &local()),
            Err(Error::InvalidProposal(_))
        ));
    }

    #[test]
    fn test_reject_bad_framing() {
        let good = sa_bytes(&Proposal::ike(1, &local()));

        assert!(negotiate(&[], &local()).is_err());
        assert!(negotiate(&good[..7], &local()).is_err());

        // Proposal length overruns the SA payload
        let mut bytes = good.clone();
        bytes[3] += 1;
        assert!(matches!(
            negotiate(&bytes, &local()),
            Err(Error::InvalidProposal(_))
        ));

        // Invalid last-substructure value
        let mut bytes = good.clone();
        bytes[0] = 1;
        assert!(negotiate(&bytes, &local()).is_err());

        // Transform count larger than the transforms present
        let mut bytes = good.clone();
        bytes[7] = 5;
        assert!(negotiate(&bytes, &local()).is_err());

        // Transform count smaller than the transforms present
        let mut bytes = good.clone();
        bytes[7] = 3;
        assert!(matches!(
            negotiate(&bytes, &local()),
            Err(Error::InvalidProposal(_))
        ));

        // Transform length shorter than its header
        let mut bytes = good;
        bytes[11] = 4;
        assert!(negotiate(&bytes, &local()).is_err());
    }
}
