//! IKEv2 initiator as carried by EAP-IKEv2
//!
//! This module implements the initiator side of the IKEv2 exchanges used by
//! EAP-IKEv2 (RFC 5106) on top of the IKEv2 message formats of RFC 7296.
//!
//! # Exchange Overview
//!
//! 1. **IKE_SA_INIT**: negotiate algorithms, exchange DH values and nonces
//! 2. **IKE_AUTH**: authenticate both sides inside the SK payload
//! 3. **CREATE_CHILD_SA**: optional, accepted once when configured
//!
//! The engine is sans-I/O: [`Ikev2Initiator::build_next_message`] produces
//! the bytes to send and [`Ikev2Initiator::process`] consumes the bytes
//! received. Framing into EAP packets is left to the caller.
//!
//! # Message Format
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       IKE SA Initiator's SPI                  |
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                       IKE SA Responder's SPI                  |
//! |                                                               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  Next Payload | MjVer | MnVer | Exchange Type |     Flags     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                          Message ID                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                            Length                             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! # References
//!
//! - [RFC 7296](https://datatracker.ietf.org/doc/html/rfc7296) - IKEv2 Protocol
//! - [RFC 5106](https://datatracker.ietf.org/doc/html/rfc5106) - EAP-IKEv2

pub mod auth;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod crypto;
pub mod encrypted;
pub mod error;
pub mod initiator;
pub mod keys;
pub mod logging;
pub mod message;
pub mod payload;
pub mod proposal;
pub mod state;

pub use config::{InitiatorConfig, InitiatorConfigBuilder, PeerAuthMode};
pub use constants::{ExchangeType, IkeFlags, PayloadType};
pub use credentials::{
    CertificateVerifier, CredentialResolver, RawKeyVerifier, SignatureAlgorithm,
    StaticCredentials,
};
pub use crypto::{DhGroup, EncrAlgorithm, IntegAlgorithm, PrfAlgorithm};
pub use error::{Error, ErrorKind, Result};
pub use initiator::Ikev2Initiator;
pub use keys::{Direction, KeyMaterial};
pub use message::{build_message, parse_header, IkeHeader};
pub use payload::{
    parse_payload_chain, AuthMethod, AuthPayload, CertEncoding, CertPayload, IdPayload, IdType,
    IkePayload, PayloadSet,
};
pub use proposal::{negotiate, LocalProposal, NegotiatedProposal, Proposal};
pub use state::ExchangeState;
