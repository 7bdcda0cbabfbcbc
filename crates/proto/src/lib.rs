//! IKEv2 initiator engine for EAP-IKEv2.
//!
//! This crate implements the IKEv2 exchanges an EAP-IKEv2 server runs as
//! the IKE initiator (RFC 5106):
//!
//! - **Wire codec** for the IKE header and the payload chain
//! - **Proposal negotiation** of a single IKE SA proposal
//! - **Key derivation** of SKEYSEED and the seven SK_* keys
//! - **SK payload** encryption and integrity protection
//! - **Responder authentication** with shared keys or raw public keys
//!
//! # Features
//!
//! - `ikev2` (default) - IKEv2 initiator support
//!
//! # Example
//!
//! ```rust
//! use eapike_proto::ikev2::{Ikev2Initiator, InitiatorConfig, StaticCredentials};
//!
//! let config = InitiatorConfig::builder().build()?;
//! let mut initiator = Ikev2Initiator::new(config, StaticCredentials::new())?;
//!
//! // First request of the exchange, to be sent inside an EAP-IKEv2 packet
//! let request = initiator.build_next_message()?;
//! assert!(request.is_some());
//! # Ok::<(), eapike_proto::ikev2::Error>(())
//! ```
//!
//! # Security
//!
//! - All cryptographic primitives come from vetted crates (`ring`, RustCrypto, `dalek`)
//! - AUTH values are compared in constant time
//! - Key material is wiped on drop with `zeroize`
//! - The parsers are covered by a fuzz target
//!
//! # References
//!
//! - [RFC 7296](https://datatracker.ietf.org/doc/html/rfc7296) - IKEv2 Protocol
//! - [RFC 5106](https://datatracker.ietf.org/doc/html/rfc5106) - EAP-IKEv2 Method
//! - [RFC 7427](https://datatracker.ietf.org/doc/html/rfc7427) - Signature Authentication in IKEv2

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

#[cfg(feature = "ikev2")]
pub mod ikev2;
