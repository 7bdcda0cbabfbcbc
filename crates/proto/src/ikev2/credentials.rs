//! Credential lookup and certificate verification collaborators
//!
//! The exchange engine never stores secrets or trust anchors itself. It asks
//! a [`CredentialResolver`] for the shared secret of a peer and hands
//! signature checks to a [`CertificateVerifier`].
//!
//! [`RawKeyVerifier`] covers raw public keys (RFC 7670) with ECDSA P-256
//! (RFC 4754) and the Digital Signature method (RFC 7427).

use super::logging;
use super::payload::{AuthMethod, CertEncoding, CertPayload, IdPayload};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Looks up the shared secret for a peer identity
pub trait CredentialResolver: Send + Sync {
    /// Secret shared with `peer`, or `None` if the peer is unknown
    ///
    /// `peer` is `None` when the responder has not sent an identity yet.
    fn shared_secret(&self, peer: Option<&IdPayload>) -> Option<Zeroizing<Vec<u8>>>;
}

impl<F> CredentialResolver for F
where
    F: Fn(Option<&IdPayload>) -> Option<Zeroizing<Vec<u8>>> + Send + Sync,
{
    fn shared_secret(&self, peer: Option<&IdPayload>) -> Option<Zeroizing<Vec<u8>>> {
        self(peer)
    }
}

/// Fixed table of identity to secret mappings
///
/// A fallback secret, if configured, is returned for identities missing from
/// the table. Every use of it is logged.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    entries: Vec<(IdPayload, Zeroizing<Vec<u8>>)>,
    fallback: Option<Zeroizing<Vec<u8>>>,
}

impl StaticCredentials {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret for `identity`, replacing any existing one
    pub fn with_secret(mut self, identity: IdPayload, secret: impl Into<Vec<u8>>) -> Self {
        self.entries.retain(|(id, _)| *id != identity);
        self.entries.push((identity, Zeroizing::new(secret.into())));
        self
    }

    /// Secret to use when no identity matches
    pub fn with_fallback(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.fallback = Some(Zeroizing::new(secret.into()));
        self
    }

    /// Number of identities in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialResolver for StaticCredentials {
    fn shared_secret(&self, peer: Option<&IdPayload>) -> Option<Zeroizing<Vec<u8>>> {
        let found = peer.and_then(|peer| {
            self.entries
                .iter()
                .find(|(id, _)| id == peer)
                .map(|(_, secret)| secret.clone())
        });
        if found.is_some() {
            return found;
        }

        let fallback = self.fallback.clone()?;
        logging::log_credential_fallback(peer);
        Some(fallback)
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("entries", &self.entries.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Checks the responder's signature AUTH
pub trait CertificateVerifier: Send + Sync {
    /// Whether `signature` over `signed_octets` is valid for `cert`
    fn verify(
        &self,
        cert: &CertPayload,
        method: AuthMethod,
        signed_octets: &[u8],
        signature: &[u8],
    ) -> bool;
}

/// Signature algorithms recognised in RFC 7427 AUTH data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// Ed25519 (RFC 8420)
    Ed25519,
    /// ECDSA with SHA-256 on P-256, DER-encoded signature
    EcdsaWithSha256,
}

/// DER AlgorithmIdentifier for each supported algorithm, in lookup order
pub static SIGNATURE_ALGORITHMS: &[(SignatureAlgorithm, &[u8])] = &[
    (
        SignatureAlgorithm::Ed25519,
        &[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70],
    ),
    (
        SignatureAlgorithm::EcdsaWithSha256,
        &[
            0x30, 0x0a, 0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02,
        ],
    ),
];

impl SignatureAlgorithm {
    /// Find the algorithm whose AlgorithmIdentifier matches `der`
    pub fn from_algorithm_identifier(der: &[u8]) -> Option<Self> {
        SIGNATURE_ALGORITHMS
            .iter()
            .find(|(_, id)| *id == der)
            .map(|(alg, _)| *alg)
    }

    /// DER AlgorithmIdentifier of this algorithm
    pub fn algorithm_identifier(self) -> &'static [u8] {
        SIGNATURE_ALGORITHMS
            .iter()
            .find(|(alg, _)| *alg == self)
            .map(|(_, id)| *id)
            .unwrap_or_default()
    }

    fn verify(self, public_key: &[u8], data: &[u8], signature: &[u8]) -> bool {
        match self {
            SignatureAlgorithm::Ed25519 => verify_ed25519(public_key, data, signature),
            SignatureAlgorithm::EcdsaWithSha256 => {
                use p256::ecdsa::signature::Verifier;

                let Ok(key) = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key) else {
                    return false;
                };
                let Ok(sig) = p256::ecdsa::Signature::from_der(signature) else {
                    return false;
                };
                key.verify(data, &sig).is_ok()
            }
        }
    }
}

/// Split RFC 7427 AUTH data into AlgorithmIdentifier and signature
///
/// ```text
/// | ASN.1 Length | AlgorithmIdentifier ASN.1 object | Signature Value |
/// ```
pub fn split_digital_signature(auth_data: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&len, rest) = auth_data.split_first()?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}

fn verify_ed25519(public_key: &[u8], data: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
        return false;
    };
    key.verify_strict(data, &sig).is_ok()
}

/// Verifier for raw public key CERT payloads
///
/// Supports AUTH method 9 (ECDSA P-256, `r | s`) with an uncompressed or
/// compressed SEC1 key and method 14 with Ed25519 or ECDSA-with-SHA256.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawKeyVerifier;

impl CertificateVerifier for RawKeyVerifier {
    fn verify(
        &self,
        cert: &CertPayload,
        method: AuthMethod,
        signed_octets: &[u8],
        signature: &[u8],
    ) -> bool {
        if cert.encoding != CertEncoding::RawPublicKey {
            debug!(encoding = cert.encoding.to_u8(), "unsupported certificate encoding");
            return false;
        }

        match method {
            AuthMethod::EcdsaSha256P256 => {
                use p256::ecdsa::signature::Verifier;

                let Ok(key) = p256::ecdsa::VerifyingKey::from_sec1_bytes(&cert.data) else {
                    return false;
                };
                let Ok(sig) = p256::ecdsa::Signature::from_slice(signature) else {
                    return false;
                };
                key.verify(signed_octets, &sig).is_ok()
            }
            AuthMethod::DigitalSignature => {
                let Some((alg_id, sig)) = split_digital_signature(signature) else {
                    return false;
                };
                match SignatureAlgorithm::from_algorithm_identifier(alg_id) {
                    Some(alg) => alg.verify(&cert.data, signed_octets, sig),
                    None => {
                        debug!(alg_id = %hex::encode(alg_id), "unknown signature algorithm");
                        false
                    }
                }
            }
            other => {
                debug!(method = other.to_u8(), "unsupported signature method");
                false
            }
        }
    }
}
