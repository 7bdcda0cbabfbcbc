//! IKEv2 Authentication
//!
//! Implements the AUTH computation of RFC 7296 Section 2.15 for the
//! initiator of an EAP-IKEv2 exchange (RFC 5106).
//!
//! ```text
//! ResponderSignedOctets = RealMessage2 | NonceI | prf(SK_pr, IDr')
//! InitiatorSignedOctets = RealMessage1 | NonceR | prf(SK_pi, IDi')
//!
//! AUTH = prf( prf(Shared Secret, "Key Pad for IKEv2"), <SignedOctets>)
//! ```

use super::credentials::CertificateVerifier;
use super::crypto::PrfAlgorithm;
use super::payload::{AuthMethod, AuthPayload, CertPayload, IdPayload};
use super::{Error, Result};
use subtle::ConstantTimeEq;

/// Construct signed octets
///
/// # Arguments
///
/// * `prf` - Negotiated PRF
/// * `transcript` - First message sent by the signing party, verbatim
/// * `nonce` - Nonce of the other party
/// * `sk_p` - SK_pi or SK_pr of the signing party
/// * `id` - Identity payload of the signing party
pub fn signed_octets(
    prf: PrfAlgorithm,
    transcript: &[u8],
    nonce: &[u8],
    sk_p: &[u8],
    id: &IdPayload,
) -> Result<Vec<u8>> {
    let id_hash = prf.compute(sk_p, &id.to_payload_data())?;

    let mut octets = Vec::new();
    octets.try_reserve(transcript.len() + nonce.len() + id_hash.len())?;
    octets.extend_from_slice(transcript);
    octets.extend_from_slice(nonce);
    octets.extend_from_slice(&id_hash);
    Ok(octets)
}

/// Compute shared key AUTH data over `signed_octets`
pub fn shared_key_auth(
    prf: PrfAlgorithm,
    secret: &[u8],
    key_pad: &[u8],
    signed_octets: &[u8],
) -> Result<Vec<u8>> {
    let key = zeroize::Zeroizing::new(prf.compute(secret, key_pad)?);
    prf.compute(&key, signed_octets)
}

/// Verify shared key AUTH payload
///
/// The method must be SHARED_KEY_MIC, the data length must equal the PRF
/// output length and the comparison runs in constant time.
///
/// # Errors
///
/// Returns [`Error::AuthenticationFailed`] on any mismatch.
pub fn verify_shared_key_auth(
    prf: PrfAlgorithm,
    secret: &[u8],
    key_pad: &[u8],
    signed_octets: &[u8],
    received: &AuthPayload,
) -> Result<()> {
    if received.auth_method != AuthMethod::SharedKeyMic {
        return Err(Error::AuthenticationFailed(format!(
            "unexpected authentication method {}",
            received.auth_method.to_u8()
        )));
    }

    let expected = shared_key_auth(prf, secret, key_pad, signed_octets)?;
    if received.auth_data.len() != prf.output_len()
        || !bool::from(expected.ct_eq(&received.auth_data))
    {
        return Err(Error::AuthenticationFailed(
            "invalid authentication data".into(),
        ));
    }

    Ok(())
}

/// Verify signature AUTH payload against the responder's CERT payload
///
/// # Errors
///
/// Returns [`Error::AuthenticationFailed`] if the method differs from
/// `method`, no certificate was received or the signature does not verify.
pub fn verify_certificate_auth(
    verifier: &dyn CertificateVerifier,
    method: AuthMethod,
    cert: Option<&CertPayload>,
    signed_octets: &[u8],
    received: &AuthPayload,
) -> Result<()> {
    if received.auth_method != method {
        return Err(Error::AuthenticationFailed(format!(
            "unexpected authentication method {}",
            received.auth_method.to_u8()
        )));
    }

    let cert = cert.ok_or_else(|| Error::AuthenticationFailed("no certificate received".into()))?;

    if !verifier.verify(cert, method, signed_octets, &received.auth_data) {
        return Err(Error::AuthenticationFailed(
            "signature verification failed".into(),
        ));
    }

    Ok(())
}

/// Check a received identity against the one recorded earlier in the exchange
///
/// # Errors
///
/// Returns [`Error::IdentityMismatch`] if an identity was recorded and
/// `received` differs from it in type or data.
pub fn check_identity(recorded: Option<&IdPayload>, received: &IdPayload) -> Result<()> {
    match recorded {
        Some(recorded) if recorded != received => Err(Error::IdentityMismatch),
        _ => Ok(()),
    }
}
