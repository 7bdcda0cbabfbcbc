//! Encrypted and Authenticated (SK) payload codec
//!
//! RFC 7296 Section 3.14, for CBC ciphers with a separate integrity
//! algorithm:
//!
//! ```text
//! HDR | SK hdr | IV | E(inner chain | padding | pad length) | ICV
//!  \___________________ integrity ___________________/
//! ```
//!
//! The ICV covers the whole message from the first octet of the IKE header
//! up to (not including) the ICV itself. Integrity and decryption failures
//! are reported as the same error.

use super::constants::PayloadType;
use super::crypto::fill_random;
use super::keys::{Direction, KeyMaterial};
use super::message::{build_message, IkeHeader};
use super::payload::{
    build_payload_chain, parse_payload_chain, EncryptedPayload, IkePayload, PayloadSet,
};
use super::proposal::NegotiatedProposal;
use super::{Error, Result};
use tracing::trace;
use zeroize::Zeroizing;

/// Padding needed so that `len` plus the pad length byte fills whole blocks
fn pad_len(len: usize, block_size: usize) -> usize {
    let pad = block_size - (len + 1) % block_size;
    if pad == block_size {
        0
    } else {
        pad
    }
}

/// Verify and decrypt the SK payload of `message`
///
/// `sk` must be the parsed SK payload of `message`, which is the last
/// payload of the message. Returns the inner payload chain without padding.
///
/// # Errors
///
/// Returns [`Error::EncryptedPayloadInvalid`] on any integrity, length,
/// decryption or padding failure.
pub fn decrypt_payload(
    proposal: &NegotiatedProposal,
    keys: &KeyMaterial,
    direction: Direction,
    message: &[u8],
    sk: &EncryptedPayload,
) -> Result<Zeroizing<Vec<u8>>> {
    let encr = proposal.encr;
    let integ = proposal.integ;
    let iv_len = encr.iv_len();
    let icv_len = integ.icv_len();
    let block_size = encr.block_size();

    if sk.data.len() < iv_len + block_size + icv_len || !message.ends_with(&sk.data) {
        trace!(sk_len = sk.data.len(), "SK payload too short");
        return Err(Error::EncryptedPayloadInvalid);
    }

    let ciphertext_len = sk.data.len() - iv_len - icv_len;
    if ciphertext_len % block_size != 0 {
        trace!(ciphertext_len, "SK ciphertext not block aligned");
        return Err(Error::EncryptedPayloadInvalid);
    }

    let (covered, icv) = message.split_at(message.len() - icv_len);
    let valid = integ
        .verify(keys.integrity_key(direction), covered, icv)
        .map_err(|_| Error::EncryptedPayloadInvalid)?;
    if !valid {
        trace!("SK integrity check failed");
        return Err(Error::EncryptedPayloadInvalid);
    }

    let iv = &sk.data[..iv_len];
    let ciphertext = &sk.data[iv_len..iv_len + ciphertext_len];
    let mut plaintext = encr
        .decrypt(keys.encryption_key(direction), iv, ciphertext)
        .map_err(|_| Error::EncryptedPayloadInvalid)?;

    let pad = match plaintext.last() {
        Some(&pad) => pad as usize,
        None => return Err(Error::EncryptedPayloadInvalid),
    };
    if pad + 1 > plaintext.len() {
        trace!(pad, "SK padding longer than plaintext");
        return Err(Error::EncryptedPayloadInvalid);
    }

    let inner_len = plaintext.len() - pad - 1;
    plaintext.truncate(inner_len);
    Ok(plaintext)
}

/// Verify, decrypt and parse the inner payload chain of an SK payload
pub fn decrypt_payloads(
    proposal: &NegotiatedProposal,
    keys: &KeyMaterial,
    direction: Direction,
    message: &[u8],
    sk: &EncryptedPayload,
) -> Result<PayloadSet> {
    let plaintext = decrypt_payload(proposal, keys, direction, message, sk)?;
    parse_payload_chain(sk.first_inner, &plaintext)
}

/// Build a message ending in an SK payload that wraps `plaintext`
///
/// `plain` payloads are sent in the clear ahead of the SK payload (usually
/// none). `plaintext` is an already serialized inner payload chain whose
/// first payload has type `first_inner`. A fresh random IV is drawn per
/// message.
pub fn encrypt_message(
    proposal: &NegotiatedProposal,
    keys: &KeyMaterial,
    direction: Direction,
    header: &IkeHeader,
    plain: &[IkePayload],
    first_inner: u8,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let encr = proposal.encr;
    let integ = proposal.integ;
    let block_size = encr.block_size();
    let icv_len = integ.icv_len();

    let pad = pad_len(plaintext.len(), block_size);
    let mut padded = Zeroizing::new(Vec::new());
    padded.try_reserve(plaintext.len() + pad + 1)?;
    padded.extend_from_slice(plaintext);
    padded.resize(plaintext.len() + pad, 0);
    padded.push(pad as u8);

    let mut iv = vec![0u8; encr.iv_len()];
    fill_random(&mut iv)?;
    let ciphertext = encr.encrypt(keys.encryption_key(direction), &iv, &padded)?;

    // ICV is zero until the rest of the message is laid out
    let mut data = Vec::new();
    data.try_reserve(iv.len() + ciphertext.len() + icv_len)?;
    data.extend_from_slice(&iv);
    data.extend_from_slice(&ciphertext);
    data.resize(data.len() + icv_len, 0);

    let mut chain = Vec::new();
    chain.try_reserve(plain.len() + 1)?;
    chain.extend_from_slice(plain);
    chain.push(IkePayload::SK(EncryptedPayload { first_inner, data }));

    let mut buf = build_message(header, &chain)?;
    let covered = buf.len() - icv_len;
    let icv = integ.compute(keys.integrity_key(direction), &buf[..covered])?;
    buf[covered..].copy_from_slice(&icv);

    trace!(len = buf.len(), pad, "built SK payload");
    Ok(buf)
}

/// Serialize `payloads` and wrap them in the only payload of a message
pub fn encrypt_payloads(
    proposal: &NegotiatedProposal,
    keys: &KeyMaterial,
    direction: Direction,
    header: &IkeHeader,
    payloads: &[IkePayload],
) -> Result<Vec<u8>> {
    let first_inner = payloads
        .first()
        .map(|p| p.type_code())
        .unwrap_or(PayloadType::None.to_u8());
    let plaintext = Zeroizing::new(build_payload_chain(payloads)?);
    encrypt_message(proposal, keys, direction, header, &[], first_inner, &plaintext)
}
