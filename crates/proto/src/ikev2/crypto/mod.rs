//! Cryptographic algorithm tables for the IKE SA
//!
//! Each negotiable category is a closed enum keyed by its IANA transform ID:
//! - [`EncrAlgorithm`]: SK payload encryption (AES-CBC)
//! - [`PrfAlgorithm`]: PRF and prf+ key expansion (HMAC-SHA1, HMAC-SHA2-256)
//! - [`IntegAlgorithm`]: SK payload integrity (HMAC-SHA1-96, HMAC-SHA2-256-128)
//! - [`DhGroup`]: key exchange (MODP 1024/2048, Curve25519)
//!
//! The tables are immutable and shared freely between exchanges.

mod cipher;
mod dh;
mod integ;
mod prf;
mod random;

pub use cipher::EncrAlgorithm;
pub use dh::{DhGroup, DhKeyPair};
pub(crate) use dh::left_pad;
pub use integ::IntegAlgorithm;
pub use prf::PrfAlgorithm;
pub use random::{fill_random, random_bytes};

use super::{Error, Result};
use hmac::digest::KeyInit;
use hmac::Mac;

/// HMAC over the concatenation of `parts`
pub(crate) fn hmac_parts<M>(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|_| Error::CryptoError("invalid HMAC key length".into()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().to_vec())
}
