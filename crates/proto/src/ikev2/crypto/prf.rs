//! Pseudo-Random Function (PRF) implementations
//!
//! Implements the PRF transforms used for SKEYSEED, key expansion and AUTH
//! computation (RFC 7296 Section 2.13).

use super::hmac_parts;
use crate::ikev2::{Error, Result};
use hmac::Hmac;
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

/// PRF algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrfAlgorithm {
    /// PRF_HMAC_SHA1 (transform ID 2)
    HmacSha1,
    /// PRF_HMAC_SHA2_256 (transform ID 5)
    HmacSha256,
}

impl PrfAlgorithm {
    /// Look up by transform ID
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            2 => Some(PrfAlgorithm::HmacSha1),
            5 => Some(PrfAlgorithm::HmacSha256),
            _ => None,
        }
    }

    /// Transform ID
    pub fn id(self) -> u16 {
        match self {
            PrfAlgorithm::HmacSha1 => 2,
            PrfAlgorithm::HmacSha256 => 5,
        }
    }

    /// Preferred key length in bytes (length of SK_d, SK_pi and SK_pr)
    pub fn key_len(self) -> usize {
        self.output_len()
    }

    /// Get PRF output length in bytes
    pub fn output_len(self) -> usize {
        match self {
            PrfAlgorithm::HmacSha1 => 20,
            PrfAlgorithm::HmacSha256 => 32,
        }
    }

    /// Compute PRF
    pub fn compute(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        self.compute_parts(key, &[data])
    }

    /// Compute PRF over the concatenation of `parts`
    pub fn compute_parts(self, key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>> {
        match self {
            PrfAlgorithm::HmacSha1 => hmac_parts::<Hmac<Sha1>>(key, parts),
            PrfAlgorithm::HmacSha256 => hmac_parts::<Hmac<Sha256>>(key, parts),
        }
    }

    /// Compute prf+ (key expansion function)
    ///
    /// Defined in RFC 7296 Section 2.13:
    /// ```text
    /// prf+ (K,S) = T1 | T2 | T3 | T4 | ...
    ///
    /// where:
    /// T1 = prf (K, S | 0x01)
    /// T2 = prf (K, T1 | S | 0x02)
    /// T3 = prf (K, T2 | S | 0x03)
    /// ...
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyDerivationFailed`] if more than 255 blocks would be
    /// needed.
    pub fn prf_plus(
        self,
        key: &[u8],
        seed: &[u8],
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let blocks = (output_len + self.output_len() - 1) / self.output_len();
        if blocks > 255 {
            return Err(Error::KeyDerivationFailed(format!(
                "prf+ output of {} bytes needs {} blocks",
                output_len, blocks
            )));
        }

        let mut output = Zeroizing::new(Vec::with_capacity(blocks * self.output_len()));
        let mut t = Zeroizing::new(Vec::new());
        for counter in 1..=blocks as u8 {
            t = Zeroizing::new(
                self.compute_parts(key, &[t.as_slice(), seed, &[counter][..]])?,
            );
            output.extend_from_slice(&t);
        }

        output.truncate(output_len);
        Ok(output)
    }
}
