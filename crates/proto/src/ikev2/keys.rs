//! IKE SA key derivation (RFC 7296 Section 2.14)
//!
//! ```text
//! SKEYSEED = prf(Ni | Nr, g^ir)
//!
//! {SK_d | SK_ai | SK_ar | SK_ei | SK_er | SK_pi | SK_pr}
//!     = prf+ (SKEYSEED, Ni | Nr | SPIi | SPIr)
//! ```
//!
//! `g^ir` is left-padded with zeros to the group's prime length before it
//! enters the PRF.

use super::constants::IKE_SPI_SIZE;
use super::crypto::left_pad;
use super::proposal::NegotiatedProposal;
use super::{Error, Result};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Traffic direction of an IKE message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the initiator
    InitiatorToResponder,
    /// Sent by the responder
    ResponderToInitiator,
}

/// Derived IKE SA key set
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    /// Key for deriving further keying material
    pub sk_d: Vec<u8>,
    /// Integrity key, initiator to responder
    pub sk_ai: Vec<u8>,
    /// Integrity key, responder to initiator
    pub sk_ar: Vec<u8>,
    /// Encryption key, initiator to responder
    pub sk_ei: Vec<u8>,
    /// Encryption key, responder to initiator
    pub sk_er: Vec<u8>,
    /// AUTH key for the initiator
    pub sk_pi: Vec<u8>,
    /// AUTH key for the responder
    pub sk_pr: Vec<u8>,
}

impl KeyMaterial {
    /// Derive the key set for a negotiated proposal
    ///
    /// `shared` is the raw Diffie-Hellman value. Values shorter than the
    /// group's prime length are zero-padded on the left.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyDerivationFailed`] if the shared value is longer
    /// than the prime, either nonce is empty, or the PRF fails.
    pub fn derive(
        proposal: &NegotiatedProposal,
        shared: &[u8],
        nonce_i: &[u8],
        nonce_r: &[u8],
        spi_i: &[u8; IKE_SPI_SIZE],
        spi_r: &[u8; IKE_SPI_SIZE],
    ) -> Result<Self> {
        if nonce_i.is_empty() || nonce_r.is_empty() {
            return Err(Error::KeyDerivationFailed("empty nonce".into()));
        }

        let prf = proposal.prf;
        let padded = Zeroizing::new(
            left_pad(shared, proposal.dh.prime_len())
                .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?,
        );

        let skeyseed = Zeroizing::new(
            prf.compute_parts(&[nonce_i, nonce_r].concat(), &[padded.as_slice()])
                .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?,
        );

        let mut seed = Vec::new();
        seed.try_reserve(nonce_i.len() + nonce_r.len() + 2 * IKE_SPI_SIZE)?;
        seed.extend_from_slice(nonce_i);
        seed.extend_from_slice(nonce_r);
        seed.extend_from_slice(spi_i);
        seed.extend_from_slice(spi_r);

        let prf_len = prf.key_len();
        let integ_len = proposal.integ.key_len();
        let encr_len = proposal.encr.key_len();
        let total = 3 * prf_len + 2 * integ_len + 2 * encr_len;

        let stream = prf
            .prf_plus(&skeyseed, &seed, total)
            .map_err(|e| match e {
                Error::KeyDerivationFailed(_) => e,
                other => Error::KeyDerivationFailed(other.to_string()),
            })?;

        let mut offset = 0;
        let mut take = |len: usize| {
            let key = stream[offset..offset + len].to_vec();
            offset += len;
            key
        };

        Ok(KeyMaterial {
            sk_d: take(prf_len),
            sk_ai: take(integ_len),
            sk_ar: take(integ_len),
            sk_ei: take(encr_len),
            sk_er: take(encr_len),
            sk_pi: take(prf_len),
            sk_pr: take(prf_len),
        })
    }

    /// Encryption key protecting messages sent in `direction`
    pub fn encryption_key(&self, direction: Direction) -> &[u8] {
        match direction {
            Direction::InitiatorToResponder => &self.sk_ei,
            Direction::ResponderToInitiator => &self.sk_er,
        }
    }

    /// Integrity key protecting messages sent in `direction`
    pub fn integrity_key(&self, direction: Direction) -> &[u8] {
        match direction {
            Direction::InitiatorToResponder => &self.sk_ai,
            Direction::ResponderToInitiator => &self.sk_ar,
        }
    }

    /// AUTH key of the party sending in `direction` (SK_pi or SK_pr)
    pub fn auth_key(&self, direction: Direction) -> &[u8] {
        match direction {
            Direction::InitiatorToResponder => &self.sk_pi,
            Direction::ResponderToInitiator => &self.sk_pr,
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("sk_d_len", &self.sk_d.len())
            .field("sk_a_len", &self.sk_ai.len())
            .field("sk_e_len", &self.sk_ei.len())
            .field("sk_p_len", &self.sk_pi.len())
            .finish()
    }
}
