//! Diffie-Hellman groups for the IKE_SA_INIT key exchange
//!
//! - MODP group 2 (1024-bit, RFC 2409) and group 14 (2048-bit, RFC 3526)
//! - Curve25519 (group 31, RFC 8031)
//!
//! # Security
//!
//! - Private values are zeroized on drop, including the `BigUint`
//!   temporaries used for MODP exponentiation
//! - MODP peer values outside (1, p-1) are rejected
//! - Curve25519 shared values that are all zero are rejected

use super::random::fill_random;
use crate::ikev2::{Error, Result};
use num_bigint::{BigUint, RandBigInt};
use std::fmt;
use std::sync::atomic;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// MODP group parameters
mod modp {
    use num_bigint::BigUint;
    use once_cell::sync::Lazy;

    fn prime(hex_digits: &str) -> BigUint {
        BigUint::parse_bytes(hex_digits.as_bytes(), 16).expect("valid MODP prime")
    }

    /// Group 2 prime (1024-bit, RFC 2409 Section 6.2)
    pub static P1024: Lazy<BigUint> = Lazy::new(|| {
        prime(
            "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
             29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
             EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
             E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
             EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381\
             FFFFFFFFFFFFFFFF",
        )
    });

    /// Group 14 prime (2048-bit, RFC 3526 Section 3)
    pub static P2048: Lazy<BigUint> = Lazy::new(|| {
        prime(
            "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
             29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
             EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
             E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
             EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
             C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
             83655D23DCA3AD961C62F356208552BB9ED529077096966D\
             670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
             E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
             DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
             15728E5A8AACAA68FFFFFFFFFFFFFFFF",
        )
    });

    /// Generator shared by both groups
    pub static G: Lazy<BigUint> = Lazy::new(|| BigUint::from(2u32));
}

/// Diffie-Hellman group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DhGroup {
    /// 1024-bit MODP group (transform ID 2)
    Modp1024,
    /// 2048-bit MODP group (transform ID 14)
    Modp2048,
    /// Curve25519 (transform ID 31)
    Curve25519,
}

impl DhGroup {
    /// Look up by transform ID
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            2 => Some(DhGroup::Modp1024),
            14 => Some(DhGroup::Modp2048),
            31 => Some(DhGroup::Curve25519),
            _ => None,
        }
    }

    /// Transform ID
    pub fn id(self) -> u16 {
        match self {
            DhGroup::Modp1024 => 2,
            DhGroup::Modp2048 => 14,
            DhGroup::Curve25519 => 31,
        }
    }

    /// Length in bytes of public values and the shared value
    pub fn prime_len(self) -> usize {
        match self {
            DhGroup::Modp1024 => 128,
            DhGroup::Modp2048 => 256,
            DhGroup::Curve25519 => 32,
        }
    }

    fn modulus(self) -> Option<&'static BigUint> {
        match self {
            DhGroup::Modp1024 => Some(&*modp::P1024),
            DhGroup::Modp2048 => Some(&*modp::P2048),
            DhGroup::Curve25519 => None,
        }
    }

    /// Generate an ephemeral key pair
    pub fn generate(self) -> Result<DhKeyPair> {
        match self.modulus() {
            Some(p) => {
                // 1 < x < p-1
                let p_minus_one = p - 1u32;
                let x = SecretUint(
                    rand::thread_rng().gen_biguint_range(&BigUint::from(2u32), &p_minus_one),
                );
                let y = modp::G.modpow(&x.0, p);

                Ok(DhKeyPair {
                    group: self,
                    secret: DhSecret::Modp(Zeroizing::new(x.0.to_bytes_be())),
                    public: left_pad(&y.to_bytes_be(), self.prime_len())?,
                })
            }
            None => {
                let mut bytes = Zeroizing::new([0u8; 32]);
                fill_random(&mut bytes[..])?;
                let secret = StaticSecret::from(*bytes);
                let public = PublicKey::from(&secret).as_bytes().to_vec();

                Ok(DhKeyPair {
                    group: self,
                    secret: DhSecret::X25519(secret),
                    public,
                })
            }
        }
    }
}

/// `BigUint` holding private material, overwritten with zero digits on drop
struct SecretUint(BigUint);

impl SecretUint {
    fn wipe(&mut self) {
        let digits = self.0.iter_u32_digits().len();
        self.0.assign_from_slice(&vec![0u32; digits]);
        atomic::compiler_fence(atomic::Ordering::SeqCst);
    }
}

impl Drop for SecretUint {
    fn drop(&mut self) {
        self.wipe();
    }
}

enum DhSecret {
    Modp(Zeroizing<Vec<u8>>),
    X25519(StaticSecret),
}

/// Ephemeral Diffie-Hellman key pair
///
/// The shared value is computed by reference; the private half is wiped when
/// the pair is dropped.
pub struct DhKeyPair {
    group: DhGroup,
    secret: DhSecret,
    public: Vec<u8>,
}

impl DhKeyPair {
    /// Group of this key pair
    pub fn group(&self) -> DhGroup {
        self.group
    }

    /// Public value, left-padded with zeros to the group's prime length
    pub fn public_value(&self) -> &[u8] {
        &self.public
    }

    /// Compute the shared value g^ir from the peer's public value
    ///
    /// The result is not padded; for MODP groups it may be shorter than the
    /// prime length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeyExchange`] if the peer value is out of range
    /// or produces a degenerate shared value.
    pub fn compute_shared(&self, peer_public: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match &self.secret {
            DhSecret::Modp(x) => {
                let p = self.group.modulus().ok_or_else(|| {
                    Error::Internal("MODP secret without MODP group".into())
                })?;
                let y = BigUint::from_bytes_be(peer_public);
                let p_minus_one = p - 1u32;
                if y <= BigUint::from(1u32) || y >= p_minus_one {
                    return Err(Error::InvalidKeyExchange(
                        "peer public value out of range".into(),
                    ));
                }

                let x = SecretUint(BigUint::from_bytes_be(x));
                let z = SecretUint(y.modpow(&x.0, p));
                Ok(Zeroizing::new(z.0.to_bytes_be()))
            }
            DhSecret::X25519(secret) => {
                let peer: [u8; 32] = peer_public.try_into().map_err(|_| {
                    Error::InvalidKeyExchange(format!(
                        "Curve25519 public value must be 32 bytes, got {}",
                        peer_public.len()
                    ))
                })?;
                let shared = secret.diffie_hellman(&PublicKey::from(peer));
                if !shared.was_contributory() {
                    return Err(Error::InvalidKeyExchange(
                        "non-contributory Curve25519 public value".into(),
                    ));
                }
                Ok(Zeroizing::new(shared.as_bytes().to_vec()))
            }
        }
    }
}

impl fmt::Debug for DhKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhKeyPair")
            .field("group", &self.group)
            .field("public", &hex::encode(&self.public))
            .finish_non_exhaustive()
    }
}

/// Left-pad `value` with zeros to `len` bytes
pub(crate) fn left_pad(value: &[u8], len: usize) -> Result<Vec<u8>> {
    if value.len() > len {
        return Err(Error::Internal(format!(
            "value of {} bytes does not fit in {}",
            value.len(),
            len
        )));
    }
    let mut out = vec![0u8; len - value.len()];
    out.extend_from_slice(value);
    Ok(out)
}
