//! Cipher implementations for SK payload encryption
//!
//! Only AES-CBC with a 128-bit key is negotiable. Padding is handled by the
//! SK payload codec, so the cipher works on block-aligned buffers only.

use crate::ikev2::{Error, Result};
use aes::Aes128;
use cbc::{Decryptor, Encryptor};
use cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

type Aes128CbcEnc = Encryptor<Aes128>;
type Aes128CbcDec = Decryptor<Aes128>;

/// Encryption algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncrAlgorithm {
    /// ENCR_AES_CBC (transform ID 12) with a 128-bit key
    AesCbc,
}

impl EncrAlgorithm {
    /// Look up by transform ID
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            12 => Some(EncrAlgorithm::AesCbc),
            _ => None,
        }
    }

    /// Transform ID
    pub fn id(self) -> u16 {
        match self {
            EncrAlgorithm::AesCbc => 12,
        }
    }

    /// Key length in bytes (length of SK_ei and SK_er)
    pub fn key_len(self) -> usize {
        match self {
            EncrAlgorithm::AesCbc => 16,
        }
    }

    /// Cipher block size in bytes
    pub fn block_size(self) -> usize {
        match self {
            EncrAlgorithm::AesCbc => 16,
        }
    }

    /// IV length in bytes
    pub fn iv_len(self) -> usize {
        self.block_size()
    }

    /// Value the Key Length transform attribute must carry, in bits
    ///
    /// `None` for ciphers with a fixed key size.
    pub fn key_length_attribute(self) -> Option<u16> {
        match self {
            EncrAlgorithm::AesCbc => Some(128),
        }
    }

    /// Encrypt a block-aligned buffer
    pub fn encrypt(self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        match self {
            EncrAlgorithm::AesCbc => {
                let mut buf = data.to_vec();
                Aes128CbcEnc::new_from_slices(key, iv)
                    .map_err(|_| Error::CryptoError("invalid AES-CBC key or IV length".into()))?
                    .encrypt_padded_mut::<NoPadding>(&mut buf, data.len())
                    .map_err(|_| Error::CryptoError("plaintext is not block aligned".into()))?;
                Ok(buf)
            }
        }
    }

    /// Decrypt a block-aligned buffer
    pub fn decrypt(self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            EncrAlgorithm::AesCbc => {
                let mut buf = Zeroizing::new(data.to_vec());
                Aes128CbcDec::new_from_slices(key, iv)
                    .map_err(|_| Error::CryptoError("invalid AES-CBC key or IV length".into()))?
                    .decrypt_padded_mut::<NoPadding>(&mut buf)
                    .map_err(|_| Error::CryptoError("ciphertext is not block aligned".into()))?;
                Ok(buf)
            }
        }
    }
}
