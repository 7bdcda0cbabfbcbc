//! System randomness for SPIs, nonces, IVs and key material

use crate::ikev2::{Error, Result};
use ring::rand::{SecureRandom, SystemRandom};

/// Fill `buf` from the system CSPRNG
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| Error::CryptoError("system random generator failure".into()))
}

/// Return `len` bytes from the system CSPRNG
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf)?;
    Ok(buf)
}
