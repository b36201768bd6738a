//! Key material and nonces
//!
//! Keys are wrapped so they are scrubbed from memory on drop. Neither type is
//! persisted by this crate.

use std::fmt;

use ring::rand::{SecureRandom, SystemRandom};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{CryptoError, Result};

/// 256-bit key (32 bytes)
pub const KEY_LEN: usize = 32;
/// 128-bit nonce (16 bytes)
pub const NONCE_LEN: usize = 16;

/// A 32-byte secret key, zeroized on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    /// Generate a key from the OS CSPRNG
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| CryptoError::Random)?;
        let key = Self(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Build a key from raw bytes. Any length other than [`KEY_LEN`] is rejected.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::KeyLength(bytes.len()))?;
        Ok(Self(array))
    }

    /// Parse a hex-encoded key
    ///
    /// Surrounding whitespace is ignored. Invalid hex digits and a decoded length
    /// other than [`KEY_LEN`] are both format errors.
    pub fn from_hex(text: &str) -> Result<Self> {
        let decoded = Zeroizing::new(
            hex::decode(text.trim())
                .map_err(|e| CryptoError::Format(format!("invalid key hex: {e}")))?,
        );
        if decoded.len() != KEY_LEN {
            return Err(CryptoError::Format(format!(
                "key must be {KEY_LEN} bytes ({} hex characters), got {} bytes",
                KEY_LEN * 2,
                decoded.len()
            )));
        }
        Self::from_slice(&decoded)
    }

    /// Lowercase hex form of the key
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key([REDACTED])")
    }
}

/// A 16-byte per-operation nonce
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    /// Generate a fresh nonce from the OS CSPRNG
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| CryptoError::Random)?;
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; NONCE_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::NonceLength(bytes.len()))?;
        Ok(Self(array))
    }

    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}
