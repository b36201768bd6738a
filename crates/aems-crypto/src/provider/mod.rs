//! Block cipher providers
//!
//! The engine never touches block mathematics directly. It talks to a
//! [`BlockCipherProvider`] that turns a key into a [`CipherContext`], and the
//! context transforms padded buffers in place. Dropping the context destroys it.
//!
//! Two providers ship with the crate, both running the same CBC chaining with
//! the nonce as IV:
//! - `aes-256`: AES-256 block transform
//! - `aems`: keyed substitution/permutation network derived from the key

mod aes256;
mod cbc;
mod permutation;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::keys::{Key, Nonce};
use crate::{CryptoError, Result};

pub use self::aes256::Aes256Provider;
pub use self::permutation::PermutationProvider;

/// Block size shared by every provider (16 bytes)
pub const BLOCK_LEN: usize = 16;

/// Factory for cipher contexts bound to a key
pub trait BlockCipherProvider: Send + Sync {
    /// Stable identifier used in configuration and logs
    fn name(&self) -> &'static str;

    /// Bind a new context to `key`. The context is destroyed when dropped.
    fn create_context(&self, key: &Key) -> Result<Box<dyn CipherContext>>;

    fn generate_key(&self) -> Result<Key> {
        Key::generate()
    }
}

/// A live, keyed transform
///
/// Both operations work in place and return the number of meaningful bytes
/// left in `buffer`.
pub trait CipherContext: Send {
    /// Encrypt `buffer`, whose first `plaintext_len` bytes are the plaintext and
    /// whose remainder is reserved padding capacity owned by the provider.
    fn encrypt_in_place(
        &mut self,
        buffer: &mut [u8],
        plaintext_len: usize,
        nonce: &Nonce,
    ) -> Result<usize>;

    /// Decrypt the first `ciphertext_len` bytes of `buffer`.
    fn decrypt_in_place(
        &mut self,
        buffer: &mut [u8],
        ciphertext_len: usize,
        nonce: &Nonce,
    ) -> Result<usize>;
}

static AES_256: Aes256Provider = Aes256Provider;
static PERMUTATION: PermutationProvider = PermutationProvider;

/// Provider selection for configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherKind {
    #[default]
    #[serde(rename = "aes-256")]
    Aes256,
    #[serde(rename = "aems")]
    Permutation,
}

impl CipherKind {
    pub fn provider(self) -> &'static dyn BlockCipherProvider {
        match self {
            CipherKind::Aes256 => &AES_256,
            CipherKind::Permutation => &PERMUTATION,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.provider().name()
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherKind {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-256" | "aes256" | "aes" => Ok(CipherKind::Aes256),
            "aems" | "permutation" => Ok(CipherKind::Permutation),
            other => Err(CryptoError::Format(format!("unknown cipher: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cipher_kind_names() {
        assert_eq!(CipherKind::Aes256.to_string(), "aes-256");
        assert_eq!(CipherKind::Permutation.to_string(), "aems");
    }

    #[test]
    fn test_cipher_kind_parse() {
        assert_eq!("AES-256".parse::<CipherKind>().unwrap(), CipherKind::Aes256);
        assert_eq!("aems".parse::<CipherKind>().unwrap(), CipherKind::Permutation);
        assert!("des".parse::<CipherKind>().is_err());
    }

    #[test]
    fn test_every_provider_roundtrips() {
        let key = Key::from_slice(&[7u8; 32]).unwrap();
        let nonce = Nonce::from_bytes([9u8; 16]);
        for kind in [CipherKind::Aes256, CipherKind::Permutation] {
            let mut ctx = kind.provider().create_context(&key).unwrap();
            let mut buffer = vec![0u8; 32];
            buffer[..5].copy_from_slice(b"hello");
            let ct_len = ctx.encrypt_in_place(&mut buffer, 5, &nonce).unwrap();
            assert_eq!(ct_len, 16, "{kind}");
            let pt_len = ctx.decrypt_in_place(&mut buffer, ct_len, &nonce).unwrap();
            assert_eq!(&buffer[..pt_len], b"hello", "{kind}");
        }
    }
}
