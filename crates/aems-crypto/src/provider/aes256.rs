//! AES-256 provider

use aes::cipher::KeyInit;
use aes::Aes256;

use super::cbc::CbcContext;
use super::{BlockCipherProvider, CipherContext};
use crate::keys::Key;
use crate::{CryptoError, Result};

/// AES-256 in CBC mode. The key schedule is zeroized when the context drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256Provider;

impl BlockCipherProvider for Aes256Provider {
    fn name(&self) -> &'static str {
        "aes-256"
    }

    fn create_context(&self, key: &Key) -> Result<Box<dyn CipherContext>> {
        let cipher = Aes256::new_from_slice(key.as_bytes())
            .map_err(|_| CryptoError::KeyLength(key.as_bytes().len()))?;
        Ok(Box::new(CbcContext::new(cipher)))
    }
}
