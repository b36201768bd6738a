//! Cipher engine
//!
//! One engine owns one live provider context. The context is released exactly
//! once: on [`CipherEngine::close`], or on drop if it was never closed.
//!
//! Padding policy: the plaintext is copied into a buffer of
//! `(len / 16 + 1) * 16` bytes, so there is always at least one reserved block
//! even for block-aligned input. The provider owns the reserved bytes and
//! reports how many output bytes are meaningful.

use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use crate::keys::{Key, Nonce};
use crate::provider::{BlockCipherProvider, CipherContext, BLOCK_LEN};
use crate::{CryptoError, Result};

/// Size of the working buffer for a plaintext of `len` bytes
pub const fn padded_len(len: usize) -> usize {
    (len / BLOCK_LEN + 1) * BLOCK_LEN
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Open,
    Closed,
}

/// A key bound to a live provider context
pub struct CipherEngine {
    provider: &'static str,
    context: Option<Box<dyn CipherContext>>,
}

impl CipherEngine {
    /// Open an engine for `key` using `provider`
    pub fn open(provider: &dyn BlockCipherProvider, key: &Key) -> Result<Self> {
        let context = provider.create_context(key)?;
        debug!(provider = provider.name(), "cipher engine opened");
        Ok(Self {
            provider: provider.name(),
            context: Some(context),
        })
    }

    /// Open an engine from raw key bytes, rejecting any length other than 32
    pub fn open_raw(provider: &dyn BlockCipherProvider, key: &[u8]) -> Result<Self> {
        let key = Key::from_slice(key)?;
        Self::open(provider, &key)
    }

    /// Release the provider context. Closing an already closed engine does nothing.
    pub fn close(&mut self) {
        if let Some(context) = self.context.take() {
            drop(context);
            debug!(provider = self.provider, "cipher engine closed");
        }
    }

    pub fn state(&self) -> EngineState {
        if self.context.is_some() {
            EngineState::Open
        } else {
            EngineState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == EngineState::Open
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider
    }

    /// Encrypt `plaintext` under `nonce`
    ///
    /// Returns exactly the bytes the provider reports as meaningful.
    pub fn encrypt(&mut self, plaintext: &[u8], nonce: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(nonce)?;
        let context = self.context.as_mut().ok_or(CryptoError::NotReady)?;

        let mut buffer = vec![0u8; padded_len(plaintext.len())];
        buffer[..plaintext.len()].copy_from_slice(plaintext);

        let final_len = match context.encrypt_in_place(&mut buffer, plaintext.len(), &nonce) {
            Ok(len) => len,
            Err(e) => {
                buffer.zeroize();
                return Err(e);
            }
        };
        buffer.truncate(final_len.min(buffer.len()));
        Ok(buffer)
    }

    /// Decrypt `ciphertext` under `nonce`
    ///
    /// There is no integrity check: a wrong key or corrupted input yields garbage.
    pub fn decrypt(&mut self, ciphertext: &[u8], nonce: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let nonce = Nonce::from_slice(nonce)?;
        let context = self.context.as_mut().ok_or(CryptoError::NotReady)?;

        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        let final_len = context.decrypt_in_place(&mut buffer, ciphertext.len(), &nonce)?;
        buffer.truncate(final_len.min(ciphertext.len()));
        Ok(buffer)
    }
}

impl Drop for CipherEngine {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEngine")
            .field("provider", &self.provider)
            .field("state", &self.state())
            .finish()
    }
}
