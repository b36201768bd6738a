//! Envelope format: `nonce(16) || ciphertext`
//!
//! The nonce travels in front of the ciphertext so a token or record can be
//! decrypted with nothing but the key.

use crate::armor::Encoding;
use crate::cipher::CipherEngine;
use crate::keys::{Nonce, NONCE_LEN};
use crate::{CryptoError, Result};

/// A nonce and the ciphertext produced under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub nonce: Nonce,
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encrypt `plaintext` under a freshly generated nonce
    pub fn seal(engine: &mut CipherEngine, plaintext: &[u8]) -> Result<Self> {
        let nonce = Nonce::generate()?;
        let ciphertext = engine.encrypt(plaintext, nonce.as_bytes())?;
        Ok(Self { nonce, ciphertext })
    }

    pub fn open(&self, engine: &mut CipherEngine) -> Result<zeroize::Zeroizing<Vec<u8>>> {
        engine.decrypt(&self.ciphertext, self.nonce.as_bytes())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split raw bytes into nonce and ciphertext
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Format`] when `data` is too short to hold a nonce.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < NONCE_LEN {
            return Err(CryptoError::Format(format!(
                "envelope of {} bytes is shorter than the {NONCE_LEN}-byte nonce",
                data.len()
            )));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        Ok(Self {
            nonce: Nonce::from_slice(nonce)?,
            ciphertext: ciphertext.to_vec(),
        })
    }

    pub fn armor(&self, encoding: Encoding) -> String {
        encoding.encode(&self.to_bytes())
    }

    pub fn unarmor(text: &str, encoding: Encoding) -> Result<Self> {
        Self::from_bytes(&encoding.decode(text)?)
    }

    /// Decrypt and interpret the plaintext as UTF-8
    pub fn open_text(&self, engine: &mut CipherEngine) -> Result<String> {
        let plaintext = self.open(engine)?;
        Ok(String::from_utf8(plaintext.to_vec())?)
    }
}

/// Encrypt a message into a single text token
///
/// An empty message maps to an empty token.
pub fn encrypt_text(engine: &mut CipherEngine, text: &str, encoding: Encoding) -> Result<String> {
    if text.is_empty() {
        return Ok(String::new());
    }
    Ok(Envelope::seal(engine, text.as_bytes())?.armor(encoding))
}

/// Decrypt a text token produced by [`encrypt_text`]
///
/// An empty token maps to an empty message.
pub fn decrypt_text(engine: &mut CipherEngine, token: &str, encoding: Encoding) -> Result<String> {
    if token.trim().is_empty() {
        return Ok(String::new());
    }
    Envelope::unarmor(token, encoding)?.open_text(engine)
}
