//! CBC chaining with a length marker
//!
//! Encryption pads with ISO 7816-4 (`0x80` right after the plaintext, then
//! zeros up to the block boundary) and chains every block starting from the
//! nonce. The reported length is the full padded length.
//!
//! Decryption reverses the chain without unpadding and reports the position of
//! the last `0x80` byte, or the whole length when the marker is missing (wrong
//! key, corrupted data). Nothing here authenticates the ciphertext.

use block_padding::{Iso7816, NoPadding};
use cbc::cipher::consts::U16;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{
    BlockCipher, BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, InnerIvInit,
};

use super::{CipherContext, BLOCK_LEN};
use crate::cipher::padded_len;
use crate::keys::Nonce;
use crate::{CryptoError, Result};

const PAD_MARKER: u8 = 0x80;

/// A 16-byte block cipher usable by [`CbcContext`]
pub(crate) trait CbcBlock:
    BlockCipher<BlockSize = U16> + BlockEncrypt + BlockDecrypt + Clone + Send
{
}

impl<C> CbcBlock for C where
    C: BlockCipher<BlockSize = U16> + BlockEncrypt + BlockDecrypt + Clone + Send
{
}

pub(crate) struct CbcContext<C> {
    cipher: C,
}

impl<C: CbcBlock> CbcContext<C> {
    pub(crate) fn new(cipher: C) -> Self {
        Self { cipher }
    }
}

impl<C: CbcBlock + 'static> CipherContext for CbcContext<C> {
    fn encrypt_in_place(
        &mut self,
        buffer: &mut [u8],
        plaintext_len: usize,
        nonce: &Nonce,
    ) -> Result<usize> {
        let padded = padded_len(plaintext_len);
        if buffer.len() < padded {
            return Err(CryptoError::Format(format!(
                "buffer of {} bytes cannot hold {padded} padded bytes",
                buffer.len()
            )));
        }

        let iv = GenericArray::from_slice(nonce.as_bytes());
        let ciphertext = cbc::Encryptor::inner_iv_init(self.cipher.clone(), iv)
            .encrypt_padded_mut::<Iso7816>(&mut buffer[..padded], plaintext_len)
            .map_err(|_| CryptoError::Format("padding does not fit the buffer".into()))?;
        Ok(ciphertext.len())
    }

    fn decrypt_in_place(
        &mut self,
        buffer: &mut [u8],
        ciphertext_len: usize,
        nonce: &Nonce,
    ) -> Result<usize> {
        if ciphertext_len % BLOCK_LEN != 0 || ciphertext_len > buffer.len() {
            return Err(CryptoError::Format(format!(
                "ciphertext length {ciphertext_len} is not a whole number of {BLOCK_LEN}-byte blocks"
            )));
        }

        let iv = GenericArray::from_slice(nonce.as_bytes());
        let plaintext = cbc::Decryptor::inner_iv_init(self.cipher.clone(), iv)
            .decrypt_padded_mut::<NoPadding>(&mut buffer[..ciphertext_len])
            .map_err(|_| CryptoError::Format("ciphertext is not block aligned".into()))?;

        Ok(plaintext
            .iter()
            .rposition(|&b| b == PAD_MARKER)
            .unwrap_or(ciphertext_len))
    }
}
