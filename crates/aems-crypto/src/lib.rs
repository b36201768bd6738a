//! AEMS Crypto - cipher engine and envelope codec
//!
//! This crate provides:
//! - 256-bit key material and 128-bit nonces
//! - Swappable block cipher providers (AES-256, keyed permutation)
//! - A cipher engine owning one live provider context per key
//! - Text tokens and line-oriented record streams built on the engine
//!
//! There is no authentication tag anywhere in the wire formats. Decrypting with
//! the wrong key or a corrupted payload produces garbage bytes, not an error.

pub mod armor;
mod base85;
pub mod cipher;
pub mod envelope;
pub mod keys;
pub mod provider;
pub mod stream;

pub use armor::{Encoding, EnvelopeFormat};
pub use cipher::{padded_len, CipherEngine, EngineState};
pub use envelope::{decrypt_text, encrypt_text, Envelope};
pub use keys::{Key, Nonce, KEY_LEN, NONCE_LEN};
pub use provider::{BlockCipherProvider, CipherContext, CipherKind, BLOCK_LEN};
pub use stream::{
    decrypt_file, decrypted_path, encrypt_file, encrypted_path, FileReport, RecordDecoder,
    RecordEncoder,
};

/// Errors that can occur in cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    KeyLength(usize),

    #[error("invalid nonce length: expected {NONCE_LEN} bytes, got {0}")]
    NonceLength(usize),

    #[error("malformed input: {0}")]
    Format(String),

    #[error("decrypted data is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("cipher engine is not open")]
    NotReady,

    #[error("secure random generator failed")]
    Random,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
