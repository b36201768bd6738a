//! Text armor for envelopes
//!
//! | format     | text token | file record |
//! |------------|------------|-------------|
//! | `standard` | base64     | base85      |
//! | `hex`      | hex        | hex         |
//!
//! Base64 tokens are written without `=` padding or line breaks; padded input is
//! still accepted when decoding.

use std::fmt;
use std::str::FromStr;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::base85;
use crate::{CryptoError, Result};

const TOKEN_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Byte-to-text encoding applied to an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Base64,
    Base85,
    Hex,
}

impl Encoding {
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            Encoding::Base64 => TOKEN_BASE64.encode(data),
            Encoding::Base85 => base85::encode(data),
            Encoding::Hex => hex::encode(data),
        }
    }

    pub fn decode(self, text: &str) -> Result<Vec<u8>> {
        let text = text.trim();
        match self {
            Encoding::Base64 => TOKEN_BASE64
                .decode(text)
                .map_err(|e| CryptoError::Format(format!("invalid base64: {e}"))),
            Encoding::Base85 => base85::decode(text)
                .map_err(|e| CryptoError::Format(format!("invalid base85: {e}"))),
            Encoding::Hex => {
                hex::decode(text).map_err(|e| CryptoError::Format(format!("invalid hex: {e}")))
            }
        }
    }
}

/// Envelope format variant, chosen by configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeFormat {
    #[default]
    Standard,
    Hex,
}

impl EnvelopeFormat {
    pub fn text_encoding(self) -> Encoding {
        match self {
            EnvelopeFormat::Standard => Encoding::Base64,
            EnvelopeFormat::Hex => Encoding::Hex,
        }
    }

    pub fn record_encoding(self) -> Encoding {
        match self {
            EnvelopeFormat::Standard => Encoding::Base85,
            EnvelopeFormat::Hex => Encoding::Hex,
        }
    }
}

impl fmt::Display for EnvelopeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeFormat::Standard => f.write_str("standard"),
            EnvelopeFormat::Hex => f.write_str("hex"),
        }
    }
}

impl FromStr for EnvelopeFormat {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(EnvelopeFormat::Standard),
            "hex" => Ok(EnvelopeFormat::Hex),
            other => Err(CryptoError::Format(format!(
                "unknown envelope format: {other}"
            ))),
        }
    }
}
