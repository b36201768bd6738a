//! Base85 with the RFC 1924 alphabet
//!
//! Byte-compatible with Python's `base64.b85encode`/`b85decode`: 4-byte big-endian
//! groups become 5 characters, and a short final group of `n` bytes becomes
//! `n + 1` characters. A lone trailing character decodes to nothing.

const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

const INVALID: u8 = 0xFF;

const fn decode_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static DECODE: [u8; 256] = decode_table();

pub(crate) fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(4) * 5);
    for chunk in data.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(group);

        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        for &d in &digits[..chunk.len() + 1] {
            out.push(d as char);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecodeError {
    InvalidCharacter { position: usize, character: char },
    Overflow { position: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidCharacter {
                position,
                character,
            } => write!(f, "invalid base85 character {character:?} at {position}"),
            DecodeError::Overflow { position } => {
                write!(f, "base85 group starting at {position} overflows 32 bits")
            }
        }
    }
}

pub(crate) fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 5 * 4 + 4);
    for (index, chunk) in bytes.chunks(5).enumerate() {
        let position = index * 5;
        let mut value: u64 = 0;
        for i in 0..5 {
            // Short final groups are padded with the highest digit
            let digit = match chunk.get(i) {
                Some(&c) => {
                    let d = DECODE[c as usize];
                    if d == INVALID {
                        return Err(DecodeError::InvalidCharacter {
                            position: position + i,
                            character: char::from(c),
                        });
                    }
                    d
                }
                None => 84,
            };
            value = value * 85 + u64::from(digit);
        }
        let value = u32::try_from(value).map_err(|_| DecodeError::Overflow { position })?;
        let group = value.to_be_bytes();
        out.extend_from_slice(&group[..chunk.len() - 1]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_python_b85encode() {
        // base64.b85encode(b"hello") == b"Xk~0{Zv"
        assert_eq!(encode(b"hello"), "Xk~0{Zv");
        // base64.b85encode(b"\x00\x00\x00\x00") == b"00000"
        assert_eq!(encode(&[0, 0, 0, 0]), "00000");
        // base64.b85encode(b"\xff\xff\xff\xff") == b"|NsC0"
        assert_eq!(encode(&[0xFF; 4]), "|NsC0");
        assert_eq!(encode(b""), "");
    }

    #[test]
    fn test_decode_partial_groups() {
        assert_eq!(decode("Xk~0{Zv").unwrap(), b"hello");
        for len in 0..12 {
            let data: Vec<u8> = (0..len).map(|i| (i * 37 + 11) as u8).collect();
            assert_eq!(decode(&encode(&data)).unwrap(), data, "len {len}");
        }
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(
            decode("abc\"e"),
            Err(DecodeError::InvalidCharacter { position: 3, .. })
        ));
        assert!(matches!(decode("~~~~~"), Err(DecodeError::Overflow { .. })));
    }

    #[test]
    fn test_dangling_character_decodes_to_nothing() {
        // Same as Python: a lone final digit carries no bytes
        assert_eq!(decode("000000").unwrap(), vec![0u8; 4]);
    }
}
