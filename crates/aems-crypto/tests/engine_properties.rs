//! Engine and text-token properties, against the real providers and a
//! recording mock provider.

use std::sync::{Arc, Mutex};

use aems_crypto::{
    decrypt_text, encrypt_text, padded_len, BlockCipherProvider, CipherContext, CipherEngine,
    CipherKind, CryptoError, Encoding, Key, Nonce, KEY_LEN, NONCE_LEN,
};
use proptest::prelude::*;

/// What the mock saw on each encrypt call: (buffer length, reported length)
type Calls = Arc<Mutex<Vec<(usize, usize)>>>;

/// XOR keystream over the plaintext only; reports the unpadded length.
struct RecordingProvider {
    calls: Calls,
}

struct RecordingContext {
    key: [u8; KEY_LEN],
    calls: Calls,
}

impl RecordingContext {
    fn apply(&self, data: &mut [u8], nonce: &Nonce) {
        for (i, b) in data.iter_mut().enumerate() {
            *b ^= self.key[i % KEY_LEN] ^ nonce.as_bytes()[i % NONCE_LEN] ^ (i as u8);
        }
    }
}

impl BlockCipherProvider for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn create_context(&self, key: &Key) -> aems_crypto::Result<Box<dyn CipherContext>> {
        Ok(Box::new(RecordingContext {
            key: *key.as_bytes(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

impl CipherContext for RecordingContext {
    fn encrypt_in_place(
        &mut self,
        buffer: &mut [u8],
        plaintext_len: usize,
        nonce: &Nonce,
    ) -> aems_crypto::Result<usize> {
        self.apply(&mut buffer[..plaintext_len], nonce);
        self.calls.lock().unwrap().push((buffer.len(), plaintext_len));
        Ok(plaintext_len)
    }

    fn decrypt_in_place(
        &mut self,
        buffer: &mut [u8],
        ciphertext_len: usize,
        nonce: &Nonce,
    ) -> aems_crypto::Result<usize> {
        self.apply(&mut buffer[..ciphertext_len], nonce);
        Ok(ciphertext_len)
    }
}

fn recording_engine(key: &Key) -> (CipherEngine, Calls) {
    let calls: Calls = Arc::default();
    let provider = RecordingProvider {
        calls: Arc::clone(&calls),
    };
    (CipherEngine::open(&provider, key).unwrap(), calls)
}

fn key_strategy() -> impl Strategy<Value = [u8; KEY_LEN]> {
    prop::array::uniform32(any::<u8>())
}

fn nonce_strategy() -> impl Strategy<Value = [u8; NONCE_LEN]> {
    prop::array::uniform16(any::<u8>())
}

fn cipher_strategy() -> impl Strategy<Value = CipherKind> {
    prop_oneof![Just(CipherKind::Aes256), Just(CipherKind::Permutation)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_encrypt_decrypt_roundtrip(
        key in key_strategy(),
        nonce in nonce_strategy(),
        plaintext in prop::collection::vec(any::<u8>(), 0..600),
        kind in cipher_strategy(),
    ) {
        let key = Key::from_slice(&key).unwrap();
        let mut engine = CipherEngine::open(kind.provider(), &key).unwrap();

        let ciphertext = engine.encrypt(&plaintext, &nonce).unwrap();
        prop_assert_eq!(ciphertext.len(), padded_len(plaintext.len()));

        let decrypted = engine.decrypt(&ciphertext, &nonce).unwrap();
        prop_assert_eq!(decrypted.as_slice(), plaintext.as_slice());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_different_keys_do_not_decrypt(
        key1 in key_strategy(),
        key2 in key_strategy(),
        nonce in nonce_strategy(),
        plaintext in prop::collection::vec(any::<u8>(), 1..200),
        kind in cipher_strategy(),
    ) {
        prop_assume!(key1 != key2);
        let mut engine1 = CipherEngine::open_raw(kind.provider(), &key1).unwrap();
        let mut engine2 = CipherEngine::open_raw(kind.provider(), &key2).unwrap();

        let ciphertext = engine1.encrypt(&plaintext, &nonce).unwrap();
        let decrypted = engine2.decrypt(&ciphertext, &nonce).unwrap();
        prop_assert_ne!(decrypted.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn prop_text_token_roundtrip(text in "\\PC{0,300}") {
        let key = Key::generate().unwrap();
        let mut engine = CipherEngine::open(CipherKind::Aes256.provider(), &key).unwrap();
        let token = encrypt_text(&mut engine, &text, Encoding::Base64).unwrap();
        prop_assert!(!token.contains('=') && !token.contains('\n'));
        prop_assert_eq!(decrypt_text(&mut engine, &token, Encoding::Base64).unwrap(), text);
    }
}

#[test]
fn test_text_roundtrip_edge_lengths() {
    let key = Key::generate().unwrap();
    let mut engine = CipherEngine::open(CipherKind::Aes256.provider(), &key).unwrap();

    let long: String = "héllo wörld ✨ 日本語 🦀 ".repeat(60);
    assert!(long.chars().count() > 1000);

    for text in ["", "x", "é", long.as_str()] {
        for encoding in [Encoding::Base64, Encoding::Hex] {
            let token = encrypt_text(&mut engine, text, encoding).unwrap();
            assert_eq!(decrypt_text(&mut engine, &token, encoding).unwrap(), text);
        }
    }
}

#[test]
fn test_short_token_is_format_error() {
    let key = Key::generate().unwrap();
    let mut engine = CipherEngine::open(CipherKind::Aes256.provider(), &key).unwrap();
    for len in [1usize, 8, 15] {
        let token = Encoding::Base64.encode(&vec![0xAA; len]);
        assert!(matches!(
            decrypt_text(&mut engine, &token, Encoding::Base64),
            Err(CryptoError::Format(_))
        ));
    }
    assert!(matches!(
        decrypt_text(&mut engine, "%%% not base64 %%%", Encoding::Base64),
        Err(CryptoError::Format(_))
    ));
}

#[test]
fn test_load_key_from_hex() {
    assert!(matches!(
        Key::from_hex(&"0".repeat(30)),
        Err(CryptoError::Format(_))
    ));
    assert!(matches!(
        Key::from_hex(&format!("{}xyz!", "0".repeat(60))),
        Err(CryptoError::Format(_))
    ));

    let key = Key::from_hex(&"0f".repeat(32)).unwrap();
    let engine = CipherEngine::open(CipherKind::Aes256.provider(), &key).unwrap();
    assert!(engine.is_open());
}

#[test]
fn test_block_aligned_plaintext_gets_an_extra_block() {
    let key = Key::from_slice(&[0u8; KEY_LEN]).unwrap();
    let (mut engine, calls) = recording_engine(&key);

    engine.encrypt(&[0x42; 16], &[0u8; NONCE_LEN]).unwrap();
    engine.encrypt(&[0x42; 17], &[0u8; NONCE_LEN]).unwrap();
    engine.encrypt(&[], &[0u8; NONCE_LEN]).unwrap();

    let seen: Vec<usize> = calls.lock().unwrap().iter().map(|(buf, _)| *buf).collect();
    assert_eq!(seen, vec![32, 32, 16]);
}

#[test]
fn test_aems_scenario_uses_reported_length() {
    let key = Key::from_slice(&[0u8; KEY_LEN]).unwrap();
    let nonce = [0x11u8; NONCE_LEN];

    // Mock provider reports the unpadded length: the engine must not return the
    // whole 16-byte buffer.
    let (mut engine, calls) = recording_engine(&key);
    let ciphertext = engine.encrypt(b"AEMS", &nonce).unwrap();
    let (buffer_len, final_len) = calls.lock().unwrap()[0];
    assert_eq!(buffer_len, 16);
    assert_eq!(final_len, 4);
    assert_eq!(ciphertext.len(), final_len);
    assert_eq!(engine.decrypt(&ciphertext, &nonce).unwrap().as_slice(), b"AEMS");

    // Real providers report the padded length
    for kind in [CipherKind::Aes256, CipherKind::Permutation] {
        let mut engine = CipherEngine::open(kind.provider(), &key).unwrap();
        let ciphertext = engine.encrypt(b"AEMS", &nonce).unwrap();
        assert_eq!(ciphertext.len(), 16);
        assert_eq!(engine.decrypt(&ciphertext, &nonce).unwrap().as_slice(), b"AEMS");
    }
}

#[test]
fn test_replacing_key_closes_previous_engine() {
    let first = Key::generate().unwrap();
    let second = Key::generate().unwrap();

    let mut engine = CipherEngine::open(CipherKind::Aes256.provider(), &first).unwrap();
    let token = encrypt_text(&mut engine, "rotated", Encoding::Base64).unwrap();

    engine.close();
    assert!(matches!(
        decrypt_text(&mut engine, &token, Encoding::Base64),
        Err(CryptoError::NotReady)
    ));

    let mut engine = CipherEngine::open(CipherKind::Aes256.provider(), &second).unwrap();
    assert_ne!(
        decrypt_text(&mut engine, &token, Encoding::Base64).ok().as_deref(),
        Some("rotated")
    );
}
