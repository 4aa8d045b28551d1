//! Property tests for hybrid envelopes and the wire codec

use parley_crypto::{
    AuthTag, CryptoError, EnvelopeCodec, HybridDecryptor, HybridEncryptor, HybridEnvelope,
    IdentityKeyPair, Iv, KeyStrength, MessageEnvelope, SymmetricCipher,
};
use proptest::prelude::*;
use rstest::rstest;
use std::sync::OnceLock;

fn recipient() -> &'static IdentityKeyPair {
    static KEY: OnceLock<IdentityKeyPair> = OnceLock::new();
    KEY.get_or_init(|| IdentityKeyPair::generate(KeyStrength::Rsa2048).unwrap())
}

fn stranger() -> &'static IdentityKeyPair {
    static KEY: OnceLock<IdentityKeyPair> = OnceLock::new();
    KEY.get_or_init(|| IdentityKeyPair::generate(KeyStrength::Rsa2048).unwrap())
}

fn seal(plaintext: &str) -> HybridEnvelope {
    HybridEncryptor::new(recipient().public_key())
        .encrypt(plaintext)
        .unwrap()
}

fn open(envelope: &HybridEnvelope) -> parley_crypto::Result<String> {
    HybridDecryptor::new(recipient().private_key()).decrypt(envelope)
}

#[derive(Clone, Copy, Debug)]
enum Field {
    Iv,
    Ciphertext,
    AuthTag,
}

fn flip_bit(envelope: &mut HybridEnvelope, field: Field, bit: usize) {
    match field {
        Field::Iv => {
            let mut bytes = *envelope.iv.as_bytes();
            let idx = bit % (bytes.len() * 8);
            bytes[idx / 8] ^= 1 << (idx % 8);
            envelope.iv = Iv::from_bytes(&bytes).unwrap();
        }
        Field::Ciphertext => {
            let idx = bit % (envelope.ciphertext.len() * 8);
            envelope.ciphertext[idx / 8] ^= 1 << (idx % 8);
        }
        Field::AuthTag => {
            let mut bytes = *envelope.auth_tag.as_bytes();
            let idx = bit % (bytes.len() * 8);
            bytes[idx / 8] ^= 1 << (idx % 8);
            envelope.auth_tag = AuthTag::from_bytes(&bytes).unwrap();
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_roundtrip_any_text(plaintext in ".{0,2048}") {
        let envelope = seal(&plaintext);
        prop_assert_eq!(open(&envelope).unwrap(), plaintext);
    }

    #[test]
    fn prop_wire_roundtrip(plaintext in ".{0,512}") {
        let envelope = seal(&plaintext);
        let wire = EnvelopeCodec::serialize_hybrid(&envelope).unwrap();
        let parsed = EnvelopeCodec::parse_hybrid(&wire).unwrap();
        prop_assert_eq!(&parsed, &envelope);
        prop_assert_eq!(open(&parsed).unwrap(), plaintext);
    }

    #[test]
    fn prop_single_bit_flip_is_detected(
        plaintext in ".{1,256}",
        field in prop_oneof![Just(Field::Iv), Just(Field::Ciphertext), Just(Field::AuthTag)],
        bit in any::<usize>(),
    ) {
        let mut envelope = seal(&plaintext);
        flip_bit(&mut envelope, field, bit);
        prop_assert!(matches!(open(&envelope), Err(CryptoError::Authentication)));
    }
}

#[rstest]
#[case::empty("")]
#[case::short("hi")]
#[case::unicode("Grüße, 世界 👋")]
#[case::multi_kilobyte(&"Quarterly numbers are due Friday. ".repeat(300))]
fn roundtrip_cases(#[case] plaintext: &str) {
    assert_eq!(open(&seal(plaintext)).unwrap(), plaintext);
}

#[rstest]
#[case::with_key_id(false)]
#[case::without_key_id(true)]
fn wrong_recipient_is_key_unwrap(#[case] strip_key_id: bool) {
    let mut encryptor = HybridEncryptor::new(recipient().public_key());
    if strip_key_id {
        encryptor = encryptor.without_key_id();
    }
    let envelope = encryptor.encrypt("for the recipient only").unwrap();

    let result = HybridDecryptor::new(stranger().private_key()).decrypt(&envelope);
    let err = result.unwrap_err();
    assert!(err.is_key_unwrap_failure(), "got {err:?}");
}

#[test_log::test]
fn tampering_is_authentication_not_unwrap() {
    let mut envelope = seal("do not alter");
    flip_bit(&mut envelope, Field::Ciphertext, 3);
    let err = open(&envelope).unwrap_err();
    assert!(err.is_authentication_failure());
    assert!(!err.is_key_unwrap_failure());
}

#[test]
fn session_keys_do_not_repeat() {
    let mut seen = std::collections::HashSet::new();
    for _ in 0..10_000 {
        let key = SymmetricCipher::generate_key().unwrap();
        assert!(seen.insert(*key.as_bytes()));
    }
}

#[test]
fn envelope_fields_all_differ_between_encryptions() {
    let e1 = seal("Quarterly numbers are due Friday");
    let e2 = seal("Quarterly numbers are due Friday");
    assert_ne!(e1.iv, e2.iv);
    assert_ne!(e1.ciphertext, e2.ciphertext);
    assert_ne!(e1.wrapped_key, e2.wrapped_key);
    assert_ne!(
        EnvelopeCodec::serialize(&MessageEnvelope::from(e1)).unwrap(),
        EnvelopeCodec::serialize(&MessageEnvelope::from(e2)).unwrap()
    );
}

#[test]
fn concurrent_use_needs_no_coordination() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let text = format!("message {i}");
                let envelope = seal(&text);
                assert_eq!(open(&envelope).unwrap(), text);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
