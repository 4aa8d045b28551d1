//! Message Security Tests
//!
//! End-to-end checks of what the message pipeline stores and transmits:
//! envelopes as strings, edited in transit, opened by the right and the
//! wrong people.

use parley_crypto::{
    CryptoConfig, CryptoError, EnvelopeCodec, ExchangeKeyPair, IdentityKeyPair, KeyStrength,
    MessageProtector, OpenWith, SealFor,
};
use serde_json::Value;
use std::sync::OnceLock;

fn recipient() -> &'static IdentityKeyPair {
    static KEY: OnceLock<IdentityKeyPair> = OnceLock::new();
    KEY.get_or_init(|| IdentityKeyPair::generate(KeyStrength::Rsa2048).unwrap())
}

fn other_user() -> &'static IdentityKeyPair {
    static KEY: OnceLock<IdentityKeyPair> = OnceLock::new();
    KEY.get_or_init(|| IdentityKeyPair::generate(KeyStrength::Rsa2048).unwrap())
}

fn protector() -> MessageProtector {
    MessageProtector::new(CryptoConfig::default().with_shared_secret()).unwrap()
}

/// The documented send/transmit/receive scenario
mod direct_message_scenario {
    use super::*;

    #[test]
    fn test_quarterly_numbers_survive_transport() {
        let p = protector();
        let wire = p
            .seal_to_wire(
                "Quarterly numbers are due Friday",
                SealFor::Identity(recipient().public_key()),
            )
            .unwrap();

        // simulated transport: the envelope travels inside another JSON document
        let message = serde_json::json!({ "channel": "finance", "content": wire }).to_string();
        let received: Value = serde_json::from_str(&message).unwrap();
        let wire = received["content"].as_str().unwrap();

        let plaintext = p.open_wire(wire, OpenWith::Identity(recipient().private_key())).unwrap();
        assert_eq!(plaintext, "Quarterly numbers are due Friday");
    }

    #[test]
    fn test_plaintext_never_appears_on_the_wire() {
        let wire = protector()
            .seal_to_wire(
                "Quarterly numbers are due Friday",
                SealFor::Identity(recipient().public_key()),
            )
            .unwrap();
        assert!(!wire.contains("Quarterly"));
        assert!(!wire.contains(&hex::encode("Quarterly")));
    }

    #[test]
    fn test_same_message_twice_gives_different_envelopes() {
        let p = protector();
        let target = SealFor::Identity(recipient().public_key());
        let w1: Value = serde_json::from_str(&p.seal_to_wire("same", target).unwrap()).unwrap();
        let w2: Value = serde_json::from_str(&p.seal_to_wire("same", target).unwrap()).unwrap();

        for field in ["iv", "encryptedData", "authTag", "encryptedSessionKey"] {
            assert_ne!(w1[field], w2[field], "{field} repeated");
        }
        assert_eq!(w1["recipientKeyId"], w2["recipientKeyId"]);
    }
}

/// Envelopes edited between sender and recipient
mod transit_tampering {
    use super::*;

    fn sealed_wire() -> Value {
        let wire = protector()
            .seal_to_wire("wire me $500", SealFor::Identity(recipient().public_key()))
            .unwrap();
        serde_json::from_str(&wire).unwrap()
    }

    fn open(wire: &Value) -> Result<String, CryptoError> {
        protector().open_wire(&wire.to_string(), OpenWith::Identity(recipient().private_key()))
    }

    fn flip_hex_field(wire: &mut Value, field: &str) {
        let mut bytes = hex::decode(wire[field].as_str().unwrap()).unwrap();
        bytes[0] ^= 0x01;
        wire[field] = Value::String(hex::encode(bytes));
    }

    #[test]
    fn test_edited_ciphertext_is_rejected() {
        let mut wire = sealed_wire();
        flip_hex_field(&mut wire, "encryptedData");
        assert!(matches!(open(&wire), Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_edited_iv_is_rejected() {
        let mut wire = sealed_wire();
        flip_hex_field(&mut wire, "iv");
        assert!(matches!(open(&wire), Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_edited_tag_is_rejected() {
        let mut wire = sealed_wire();
        flip_hex_field(&mut wire, "authTag");
        assert!(matches!(open(&wire), Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_edited_wrapped_key_is_key_unwrap() {
        use base64::Engine;
        let engine = base64::engine::general_purpose::STANDARD;

        let mut wire = sealed_wire();
        let mut wrapped = engine.decode(wire["encryptedSessionKey"].as_str().unwrap()).unwrap();
        wrapped[20] ^= 0x01;
        wire["encryptedSessionKey"] = Value::String(engine.encode(wrapped));

        assert!(matches!(open(&wire), Err(CryptoError::KeyUnwrap(_))));
    }

    #[test]
    fn test_re_encoded_field_is_malformed() {
        let mut wire = sealed_wire();
        let iv = wire["iv"].as_str().unwrap().to_string();
        wire["iv"] = Value::String(iv[..iv.len() - 2].to_string());
        assert!(matches!(open(&wire), Err(CryptoError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_scheme_cannot_be_swapped() {
        let mut wire = sealed_wire();
        wire["scheme"] = Value::String("shared_secret".to_string());
        assert!(matches!(open(&wire), Err(CryptoError::MalformedEnvelope(_))));
    }
}

/// Who can read what
mod recipient_isolation {
    use super::*;

    #[test]
    fn test_other_user_gets_key_unwrap() {
        let p = protector();
        let envelope = p
            .seal("for the recipient", SealFor::Identity(recipient().public_key()))
            .unwrap();
        let err = p.open(&envelope, OpenWith::Identity(other_user().private_key())).unwrap_err();
        assert!(err.is_key_unwrap_failure());
    }

    #[test]
    fn test_regenerated_identity_cannot_read_old_messages() {
        let p = protector();
        let old = IdentityKeyPair::generate(KeyStrength::Rsa2048).unwrap();
        let envelope = p.seal("before rotation", SealFor::Identity(old.public_key())).unwrap();

        let new = IdentityKeyPair::generate(KeyStrength::Rsa2048).unwrap();
        assert!(p.open(&envelope, OpenWith::Identity(new.private_key())).is_err());
        let opened = p.open(&envelope, OpenWith::Identity(old.private_key()));
        assert_eq!(opened.unwrap(), "before rotation");
    }

    #[test]
    fn test_pem_restored_key_reads_messages() {
        let p = protector();
        let envelope = p.seal("persisted", SealFor::Identity(recipient().public_key())).unwrap();

        let pem = recipient().private_key().to_pem().unwrap();
        let restored = IdentityKeyPair::from_private_pem(&pem).unwrap();
        let opened = p.open(&envelope, OpenWith::Identity(restored.private_key()));
        assert_eq!(opened.unwrap(), "persisted");
    }

    #[test]
    fn test_shared_secret_conversation_isolated() {
        let p = protector();
        let alice = ExchangeKeyPair::generate().unwrap();
        let bob = ExchangeKeyPair::generate().unwrap();
        let eve = ExchangeKeyPair::generate().unwrap();

        let target = SealFor::Exchange {
            local: &alice,
            peer: bob.public_key(),
        };
        let wire = p.seal_to_wire("legacy path", target).unwrap();

        assert_eq!(p.open_wire(&wire, OpenWith::Exchange(&bob)).unwrap(), "legacy path");
        assert!(matches!(
            p.open_wire(&wire, OpenWith::Exchange(&eve)),
            Err(CryptoError::KeyUnwrap(_))
        ));
        assert!(matches!(
            p.open_wire(&wire, OpenWith::Identity(recipient().private_key())),
            Err(CryptoError::SchemeMismatch { .. })
        ));
    }

    #[test]
    fn test_envelopes_parse_without_keys() {
        let wire = protector()
            .seal_to_wire("metadata only", SealFor::Identity(recipient().public_key()))
            .unwrap();
        let envelope = EnvelopeCodec::parse(&wire).unwrap();
        assert_eq!(envelope.algorithm_id(), "rsa-oaep-sha256+aes-256-gcm");
    }
}
