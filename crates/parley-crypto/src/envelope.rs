//! Envelope types and the JSON wire codec
//!
//! Every binary field is text-encoded on its own so an envelope can be
//! embedded in JSON transports and stored as a string:
//!
//! ```text
//! {
//!   "scheme": "hybrid",
//!   "version": 1,
//!   "algorithm": "rsa-oaep-sha256+aes-256-gcm",
//!   "iv": "<hex, 16 bytes>",
//!   "encryptedData": "<hex>",
//!   "authTag": "<hex, 16 bytes>",
//!   "encryptedSessionKey": "<base64>",
//!   "recipientKeyId": "<hex sha-256, optional>"
//! }
//! ```
//!
//! The `scheme` tag selects the variant explicitly; a parser never guesses
//! the scheme from which fields happen to be present.

use crate::{
    exchange::ExchangePublicKey,
    symmetric::{AuthTag, Iv, SealedPayload},
    CryptoError, Result, ENVELOPE_VERSION,
};
use serde::{Deserialize, Serialize};

/// Algorithm suite of a hybrid envelope
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HybridAlgorithm {
    /// RSA-OAEP (SHA-256, MGF1-SHA-256) key wrap, AES-256-GCM content
    #[default]
    #[serde(rename = "rsa-oaep-sha256+aes-256-gcm")]
    RsaOaepSha256Aes256Gcm,
}

impl HybridAlgorithm {
    /// Get the algorithm identifier string
    pub fn algorithm_id(&self) -> &'static str {
        match self {
            Self::RsaOaepSha256Aes256Gcm => "rsa-oaep-sha256+aes-256-gcm",
        }
    }
}

/// Algorithm suite of a shared-secret envelope
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharedSecretAlgorithm {
    /// X25519 exchange, HKDF-SHA256 derivation, AES-256-GCM content
    #[default]
    #[serde(rename = "x25519-hkdf-sha256+aes-256-gcm")]
    X25519HkdfSha256Aes256Gcm,
}

impl SharedSecretAlgorithm {
    /// Get the algorithm identifier string
    pub fn algorithm_id(&self) -> &'static str {
        match self {
            Self::X25519HkdfSha256Aes256Gcm => "x25519-hkdf-sha256+aes-256-gcm",
        }
    }
}

/// A message encrypted for one recipient with a wrapped session key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridEnvelope {
    /// Version of the envelope format
    pub version: u8,
    /// Cipher suite
    pub algorithm: HybridAlgorithm,
    /// AES-GCM IV
    #[serde(with = "hex_iv")]
    pub iv: Iv,
    /// Encrypted message content
    #[serde(rename = "encryptedData", with = "hex_vec")]
    pub ciphertext: Vec<u8>,
    /// Detached AES-GCM tag
    #[serde(with = "hex_tag")]
    pub auth_tag: AuthTag,
    /// Session key encrypted with the recipient's identity public key
    #[serde(rename = "encryptedSessionKey", with = "base64_vec")]
    pub wrapped_key: Vec<u8>,
    /// Fingerprint of the recipient public key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_key_id: Option<String>,
}

impl HybridEnvelope {
    /// The symmetric part of the envelope
    pub fn sealed_payload(&self) -> SealedPayload {
        SealedPayload {
            iv: self.iv,
            ciphertext: self.ciphertext.clone(),
            auth_tag: self.auth_tag,
        }
    }

    fn validate(&self) -> Result<()> {
        check_version(self.version)?;
        if self.wrapped_key.is_empty() {
            return Err(CryptoError::MalformedEnvelope(
                "encryptedSessionKey is empty".to_string(),
            ));
        }
        if let Some(id) = &self.recipient_key_id {
            if id.len() != 64 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(CryptoError::MalformedEnvelope(
                    "recipientKeyId is not a hex SHA-256 fingerprint".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A message encrypted under a key derived from an X25519 exchange
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSecretEnvelope {
    /// Version of the envelope format
    pub version: u8,
    /// Cipher suite
    pub algorithm: SharedSecretAlgorithm,
    /// Sender's exchange public key, so the recipient can derive the same secret
    #[serde(with = "base64_exchange_key")]
    pub sender_public_key: ExchangePublicKey,
    /// Recipient's exchange public key, so the sender can re-read the message
    #[serde(with = "base64_exchange_key")]
    pub recipient_public_key: ExchangePublicKey,
    /// AES-GCM IV
    #[serde(with = "hex_iv")]
    pub iv: Iv,
    /// Encrypted message content
    #[serde(rename = "encryptedData", with = "hex_vec")]
    pub ciphertext: Vec<u8>,
    /// Detached AES-GCM tag
    #[serde(with = "hex_tag")]
    pub auth_tag: AuthTag,
}

impl SharedSecretEnvelope {
    /// The symmetric part of the envelope
    pub fn sealed_payload(&self) -> SealedPayload {
        SealedPayload {
            iv: self.iv,
            ciphertext: self.ciphertext.clone(),
            auth_tag: self.auth_tag,
        }
    }

    fn validate(&self) -> Result<()> {
        check_version(self.version)?;
        if self.sender_public_key == self.recipient_public_key {
            return Err(CryptoError::MalformedEnvelope(
                "sender and recipient exchange keys are identical".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which construction protects a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeScheme {
    /// Per-message session key wrapped with RSA-OAEP
    Hybrid,
    /// Legacy conversation key from an X25519 exchange
    SharedSecret,
}

impl EnvelopeScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::SharedSecret => "shared_secret",
        }
    }
}

impl std::fmt::Display for EnvelopeScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An envelope of either scheme, tagged on the wire by `scheme`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum MessageEnvelope {
    Hybrid(HybridEnvelope),
    SharedSecret(SharedSecretEnvelope),
}

impl MessageEnvelope {
    /// The scheme of this envelope
    pub fn scheme(&self) -> EnvelopeScheme {
        match self {
            Self::Hybrid(_) => EnvelopeScheme::Hybrid,
            Self::SharedSecret(_) => EnvelopeScheme::SharedSecret,
        }
    }

    /// The algorithm identifier of this envelope
    pub fn algorithm_id(&self) -> &'static str {
        match self {
            Self::Hybrid(env) => env.algorithm.algorithm_id(),
            Self::SharedSecret(env) => env.algorithm.algorithm_id(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Hybrid(env) => env.validate(),
            Self::SharedSecret(env) => env.validate(),
        }
    }
}

impl From<HybridEnvelope> for MessageEnvelope {
    fn from(env: HybridEnvelope) -> Self {
        Self::Hybrid(env)
    }
}

impl From<SharedSecretEnvelope> for MessageEnvelope {
    fn from(env: SharedSecretEnvelope) -> Self {
        Self::SharedSecret(env)
    }
}

/// Serializes envelopes to and parses them from their JSON wire form
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Serialize an envelope to its wire form
    pub fn serialize(envelope: &MessageEnvelope) -> Result<String> {
        serde_json::to_string(envelope).map_err(|e| CryptoError::Serialization(e.to_string()))
    }

    /// Parse a wire-form envelope
    ///
    /// Fails with [`CryptoError::MalformedEnvelope`] on a missing field, a bad
    /// encoding, a wrong fixed length, an unknown algorithm or version.
    pub fn parse(wire: &str) -> Result<MessageEnvelope> {
        let envelope: MessageEnvelope = serde_json::from_str(wire)
            .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Serialize a hybrid envelope (tagged `"scheme": "hybrid"`)
    pub fn serialize_hybrid(envelope: &HybridEnvelope) -> Result<String> {
        Self::serialize(&MessageEnvelope::Hybrid(envelope.clone()))
    }

    /// Parse a wire-form envelope that must use the hybrid scheme
    pub fn parse_hybrid(wire: &str) -> Result<HybridEnvelope> {
        match Self::parse(wire)? {
            MessageEnvelope::Hybrid(env) => Ok(env),
            other => Err(CryptoError::SchemeMismatch {
                expected: EnvelopeScheme::Hybrid.as_str(),
                actual: other.scheme().as_str(),
            }),
        }
    }

    /// Serialize a shared-secret envelope (tagged `"scheme": "shared_secret"`)
    pub fn serialize_shared_secret(envelope: &SharedSecretEnvelope) -> Result<String> {
        Self::serialize(&MessageEnvelope::SharedSecret(envelope.clone()))
    }

    /// Parse a wire-form envelope that must use the shared-secret scheme
    pub fn parse_shared_secret(wire: &str) -> Result<SharedSecretEnvelope> {
        match Self::parse(wire)? {
            MessageEnvelope::SharedSecret(env) => Ok(env),
            other => Err(CryptoError::SchemeMismatch {
                expected: EnvelopeScheme::SharedSecret.as_str(),
                actual: other.scheme().as_str(),
            }),
        }
    }
}

fn check_version(version: u8) -> Result<()> {
    if version != ENVELOPE_VERSION {
        return Err(CryptoError::MalformedEnvelope(format!(
            "unsupported envelope version {version}"
        )));
    }
    Ok(())
}

mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

mod hex_iv {
    use crate::symmetric::Iv;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(iv: &Iv, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(iv.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Iv, D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Iv::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

mod hex_tag {
    use crate::symmetric::AuthTag;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tag: &AuthTag, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(tag.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<AuthTag, D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        AuthTag::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

mod base64_vec {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}

mod base64_exchange_key {
    use crate::exchange::ExchangePublicKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &ExchangePublicKey, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&key.to_base64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ExchangePublicKey, D::Error> {
        let s = String::deserialize(d)?;
        ExchangePublicKey::from_base64(&s).map_err(serde::de::Error::custom)
    }
}
