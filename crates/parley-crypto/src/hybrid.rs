//! Hybrid message encryption: AES-256-GCM content, RSA-OAEP wrapped session key
//!
//! Each message gets a fresh 256-bit session key. The content is sealed
//! under that key; the key itself is encrypted to the recipient's identity
//! public key with OAEP (SHA-256) padding. RSA only ever sees the 32-byte
//! session key, so message length never runs into the modulus size.

use crate::{
    envelope::{HybridAlgorithm, HybridEnvelope},
    keys::{IdentityPrivateKey, IdentityPublicKey, SessionKey},
    symmetric::SymmetricCipher,
    CryptoError, Result, ENVELOPE_VERSION, KEY_SIZE,
};
use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

/// Encrypts messages for one recipient
pub struct HybridEncryptor {
    recipient: IdentityPublicKey,
    include_key_id: bool,
}

impl HybridEncryptor {
    /// Create a new encryptor for the given recipient
    pub fn new(recipient: &IdentityPublicKey) -> Self {
        Self {
            recipient: recipient.clone(),
            include_key_id: true,
        }
    }

    /// Leave `recipientKeyId` out of produced envelopes
    pub fn without_key_id(mut self) -> Self {
        self.include_key_id = false;
        self
    }

    /// Encrypt a text message
    pub fn encrypt(&self, plaintext: &str) -> Result<HybridEnvelope> {
        self.encrypt_bytes(plaintext.as_bytes())
    }

    /// Encrypt raw bytes
    #[instrument(
        skip_all,
        fields(len = plaintext.len(), recipient = %self.recipient.fingerprint())
    )]
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<HybridEnvelope> {
        let session_key = SymmetricCipher::generate_key()?;
        let sealed = SymmetricCipher::encrypt(plaintext, &session_key)?;
        let wrapped_key = wrap_session_key(&session_key, &self.recipient)?;

        debug!(wrapped_len = wrapped_key.len(), "Encrypted hybrid envelope");
        Ok(HybridEnvelope {
            version: ENVELOPE_VERSION,
            algorithm: HybridAlgorithm::default(),
            iv: sealed.iv,
            ciphertext: sealed.ciphertext,
            auth_tag: sealed.auth_tag,
            wrapped_key,
            recipient_key_id: self
                .include_key_id
                .then(|| self.recipient.fingerprint().to_string()),
        })
    }

    /// Encrypt one message separately for each recipient
    ///
    /// Every envelope gets its own session key and IV.
    pub fn encrypt_for_recipients(
        plaintext: &str,
        recipients: &[IdentityPublicKey],
    ) -> Result<Vec<HybridEnvelope>> {
        recipients
            .iter()
            .map(|recipient| Self::new(recipient).encrypt(plaintext))
            .collect()
    }
}

/// Decrypts messages addressed to one identity
pub struct HybridDecryptor {
    private: IdentityPrivateKey,
}

impl HybridDecryptor {
    /// Create a new decryptor with the recipient's private key
    pub fn new(private: &IdentityPrivateKey) -> Self {
        Self {
            private: private.clone(),
        }
    }

    /// Decrypt a text message
    pub fn decrypt(&self, envelope: &HybridEnvelope) -> Result<String> {
        let bytes = self.decrypt_bytes(envelope)?;
        String::from_utf8(bytes).map_err(|_| {
            CryptoError::InvalidPlaintext("decrypted content is not UTF-8".to_string())
        })
    }

    /// Decrypt raw bytes
    ///
    /// A wrong recipient is reported as [`CryptoError::KeyUnwrap`], altered
    /// content as [`CryptoError::Authentication`].
    #[instrument(skip_all, fields(len = envelope.ciphertext.len()))]
    pub fn decrypt_bytes(&self, envelope: &HybridEnvelope) -> Result<Vec<u8>> {
        if let Some(key_id) = &envelope.recipient_key_id {
            let own = self.private.public_key()?;
            if !own.fingerprint().eq_ignore_ascii_case(key_id) {
                warn!(expected = %key_id, "Envelope addressed to a different identity key");
                return Err(CryptoError::KeyUnwrap(
                    "envelope is addressed to a different key".to_string(),
                ));
            }
        }

        let session_key = unwrap_session_key(&envelope.wrapped_key, &self.private)?;
        SymmetricCipher::decrypt(&envelope.sealed_payload(), &session_key)
    }
}

fn wrap_session_key(key: &SessionKey, recipient: &IdentityPublicKey) -> Result<Vec<u8>> {
    recipient
        .as_rsa()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("session key wrap failed: {e}")))
}

fn unwrap_session_key(wrapped: &[u8], private: &IdentityPrivateKey) -> Result<SessionKey> {
    let unwrapped = private
        .as_rsa()
        .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), wrapped)
        .map(Zeroizing::new)
        .map_err(|_| {
            warn!("Session key unwrap failed");
            CryptoError::KeyUnwrap("wrong key or corrupted wrapped key".to_string())
        })?;

    if unwrapped.len() != KEY_SIZE {
        return Err(CryptoError::KeyUnwrap(format!(
            "unwrapped session key is {} bytes, expected {}",
            unwrapped.len(),
            KEY_SIZE
        )));
    }
    SessionKey::from_bytes(&unwrapped)
}
