//! Symmetric encryption using AES-256-GCM
//!
//! Message content is sealed with AES-256-GCM under a 128-bit random IV.
//! The tag is kept detached from the ciphertext so each can be carried as
//! its own envelope field.

use crate::{keys::SessionKey, CryptoError, Result, IV_SIZE, TAG_SIZE};
use aes_gcm::{
    aead::{consts::U16, generic_array::GenericArray, AeadInPlace, KeyInit},
    aes::Aes256,
    AesGcm,
};
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, warn};

/// AES-256-GCM with a 128-bit nonce
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// An initialization vector for AES-GCM
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Iv {
    bytes: [u8; IV_SIZE],
}

impl Iv {
    /// Generate a random IV
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; IV_SIZE];
        OsRng.try_fill_bytes(&mut bytes)?;
        Ok(Self { bytes })
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != IV_SIZE {
            return Err(CryptoError::MalformedEnvelope(format!(
                "iv must be {} bytes, got {}",
                IV_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; IV_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Get the IV bytes
    pub fn as_bytes(&self) -> &[u8; IV_SIZE] {
        &self.bytes
    }
}

/// A detached AES-GCM authentication tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthTag {
    bytes: [u8; TAG_SIZE],
}

impl AuthTag {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TAG_SIZE {
            return Err(CryptoError::MalformedEnvelope(format!(
                "auth tag must be {} bytes, got {}",
                TAG_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; TAG_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Get the tag bytes
    pub fn as_bytes(&self) -> &[u8; TAG_SIZE] {
        &self.bytes
    }
}

/// Output of [`SymmetricCipher::encrypt`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedPayload {
    pub iv: Iv,
    pub ciphertext: Vec<u8>,
    pub auth_tag: AuthTag,
}

/// AES-256-GCM encryption/decryption with per-call random IVs
///
/// Stateless; every call builds its own cipher context.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymmetricCipher;

impl SymmetricCipher {
    /// Algorithm identifier
    pub const ALGORITHM_ID: &'static str = "aes-256-gcm";

    /// Generate a fresh 256-bit key
    pub fn generate_key() -> Result<SessionKey> {
        SessionKey::generate()
    }

    /// Encrypt under a fresh random IV
    pub fn encrypt(plaintext: &[u8], key: &SessionKey) -> Result<SealedPayload> {
        Self::encrypt_with_aad(plaintext, b"", key)
    }

    /// Encrypt under a fresh random IV, binding associated data into the tag
    pub fn encrypt_with_aad(
        plaintext: &[u8],
        aad: &[u8],
        key: &SessionKey,
    ) -> Result<SealedPayload> {
        let iv = Iv::generate()?;
        let cipher = Aes256Gcm16::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(iv.as_bytes()), aad, &mut buffer)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        debug!(len = buffer.len(), "Sealed payload");
        Ok(SealedPayload {
            iv,
            ciphertext: buffer,
            auth_tag: AuthTag::from_bytes(tag.as_slice())?,
        })
    }

    /// Verify and decrypt
    ///
    /// The tag is checked before any plaintext is released; on failure the
    /// working buffer is dropped and [`CryptoError::Authentication`] returned.
    pub fn decrypt(payload: &SealedPayload, key: &SessionKey) -> Result<Vec<u8>> {
        Self::decrypt_with_aad(payload, b"", key)
    }

    /// Verify and decrypt with associated data
    pub fn decrypt_with_aad(
        payload: &SealedPayload,
        aad: &[u8],
        key: &SessionKey,
    ) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm16::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let mut buffer = payload.ciphertext.clone();
        match cipher.decrypt_in_place_detached(
            GenericArray::from_slice(payload.iv.as_bytes()),
            aad,
            &mut buffer,
            GenericArray::from_slice(payload.auth_tag.as_bytes()),
        ) {
            Ok(()) => Ok(buffer),
            Err(_) => {
                warn!("Authentication tag mismatch");
                Err(CryptoError::Authentication)
            }
        }
    }
}
