//! Key material for Parley end-to-end encryption
//!
//! Two kinds of keys live here:
//! - Session keys: random 256-bit symmetric keys, one per message
//! - Identity keys: RSA key pairs generated at account creation, used to
//!   wrap session keys for a recipient
//!
//! Identity keys cross the crate boundary only as opaque PEM or DER so the
//! caller can protect the private half at rest.

use crate::{CryptoError, Result, KEY_SIZE};
use rand::{rngs::OsRng, RngCore};
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    traits::PublicKeyParts,
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Smallest RSA modulus accepted for identity keys
pub const MIN_IDENTITY_KEY_BITS: usize = 2048;

/// A per-message symmetric key
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    key: [u8; KEY_SIZE],
}

impl SessionKey {
    /// Generate a new random session key
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; KEY_SIZE];
        OsRng.try_fill_bytes(&mut key)?;
        Ok(Self { key })
    }

    /// Create a session key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "session key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// RSA modulus size for identity key pairs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyStrength {
    Rsa2048,
    Rsa3072,
    /// Preferred for long-lived identity keys
    #[default]
    Rsa4096,
}

impl KeyStrength {
    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa3072 => 3072,
            Self::Rsa4096 => 4096,
        }
    }

    /// Map a modulus size in bits to a supported strength
    pub fn from_bits(bits: usize) -> Result<Self> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            3072 => Ok(Self::Rsa3072),
            4096 => Ok(Self::Rsa4096),
            other => Err(CryptoError::InvalidKey(format!(
                "unsupported identity key size {other} bits (expected 2048, 3072 or 4096)"
            ))),
        }
    }
}

/// The public half of an identity key pair
#[derive(Clone)]
pub struct IdentityPublicKey {
    inner: RsaPublicKey,
    fingerprint: String,
}

impl IdentityPublicKey {
    fn from_rsa(inner: RsaPublicKey) -> Result<Self> {
        let bits = inner.size() * 8;
        if bits < MIN_IDENTITY_KEY_BITS {
            return Err(CryptoError::InvalidKey(format!(
                "identity key must be at least {MIN_IDENTITY_KEY_BITS} bits, got {bits}"
            )));
        }
        let der = inner
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let fingerprint = hex::encode(Sha256::digest(der.as_bytes()));
        Ok(Self { inner, fingerprint })
    }

    /// Parse a PEM public key (SPKI `PUBLIC KEY` or PKCS#1 `RSA PUBLIC KEY`)
    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner = RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| CryptoError::InvalidKey(format!("bad public key PEM: {e}")))?;
        Self::from_rsa(inner)
    }

    /// Parse a DER public key (SPKI or PKCS#1)
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = RsaPublicKey::from_public_key_der(der)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(der))
            .map_err(|e| CryptoError::InvalidKey(format!("bad public key DER: {e}")))?;
        Self::from_rsa(inner)
    }

    /// Export as SPKI PEM
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Export as SPKI DER
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Hex SHA-256 of the SPKI DER encoding
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.inner.size() * 8
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.inner
    }
}

impl PartialEq for IdentityPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for IdentityPublicKey {}

impl std::fmt::Debug for IdentityPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdentityPublicKey({})", self.fingerprint)
    }
}

/// The private half of an identity key pair
///
/// The RSA key zeroizes its own limbs on drop.
#[derive(Clone)]
pub struct IdentityPrivateKey {
    inner: RsaPrivateKey,
}

impl IdentityPrivateKey {
    fn from_rsa(inner: RsaPrivateKey) -> Result<Self> {
        let bits = inner.size() * 8;
        if bits < MIN_IDENTITY_KEY_BITS {
            return Err(CryptoError::InvalidKey(format!(
                "identity key must be at least {MIN_IDENTITY_KEY_BITS} bits, got {bits}"
            )));
        }
        inner
            .validate()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parse a PEM private key (PKCS#8 `PRIVATE KEY` or PKCS#1 `RSA PRIVATE KEY`)
    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|_| CryptoError::InvalidKey("bad private key PEM".to_string()))?;
        Self::from_rsa(inner)
    }

    /// Parse a DER private key (PKCS#8 or PKCS#1)
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = RsaPrivateKey::from_pkcs8_der(der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(der))
            .map_err(|_| CryptoError::InvalidKey("bad private key DER".to_string()))?;
        Self::from_rsa(inner)
    }

    /// Export as PKCS#8 PEM
    pub fn to_pem(&self) -> Result<Zeroizing<String>> {
        self.inner
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Export as PKCS#8 DER
    pub fn to_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.inner
            .to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> Result<IdentityPublicKey> {
        IdentityPublicKey::from_rsa(self.inner.to_public_key())
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }
}

impl std::fmt::Debug for IdentityPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdentityPrivateKey({} bits, ..)", self.inner.size() * 8)
    }
}

/// An identity key pair, used to receive hybrid envelopes
#[derive(Clone, Debug)]
pub struct IdentityKeyPair {
    private: IdentityPrivateKey,
    public: IdentityPublicKey,
}

impl IdentityKeyPair {
    /// Generate a fresh key pair with the given modulus size
    #[instrument(skip_all, fields(bits = strength.bits()))]
    pub fn generate(strength: KeyStrength) -> Result<Self> {
        let inner = RsaPrivateKey::new(&mut OsRng, strength.bits())
            .map_err(|e| CryptoError::CryptoProvider(format!("RSA key generation: {e}")))?;
        let keypair = Self::from_private_key(IdentityPrivateKey { inner })?;
        debug!(fingerprint = %keypair.public.fingerprint(), "Generated identity key pair");
        Ok(keypair)
    }

    /// Generate a fresh key pair with the default (4096-bit) strength
    pub fn generate_default() -> Result<Self> {
        Self::generate(KeyStrength::default())
    }

    /// Rebuild a key pair from its private half
    pub fn from_private_key(private: IdentityPrivateKey) -> Result<Self> {
        let public = private.public_key()?;
        Ok(Self { private, public })
    }

    /// Rebuild a key pair from a PEM private key
    pub fn from_private_pem(pem: &str) -> Result<Self> {
        Self::from_private_key(IdentityPrivateKey::from_pem(pem)?)
    }

    /// Get the public key
    pub fn public_key(&self) -> &IdentityPublicKey {
        &self.public
    }

    /// Get the private key
    pub fn private_key(&self) -> &IdentityPrivateKey {
        &self.private
    }
}

/// Generate an identity key pair at the default strength
pub fn generate_key_pair() -> Result<IdentityKeyPair> {
    IdentityKeyPair::generate_default()
}

#[cfg(test)]
pub(crate) mod test_keys {
    use super::*;
    use std::sync::OnceLock;

    /// 2048-bit key pairs shared across unit tests; RSA generation dominates test time
    pub fn alice() -> &'static IdentityKeyPair {
        static KEY: OnceLock<IdentityKeyPair> = OnceLock::new();
        KEY.get_or_init(|| IdentityKeyPair::generate(KeyStrength::Rsa2048).unwrap())
    }

    pub fn bob() -> &'static IdentityKeyPair {
        static KEY: OnceLock<IdentityKeyPair> = OnceLock::new();
        KEY.get_or_init(|| IdentityKeyPair::generate(KeyStrength::Rsa2048).unwrap())
    }
}
