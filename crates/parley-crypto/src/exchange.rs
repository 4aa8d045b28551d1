//! Legacy shared-secret scheme over X25519
//!
//! Two parties holding X25519 exchange key pairs derive the same
//! conversation key without sending it anywhere. The raw exchange output is
//! never used as a cipher key; it goes through HKDF-SHA256, with both
//! public keys (in sorted order) bound into the HKDF info.
//!
//! Exchange key pairs are separate from RSA identity key pairs. The hybrid
//! scheme in [`crate::hybrid`] is the default; this path exists for
//! conversations configured for it explicitly.

use crate::{
    envelope::{SharedSecretAlgorithm, SharedSecretEnvelope},
    keys::SessionKey,
    symmetric::{SealedPayload, SymmetricCipher},
    CryptoError, Result, ENVELOPE_VERSION, KEY_SIZE,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use tracing::{debug, instrument};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

/// Size of an X25519 key in bytes
pub const EXCHANGE_KEY_SIZE: usize = 32;

/// Domain separation for HKDF key derivation
const HKDF_INFO: &[u8] = b"parley-shared-secret-v1";

/// Associated data label for shared-secret envelopes
const AAD_LABEL: &[u8] = b"parley-e2e-v1";

/// An X25519 public key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangePublicKey {
    bytes: [u8; EXCHANGE_KEY_SIZE],
}

impl ExchangePublicKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != EXCHANGE_KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "exchange public key must be {} bytes, got {}",
                EXCHANGE_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut arr = [0u8; EXCHANGE_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8; EXCHANGE_KEY_SIZE] {
        &self.bytes
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(self.bytes)
    }

    /// Decode from base64
    pub fn from_base64(s: &str) -> Result<Self> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| CryptoError::InvalidKey(format!("bad base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for ExchangePublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangePublicKey({})", self.to_base64())
    }
}

/// An X25519 key pair for the shared-secret scheme
#[derive(Clone)]
pub struct ExchangeKeyPair {
    secret: StaticSecret,
    public: ExchangePublicKey,
}

impl ExchangeKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; EXCHANGE_KEY_SIZE]);
        OsRng.try_fill_bytes(&mut bytes[..])?;
        Ok(Self::from_secret_bytes(*bytes))
    }

    /// Rebuild a key pair from raw secret bytes
    pub fn from_secret_bytes(bytes: [u8; EXCHANGE_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = ExchangePublicKey {
            bytes: *X25519Public::from(&secret).as_bytes(),
        };
        Self { secret, public }
    }

    /// Export the secret key bytes
    pub fn secret_bytes(&self) -> Zeroizing<[u8; EXCHANGE_KEY_SIZE]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Get the public key
    pub fn public_key(&self) -> &ExchangePublicKey {
        &self.public
    }
}

impl std::fmt::Debug for ExchangeKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeKeyPair({:?}, ..)", self.public)
    }
}

/// A conversation key derived from an X25519 exchange
#[derive(Clone, Debug)]
pub struct SharedSecret {
    key: SessionKey,
}

impl SharedSecret {
    /// The derived symmetric key
    pub fn key(&self) -> &SessionKey {
        &self.key
    }
}

/// Derives [`SharedSecret`]s from exchange key material
pub struct SharedSecretDeriver;

impl SharedSecretDeriver {
    /// Derive the conversation key between `mine` and `theirs`
    ///
    /// Symmetric: both parties arrive at the same key. Rejects peer keys
    /// that force a non-contributory (all-zero) exchange output.
    pub fn derive(mine: &ExchangeKeyPair, theirs: &ExchangePublicKey) -> Result<SharedSecret> {
        let shared = mine.secret.diffie_hellman(&X25519Public::from(theirs.bytes));
        if !shared.was_contributory() {
            return Err(CryptoError::InvalidKey(
                "peer exchange key is a low-order point".to_string(),
            ));
        }

        let (first, second) = if mine.public.bytes <= theirs.bytes {
            (&mine.public.bytes, &theirs.bytes)
        } else {
            (&theirs.bytes, &mine.public.bytes)
        };
        let info = [HKDF_INFO, first.as_slice(), second.as_slice()].concat();

        let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
        let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
        hk.expand(&info, &mut okm[..])
            .map_err(|e| CryptoError::CryptoProvider(format!("HKDF expand failed: {e}")))?;

        Ok(SharedSecret {
            key: SessionKey::from_bytes(&okm[..])?,
        })
    }
}

/// Encrypts and decrypts messages between two exchange key holders
pub struct SharedSecretCipher {
    local: ExchangeKeyPair,
}

impl SharedSecretCipher {
    /// Create a cipher for the local party
    pub fn new(local: &ExchangeKeyPair) -> Self {
        Self {
            local: local.clone(),
        }
    }

    /// Encrypt a message for `peer`
    ///
    /// `peer` must be a different key from the local one; envelopes with the
    /// same key on both sides are rejected by the codec.
    #[instrument(skip_all, fields(len = plaintext.len()))]
    pub fn encrypt(
        &self,
        plaintext: &str,
        peer: &ExchangePublicKey,
    ) -> Result<SharedSecretEnvelope> {
        if *peer == self.local.public {
            return Err(CryptoError::InvalidKey(
                "cannot address a shared-secret envelope to the sender's own key".to_string(),
            ));
        }
        let secret = SharedSecretDeriver::derive(&self.local, peer)?;
        let aad = associated_data(&self.local.public, peer);
        let sealed =
            SymmetricCipher::encrypt_with_aad(plaintext.as_bytes(), &aad, secret.key())?;

        debug!("Encrypted shared-secret envelope");
        Ok(SharedSecretEnvelope {
            version: ENVELOPE_VERSION,
            algorithm: SharedSecretAlgorithm::default(),
            sender_public_key: self.local.public,
            recipient_public_key: *peer,
            iv: sealed.iv,
            ciphertext: sealed.ciphertext,
            auth_tag: sealed.auth_tag,
        })
    }

    /// Decrypt an envelope sent to or by the local party
    #[instrument(skip_all, fields(len = envelope.ciphertext.len()))]
    pub fn decrypt(&self, envelope: &SharedSecretEnvelope) -> Result<String> {
        let local = &self.local.public;
        let peer = if envelope.recipient_public_key == *local {
            &envelope.sender_public_key
        } else if envelope.sender_public_key == *local {
            &envelope.recipient_public_key
        } else {
            return Err(CryptoError::KeyUnwrap(
                "envelope does not involve this exchange key".to_string(),
            ));
        };

        let secret = SharedSecretDeriver::derive(&self.local, peer)?;
        let aad = associated_data(
            &envelope.sender_public_key,
            &envelope.recipient_public_key,
        );
        let payload: SealedPayload = envelope.sealed_payload();
        let plaintext = SymmetricCipher::decrypt_with_aad(&payload, &aad, secret.key())?;

        String::from_utf8(plaintext).map_err(|_| {
            CryptoError::InvalidPlaintext("decrypted content is not UTF-8".to_string())
        })
    }
}

fn associated_data(sender: &ExchangePublicKey, recipient: &ExchangePublicKey) -> Vec<u8> {
    [
        AAD_LABEL,
        SharedSecretAlgorithm::default().algorithm_id().as_bytes(),
        sender.as_bytes(),
        recipient.as_bytes(),
    ]
    .concat()
}
