//! # Parley Crypto
//!
//! End-to-end encryption for Parley direct messages and channels.
//!
//! This crate provides:
//! - **Hybrid envelopes**: AES-256-GCM message encryption under a fresh
//!   per-message session key, wrapped for the recipient with RSA-OAEP
//! - **Shared-secret envelopes** (legacy): X25519 key exchange, HKDF-SHA256
//!   key derivation, AES-256-GCM
//! - **Envelope codec**: JSON wire format with hex/base64 field encodings
//! - **Message pipeline**: explicit per-message scheme selection and the
//!   end-to-end feature flag
//!
//! ## Security Model
//!
//! - Asymmetric encryption only ever touches the 32-byte session key
//! - Every message gets a fresh session key and a fresh 128-bit IV
//! - Tampering is reported as [`CryptoError::Authentication`], a wrong
//!   recipient as [`CryptoError::KeyUnwrap`]; no partial plaintext is returned
//! - Private keys are exported as opaque PEM/DER so callers can protect
//!   them at rest
//!
//! ## Example
//!
//! ```rust,ignore
//! use parley_crypto::{EnvelopeCodec, HybridDecryptor, HybridEncryptor, IdentityKeyPair};
//!
//! let recipient = IdentityKeyPair::generate_default()?;
//!
//! let envelope = HybridEncryptor::new(recipient.public_key())
//!     .encrypt("Quarterly numbers are due Friday")?;
//! let wire = EnvelopeCodec::serialize_hybrid(&envelope)?;
//!
//! let parsed = EnvelopeCodec::parse_hybrid(&wire)?;
//! let plaintext = HybridDecryptor::new(recipient.private_key()).decrypt(&parsed)?;
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod exchange;
pub mod hybrid;
pub mod keys;
pub mod pipeline;
pub mod symmetric;

pub use crate::config::CryptoConfig;
pub use envelope::{
    EnvelopeCodec, EnvelopeScheme, HybridAlgorithm, HybridEnvelope, MessageEnvelope,
    SharedSecretAlgorithm, SharedSecretEnvelope,
};
pub use error::{CryptoError, Result};
pub use exchange::{
    ExchangeKeyPair, ExchangePublicKey, SharedSecret, SharedSecretCipher, SharedSecretDeriver,
};
pub use hybrid::{HybridDecryptor, HybridEncryptor};
pub use keys::{
    generate_key_pair, IdentityKeyPair, IdentityPrivateKey, IdentityPublicKey, KeyStrength,
    SessionKey,
};
pub use pipeline::{MessageProtector, OpenWith, ProtectedContent, SealFor};
pub use symmetric::{AuthTag, Iv, SealedPayload, SymmetricCipher};

/// Version of the envelope wire format
pub const ENVELOPE_VERSION: u8 = 1;

/// Size of a symmetric session key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM IV in bytes (128 bits)
pub const IV_SIZE: usize = 16;

/// Size of the AES-GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;
