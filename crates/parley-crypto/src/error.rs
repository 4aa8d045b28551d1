//! Error types for the parley-crypto crate

use thiserror::Error;

/// Result type alias using `CryptoError`
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur while protecting or opening messages
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Randomness or a cryptographic primitive is unavailable
    #[error("crypto provider failure: {0}")]
    CryptoProvider(String),

    /// Authentication tag did not verify (tampered data or wrong key)
    #[error("message could not be verified")]
    Authentication,

    /// The wrapped session key could not be recovered with the given private key
    #[error("session key unwrap failed: {0}")]
    KeyUnwrap(String),

    /// Envelope wire format is missing fields or badly encoded
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Invalid key format, length or strength
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Encryption failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Plaintext rejected before encryption or after decryption
    #[error("invalid plaintext: {0}")]
    InvalidPlaintext(String),

    /// Encryption was requested while end-to-end encryption is switched off
    #[error("end-to-end encryption is disabled")]
    EncryptionDisabled,

    /// The requested envelope scheme is disabled in configuration
    #[error("envelope scheme '{0}' is disabled")]
    SchemeDisabled(&'static str),

    /// Envelope scheme does not match the keys supplied for opening it
    #[error("envelope scheme mismatch: expected {expected}, got {actual}")]
    SchemeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CryptoError {
    /// True when the message content failed integrity verification
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Authentication)
    }

    /// True when the envelope is not addressed to the supplied private key
    pub fn is_key_unwrap_failure(&self) -> bool {
        matches!(self, Self::KeyUnwrap(_))
    }
}

impl From<config::ConfigError> for CryptoError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        Self::CryptoProvider(err.to_string())
    }
}
