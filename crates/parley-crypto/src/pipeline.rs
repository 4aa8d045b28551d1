//! Message pipeline entry points
//!
//! [`MessageProtector`] is what the send/receive path calls. The scheme of
//! each message is chosen explicitly by the caller through [`SealFor`];
//! configuration can switch end-to-end encryption off or gate the legacy
//! shared-secret scheme, but it never turns an encryption request into a
//! plaintext store.

use crate::{
    config::CryptoConfig,
    envelope::{EnvelopeCodec, EnvelopeScheme, MessageEnvelope},
    exchange::{ExchangeKeyPair, ExchangePublicKey, SharedSecretCipher},
    hybrid::{HybridDecryptor, HybridEncryptor},
    keys::{IdentityKeyPair, IdentityPrivateKey, IdentityPublicKey},
    CryptoError, Result,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Who a message is sealed for, and under which scheme
#[derive(Clone, Copy, Debug)]
pub enum SealFor<'a> {
    /// Hybrid envelope for a recipient's identity key
    Identity(&'a IdentityPublicKey),
    /// Shared-secret envelope between the local exchange key and a peer
    Exchange {
        local: &'a ExchangeKeyPair,
        peer: &'a ExchangePublicKey,
    },
}

impl SealFor<'_> {
    /// The scheme this target produces
    pub fn scheme(&self) -> EnvelopeScheme {
        match self {
            Self::Identity(_) => EnvelopeScheme::Hybrid,
            Self::Exchange { .. } => EnvelopeScheme::SharedSecret,
        }
    }
}

/// Local key material used to open an envelope
#[derive(Clone, Copy, Debug)]
pub enum OpenWith<'a> {
    /// Identity private key, for hybrid envelopes
    Identity(&'a IdentityPrivateKey),
    /// Exchange key pair, for shared-secret envelopes
    Exchange(&'a ExchangeKeyPair),
}

impl OpenWith<'_> {
    /// The scheme these keys can open
    pub fn scheme(&self) -> EnvelopeScheme {
        match self {
            Self::Identity(_) => EnvelopeScheme::Hybrid,
            Self::Exchange(_) => EnvelopeScheme::SharedSecret,
        }
    }
}

/// Message content as handed to storage: plaintext only when the caller
/// did not ask for encryption
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum ProtectedContent {
    Plain(String),
    Encrypted(MessageEnvelope),
}

impl ProtectedContent {
    /// Whether the content is an envelope
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }
}

/// Seals outgoing messages and opens incoming ones
#[derive(Clone, Debug)]
pub struct MessageProtector {
    config: CryptoConfig,
}

impl MessageProtector {
    /// Create a protector with a validated configuration
    pub fn new(config: CryptoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration
    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    /// Generate an identity key pair at the configured strength
    pub fn generate_identity(&self) -> Result<IdentityKeyPair> {
        IdentityKeyPair::generate(self.config.identity_key_strength()?)
    }

    /// Encrypt a message for one target
    #[instrument(skip_all, fields(scheme = %target.scheme(), len = plaintext.len()))]
    pub fn seal(&self, plaintext: &str, target: SealFor<'_>) -> Result<MessageEnvelope> {
        self.check_can_seal(plaintext, target.scheme())?;

        let envelope: MessageEnvelope = match target {
            SealFor::Identity(recipient) => {
                HybridEncryptor::new(recipient).encrypt(plaintext)?.into()
            }
            SealFor::Exchange { local, peer } => {
                SharedSecretCipher::new(local).encrypt(plaintext, peer)?.into()
            }
        };
        debug!("Sealed message");
        Ok(envelope)
    }

    /// Encrypt a channel message once per member
    #[instrument(skip_all, fields(members = members.len(), len = plaintext.len()))]
    pub fn seal_for_members(
        &self,
        plaintext: &str,
        members: &[IdentityPublicKey],
    ) -> Result<Vec<MessageEnvelope>> {
        self.check_can_seal(plaintext, EnvelopeScheme::Hybrid)?;
        let envelopes = HybridEncryptor::encrypt_for_recipients(plaintext, members)?;
        Ok(envelopes.into_iter().map(MessageEnvelope::from).collect())
    }

    /// Decrypt an envelope with matching local keys
    #[instrument(skip_all, fields(scheme = %envelope.scheme()))]
    pub fn open(&self, envelope: &MessageEnvelope, keys: OpenWith<'_>) -> Result<String> {
        match (envelope, keys) {
            (MessageEnvelope::Hybrid(env), OpenWith::Identity(private)) => {
                HybridDecryptor::new(private).decrypt(env)
            }
            (MessageEnvelope::SharedSecret(env), OpenWith::Exchange(local)) => {
                SharedSecretCipher::new(local).decrypt(env)
            }
            (envelope, keys) => Err(CryptoError::SchemeMismatch {
                expected: keys.scheme().as_str(),
                actual: envelope.scheme().as_str(),
            }),
        }
    }

    /// Encrypt and serialize to the wire form
    pub fn seal_to_wire(&self, plaintext: &str, target: SealFor<'_>) -> Result<String> {
        EnvelopeCodec::serialize(&self.seal(plaintext, target)?)
    }

    /// Parse a wire-form envelope and decrypt it
    pub fn open_wire(&self, wire: &str, keys: OpenWith<'_>) -> Result<String> {
        let envelope = EnvelopeCodec::parse(wire)?;
        self.open(&envelope, keys)
    }

    /// Protect message content for storage
    ///
    /// `encrypt_for: None` is the caller choosing plaintext; `Some` always
    /// yields an envelope or an error.
    pub fn protect(
        &self,
        plaintext: &str,
        encrypt_for: Option<SealFor<'_>>,
    ) -> Result<ProtectedContent> {
        match encrypt_for {
            None => Ok(ProtectedContent::Plain(plaintext.to_string())),
            Some(target) => Ok(ProtectedContent::Encrypted(self.seal(plaintext, target)?)),
        }
    }

    /// Recover displayable text from stored content
    pub fn reveal(&self, content: &ProtectedContent, keys: OpenWith<'_>) -> Result<String> {
        match content {
            ProtectedContent::Plain(text) => Ok(text.clone()),
            ProtectedContent::Encrypted(envelope) => self.open(envelope, keys),
        }
    }

    fn check_can_seal(&self, plaintext: &str, scheme: EnvelopeScheme) -> Result<()> {
        if !self.config.e2e_enabled {
            return Err(CryptoError::EncryptionDisabled);
        }
        if scheme == EnvelopeScheme::SharedSecret && !self.config.allow_shared_secret {
            return Err(CryptoError::SchemeDisabled(EnvelopeScheme::SharedSecret.as_str()));
        }
        if plaintext.len() > self.config.max_plaintext_len {
            return Err(CryptoError::InvalidPlaintext(format!(
                "message is {} bytes, limit is {}",
                plaintext.len(),
                self.config.max_plaintext_len
            )));
        }
        Ok(())
    }
}
