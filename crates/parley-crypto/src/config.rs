//! Encryption configuration

use crate::{keys::KeyStrength, CryptoError, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix read by [`CryptoConfig::from_env`]
pub const ENV_PREFIX: &str = "PARLEY";

/// Encryption configuration for the message pipeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// End-to-end encryption feature flag
    pub e2e_enabled: bool,
    /// RSA modulus size for newly generated identity keys
    pub identity_key_bits: usize,
    /// Allow the legacy shared-secret scheme
    pub allow_shared_secret: bool,
    /// Largest plaintext accepted for encryption (bytes)
    pub max_plaintext_len: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            e2e_enabled: true,
            identity_key_bits: KeyStrength::default().bits(),
            allow_shared_secret: false,
            max_plaintext_len: 1024 * 1024, // 1 MiB
        }
    }
}

impl CryptoConfig {
    /// Load from `PARLEY_*` environment variables over the defaults
    ///
    /// e.g. `PARLEY_E2E_ENABLED=false`, `PARLEY_IDENTITY_KEY_BITS=3072`.
    /// Nothing in this crate calls this implicitly.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config: Self = config::Config::builder()
            .set_default("e2e_enabled", defaults.e2e_enabled)?
            .set_default("identity_key_bits", defaults.identity_key_bits as u64)?
            .set_default("allow_shared_secret", defaults.allow_shared_secret)?
            .set_default("max_plaintext_len", defaults.max_plaintext_len as u64)?
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Disable end-to-end encryption
    pub fn without_e2e(mut self) -> Self {
        self.e2e_enabled = false;
        self
    }

    /// Set the identity key strength
    pub fn with_identity_key_strength(mut self, strength: KeyStrength) -> Self {
        self.identity_key_bits = strength.bits();
        self
    }

    /// Allow the legacy shared-secret scheme
    pub fn with_shared_secret(mut self) -> Self {
        self.allow_shared_secret = true;
        self
    }

    /// Set the plaintext size ceiling
    pub fn with_max_plaintext_len(mut self, len: usize) -> Self {
        self.max_plaintext_len = len;
        self
    }

    /// The identity key strength
    pub fn identity_key_strength(&self) -> Result<KeyStrength> {
        KeyStrength::from_bits(self.identity_key_bits)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        self.identity_key_strength()
            .map_err(|e| CryptoError::Config(e.to_string()))?;
        if self.max_plaintext_len == 0 {
            return Err(CryptoError::Config(
                "max_plaintext_len must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
