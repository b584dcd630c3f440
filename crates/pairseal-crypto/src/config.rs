//! Session configuration

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aead::AeadAlgorithm;
use crate::error::{CryptoError, Result};
use crate::{DEFAULT_MAX_CHAIN_LENGTH, MAX_MESSAGE_SIZE};

/// Per-session settings chosen by the host application
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// AEAD used for every message in the session
    pub algorithm: AeadAlgorithm,
    /// Largest plaintext accepted by `send`
    pub max_message_size: usize,
    /// Messages after which the chain is exhausted and a new handshake is needed
    pub max_chain_length: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            algorithm: AeadAlgorithm::default(),
            max_message_size: MAX_MESSAGE_SIZE,
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
        }
    }
}

impl SessionConfig {
    /// Create with a specific algorithm
    pub fn with_algorithm(algorithm: AeadAlgorithm) -> Self {
        Self {
            algorithm,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_message_size == 0 {
            return Err(CryptoError::InvalidConfig(
                "max_message_size must be greater than 0".to_string(),
            ));
        }
        if self.max_chain_length == 0 {
            return Err(CryptoError::InvalidConfig(
                "max_chain_length must be greater than 0".to_string(),
            ));
        }
        if self.max_chain_length > DEFAULT_MAX_CHAIN_LENGTH * 10 {
            warn!(
                max_chain_length = self.max_chain_length,
                "Very long chains delay re-keying"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.algorithm, AeadAlgorithm::Aes256Gcm);
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = SessionConfig {
            max_message_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CryptoError::InvalidConfig(_))));

        let config = SessionConfig {
            max_chain_length: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CryptoError::InvalidConfig(_))));
    }

    #[test]
    fn test_with_algorithm() {
        let config = SessionConfig::with_algorithm(AeadAlgorithm::ChaCha20Poly1305);
        assert_eq!(config.algorithm, AeadAlgorithm::ChaCha20Poly1305);
        assert_eq!(config.max_message_size, MAX_MESSAGE_SIZE);
    }
}
