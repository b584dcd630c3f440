//! Error types for handshake, ratchet and message encryption

use thiserror::Error;

/// Result type alias for Pairseal operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur while establishing or using a session
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The operating system random source could not produce bytes.
    /// Fatal for key generation; never retried with a weaker source.
    #[error("Random number generation failed")]
    RngFailure,

    /// A peer public key was malformed, low-order or otherwise unusable
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// AEAD tag verification failed
    #[error("Message authentication failed")]
    AuthenticationFailure,

    /// Transport blob is not valid base64 or is too short to hold a nonce
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Key derivation failed
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Message too large
    #[error("Message too large: {size} bytes exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Chain exhausted, a new handshake is required
    #[error("Chain length exceeded maximum ({max}), new handshake required")]
    ChainTooLong { max: u64 },

    /// Session configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for CryptoError {
    fn from(err: bincode::Error) -> Self {
        CryptoError::Serialization(err.to_string())
    }
}

impl From<rand_core::Error> for CryptoError {
    fn from(_: rand_core::Error) -> Self {
        CryptoError::RngFailure
    }
}
