//! Authenticated Encryption with Associated Data (AEAD)
//!
//! Message keys are consumed by value: each one seals or opens exactly one
//! message and is erased on return.
//!
//! Transport encoding is the only bit-exact contract of this crate:
//!
//! ```text
//! base64( nonce (12 bytes) || ciphertext || tag (16 bytes) )
//! ```
//!
//! Standard base64 alphabet with padding. AES-256-GCM is the default;
//! ChaCha20-Poly1305 uses the same nonce and tag sizes and therefore the
//! same framing.

use aes_gcm::{
    aead::{Aead as AeadTrait, KeyInit, Payload},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, Result};
use crate::keys::random_bytes;
use crate::ratchet::MessageKey;

/// Nonce size for both algorithms (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits)
pub const TAG_SIZE: usize = 16;

/// Key size for both algorithms (256 bits)
pub const KEY_SIZE: usize = 32;

/// AEAD algorithm selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AeadAlgorithm {
    /// AES-256-GCM (default)
    #[default]
    Aes256Gcm,
    /// ChaCha20-Poly1305 (faster without AES hardware support)
    ChaCha20Poly1305,
}

impl AeadAlgorithm {
    /// Algorithm name for logs
    pub fn name(&self) -> &'static str {
        match self {
            AeadAlgorithm::Aes256Gcm => "AES-256-GCM",
            AeadAlgorithm::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }
}

/// Message codec: AEAD under a single-use key plus transport encoding
#[derive(Clone, Copy, Debug, Default)]
pub struct Codec {
    algorithm: AeadAlgorithm,
}

impl Codec {
    /// Create with the default algorithm (AES-256-GCM)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a specific algorithm
    pub fn with_algorithm(algorithm: AeadAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Configured algorithm
    pub fn algorithm(&self) -> AeadAlgorithm {
        self.algorithm
    }

    /// Encrypt `plaintext` and render the transport blob
    pub fn encrypt(&self, plaintext: &[u8], key: MessageKey) -> Result<String> {
        self.encrypt_with_aad(plaintext, &[], key)
    }

    /// Encrypt with authenticated metadata that travels out of band
    pub fn encrypt_with_aad(&self, plaintext: &[u8], aad: &[u8], key: MessageKey) -> Result<String> {
        let nonce = random_bytes::<NONCE_SIZE>()?;
        let payload = Payload {
            msg: plaintext,
            aad,
        };

        let sealed = match self.algorithm {
            AeadAlgorithm::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into())
                .encrypt((&nonce).into(), payload),
            AeadAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new(key.as_bytes().into())
                .encrypt((&nonce).into(), payload),
        }
        .map_err(|_| CryptoError::EncryptionFailed(format!("{} failed", self.algorithm.name())))?;

        let mut framed = Vec::with_capacity(NONCE_SIZE + sealed.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&sealed);

        Ok(STANDARD.encode(framed))
    }

    /// Decode and decrypt a transport blob
    pub fn decrypt(&self, blob: &str, key: MessageKey) -> Result<Vec<u8>> {
        self.decrypt_with_aad(blob, &[], key)
    }

    /// Decrypt a blob whose metadata was authenticated with `aad`
    pub fn decrypt_with_aad(&self, blob: &str, aad: &[u8], key: MessageKey) -> Result<Vec<u8>> {
        let framed = STANDARD
            .decode(blob)
            .map_err(|e| CryptoError::MalformedCiphertext(format!("invalid base64: {}", e)))?;

        if framed.len() < NONCE_SIZE {
            return Err(CryptoError::MalformedCiphertext(format!(
                "{} bytes is shorter than the {} byte nonce",
                framed.len(),
                NONCE_SIZE
            )));
        }

        let (nonce, sealed) = framed.split_at(NONCE_SIZE);
        let nonce: [u8; NONCE_SIZE] = nonce
            .try_into()
            .map_err(|_| CryptoError::MalformedCiphertext("bad nonce length".to_string()))?;
        let payload = Payload { msg: sealed, aad };

        let opened = match self.algorithm {
            AeadAlgorithm::Aes256Gcm => Aes256Gcm::new(key.as_bytes().into())
                .decrypt((&nonce).into(), payload),
            AeadAlgorithm::ChaCha20Poly1305 => ChaCha20Poly1305::new(key.as_bytes().into())
                .decrypt((&nonce).into(), payload),
        };
        opened.map_err(|_| CryptoError::AuthenticationFailure)
    }
}

/// Encrypt with the default codec
pub fn encrypt(plaintext: &[u8], key: MessageKey) -> Result<String> {
    Codec::new().encrypt(plaintext, key)
}

/// Decrypt with the default codec
pub fn decrypt(blob: &str, key: MessageKey) -> Result<Vec<u8>> {
    Codec::new().decrypt(blob, key)
}
