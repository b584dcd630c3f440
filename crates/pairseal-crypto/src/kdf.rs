//! Key Derivation Functions (KDF) for the Pairseal protocol
//!
//! HKDF-SHA256 for expanding handshake output and HMAC-SHA256 for the
//! per-message chain, each under a fixed domain label.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Result};

/// HKDF using SHA-256 for key derivation
pub type HkdfSha256 = Hkdf<Sha256>;

/// HMAC-SHA256 for chain derivation
pub type HmacSha256 = Hmac<Sha256>;

/// Domain separation strings for different key derivation contexts
pub mod domain {
    /// Root and chain key expansion from the combined handshake secret
    pub const ROOT_AND_CHAIN: &[u8] = b"Pairseal_v1_RootAndChain";
    /// Message key derivation from a chain key
    pub const MESSAGE_KEY: &[u8] = b"message key";
    /// Next chain key derivation from a chain key
    pub const NEXT_CHAIN_KEY: &[u8] = b"next chain key";
    /// Message key as used by the initiator's sends
    pub const SENDER_INITIATOR: &[u8] = b"Pairseal_v1_Sender_Initiator";
    /// Message key as used by the responder's sends
    pub const SENDER_RESPONDER: &[u8] = b"Pairseal_v1_Sender_Responder";
    /// Public session fingerprint
    pub const SESSION_FINGERPRINT: &[u8] = b"Pairseal_v1_SessionFingerprint";
}

/// A derived key with automatic zeroization
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey<const N: usize>(pub [u8; N]);

impl<const N: usize> DerivedKey<N> {
    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> AsRef<[u8]> for DerivedKey<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Key derivation context for HKDF operations
pub struct KeyDerivationContext {
    /// The PRK (Pseudo-Random Key) from HKDF-Extract
    hkdf: HkdfSha256,
}

impl KeyDerivationContext {
    /// Create a new KDF context from input key material
    ///
    /// # Arguments
    /// * `salt` - Optional salt (if None, uses zero-filled salt)
    /// * `ikm` - Input Key Material (e.g., concatenated DH outputs)
    pub fn new(salt: Option<&[u8]>, ikm: &[u8]) -> Self {
        let hkdf = HkdfSha256::new(salt, ikm);
        Self { hkdf }
    }

    /// Derive a key with the given info string
    pub fn derive<const N: usize>(&self, info: &[u8]) -> Result<DerivedKey<N>> {
        let mut output = DerivedKey([0u8; N]);
        self.hkdf
            .expand(info, &mut output.0)
            .map_err(|_| CryptoError::KeyDerivation("HKDF expansion failed".to_string()))?;
        Ok(output)
    }
}

/// Keyed one-way function: HMAC-SHA256(key, label)
pub fn hmac_sha256(key: &[u8; 32], label: &[u8]) -> [u8; 32] {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(label);
    let result = mac.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result.into_bytes());
    output
}

/// Constant-time comparison to prevent timing attacks
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_context() {
        let ikm = [0x42u8; 128];
        let kdf = KeyDerivationContext::new(None, &ikm);

        let key1: DerivedKey<64> = kdf.derive(b"context1").unwrap();
        let key2: DerivedKey<64> = kdf.derive(b"context2").unwrap();

        // Different contexts should produce different keys
        assert_ne!(key1.as_bytes(), key2.as_bytes());

        // Same context should produce same key
        let key1_again: DerivedKey<64> = kdf.derive(b"context1").unwrap();
        assert_eq!(key1.as_bytes(), key1_again.as_bytes());
    }

    #[test]
    fn test_hkdf_rejects_oversized_output() {
        let kdf = KeyDerivationContext::new(None, &[0x01; 32]);
        // HKDF-SHA256 caps output at 255 * 32 bytes
        let result = kdf.derive::<8200>(domain::ROOT_AND_CHAIN);
        assert!(matches!(result, Err(CryptoError::KeyDerivation(_))));
    }

    #[test]
    fn test_hmac_labels_separate_outputs() {
        let key = [0x42u8; 32];

        let a = hmac_sha256(&key, domain::MESSAGE_KEY);
        let b = hmac_sha256(&key, domain::NEXT_CHAIN_KEY);

        assert_ne!(a, b);
        assert_eq!(a, hmac_sha256(&key, domain::MESSAGE_KEY));
    }

    #[test]
    fn test_constant_time_eq() {
        let a = [1, 2, 3, 4];
        let b = [1, 2, 3, 4];
        let c = [1, 2, 3, 5];

        assert!(constant_time_eq(&a, &b));
        assert!(!constant_time_eq(&a, &c));
        assert!(!constant_time_eq(&a, &[]));
    }
}
