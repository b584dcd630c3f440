//! Capability interface over the protocol primitives
//!
//! Key generation, the handshake and every [`Session`](crate::session::Session)
//! reach their primitives only through [`CipherSuite`], so the KDF, the chain
//! step or the AEAD can be replaced by another implementation without
//! touching [`X3dhHandshake`](crate::x3dh::X3dhHandshake) or session callers.
//! Key pairs stay X25519: their role typing lives in [`crate::keys`].

use rand::{CryptoRng, RngCore};

use crate::aead::{AeadAlgorithm, Codec};
use crate::error::Result;
use crate::keys::{role::KeyRole, DhSecret, KeyPair, PublicKey, SharedSecret};
use crate::ratchet::{self, ChainKey, MessageKey, RootKey};
use crate::x3dh::Role;

/// Primitives the handshake and a ratchet session need
pub trait CipherSuite {
    /// Suite name for logs
    fn name(&self) -> &'static str;

    /// Generate a fresh key pair for one handshake role
    fn generate_key_pair<R, G>(&self, rng: &mut G) -> Result<KeyPair<R>>
    where
        R: KeyRole,
        G: RngCore + CryptoRng + ?Sized;

    /// Diffie-Hellman between a local secret and a peer public key
    fn diffie_hellman<K, P>(&self, ours: &K, theirs: &PublicKey<P>) -> Result<SharedSecret>
    where
        K: DhSecret + ?Sized,
        P: KeyRole;

    /// Expand combined handshake material into root and chain keys
    fn derive_root_and_chain(&self, ikm: &[u8]) -> Result<(RootKey, ChainKey)>;

    /// One chain step: message key and next chain key
    fn derive_message_key(&self, chain_key: &ChainKey) -> (MessageKey, ChainKey);

    /// Tie a chain message key to the role of the side that sends with it
    fn bind_sender(&self, message_key: MessageKey, sender: Role) -> MessageKey;

    /// Seal one message under a single-use key
    fn encrypt(&self, plaintext: &[u8], aad: &[u8], key: MessageKey) -> Result<String>;

    /// Open one message under a single-use key
    fn decrypt(&self, blob: &str, aad: &[u8], key: MessageKey) -> Result<Vec<u8>>;
}

/// X25519, HKDF/HMAC-SHA256 and a configurable AEAD
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardSuite {
    codec: Codec,
}

impl StandardSuite {
    /// Create with the given AEAD
    pub fn new(algorithm: AeadAlgorithm) -> Self {
        Self {
            codec: Codec::with_algorithm(algorithm),
        }
    }

    /// Configured AEAD
    pub fn algorithm(&self) -> AeadAlgorithm {
        self.codec.algorithm()
    }
}

impl CipherSuite for StandardSuite {
    fn name(&self) -> &'static str {
        match self.codec.algorithm() {
            AeadAlgorithm::Aes256Gcm => "X25519_SHA256_AES256GCM",
            AeadAlgorithm::ChaCha20Poly1305 => "X25519_SHA256_CHACHA20POLY1305",
        }
    }

    fn generate_key_pair<R, G>(&self, rng: &mut G) -> Result<KeyPair<R>>
    where
        R: KeyRole,
        G: RngCore + CryptoRng + ?Sized,
    {
        KeyPair::generate_with_rng(rng)
    }

    fn diffie_hellman<K, P>(&self, ours: &K, theirs: &PublicKey<P>) -> Result<SharedSecret>
    where
        K: DhSecret + ?Sized,
        P: KeyRole,
    {
        ours.agree(theirs)
    }

    fn derive_root_and_chain(&self, ikm: &[u8]) -> Result<(RootKey, ChainKey)> {
        ratchet::derive_root_and_chain(ikm)
    }

    fn derive_message_key(&self, chain_key: &ChainKey) -> (MessageKey, ChainKey) {
        ratchet::derive_message_key(chain_key)
    }

    fn bind_sender(&self, message_key: MessageKey, sender: Role) -> MessageKey {
        ratchet::bind_sender(message_key, sender)
    }

    fn encrypt(&self, plaintext: &[u8], aad: &[u8], key: MessageKey) -> Result<String> {
        self.codec.encrypt_with_aad(plaintext, aad, key)
    }

    fn decrypt(&self, blob: &str, aad: &[u8], key: MessageKey) -> Result<Vec<u8>> {
        self.codec.decrypt_with_aad(blob, aad, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::role;
    use rand::rngs::OsRng;

    #[test]
    fn test_suite_diffie_hellman() {
        let suite = StandardSuite::default();

        let a: KeyPair<role::Ephemeral> = suite.generate_key_pair(&mut OsRng).unwrap();
        let b: KeyPair<role::SignedPreKey> = suite.generate_key_pair(&mut OsRng).unwrap();

        let ab = suite.diffie_hellman(&a, &b.public_key()).unwrap();
        let ba = suite.diffie_hellman(&b, &a.public_key()).unwrap();
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_suite_message_roundtrip() {
        let suite = StandardSuite::new(AeadAlgorithm::ChaCha20Poly1305);
        let (_, chain) = suite.derive_root_and_chain(&[0x24u8; 128]).unwrap();

        let (send_key, _) = suite.derive_message_key(&chain);
        let (recv_key, _) = suite.derive_message_key(&chain);
        let send_key = suite.bind_sender(send_key, Role::Responder);
        let recv_key = suite.bind_sender(recv_key, Role::Responder);

        let blob = suite.encrypt(b"through the suite", b"", send_key).unwrap();
        let plaintext = suite.decrypt(&blob, b"", recv_key).unwrap();
        assert_eq!(plaintext, b"through the suite");
    }

    #[test]
    fn test_suite_name_follows_algorithm() {
        assert_eq!(StandardSuite::default().name(), "X25519_SHA256_AES256GCM");
        assert_eq!(
            StandardSuite::new(AeadAlgorithm::ChaCha20Poly1305).name(),
            "X25519_SHA256_CHACHA20POLY1305"
        );
    }
}
