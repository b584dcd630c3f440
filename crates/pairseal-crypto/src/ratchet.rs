//! Symmetric key chain
//!
//! After the handshake a session owns one root key, fixed for its
//! lifetime, and one chain key that advances on every message:
//!
//! ```text
//!   chain_key ──HMAC("message key")────> message_key
//!       │
//!       └─────HMAC("next chain key")──> next chain_key
//! ```
//!
//! Both outputs come from the same chain key under distinct labels, so
//! neither reveals the other or the input. Callers must replace their
//! stored chain key with the returned one; deriving twice from the same
//! stored value re-issues a message key.
//!
//! Before use a session passes the message key through [`bind_sender`]
//! with the role of the sending side. If both participants send from the
//! same chain position, their messages are then sealed under two
//! different keys.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;
use crate::kdf::{constant_time_eq, domain, hmac_sha256, DerivedKey, KeyDerivationContext};
use crate::x3dh::Role;

/// Size of every key in the chain
pub const KEY_SIZE: usize = 32;

macro_rules! secret_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; KEY_SIZE]);

        impl $name {
            /// Get key bytes
            pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                constant_time_eq(&self.0, &other.0)
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(<redacted>)"))
            }
        }
    };
}

secret_key! {
    /// Root key, derived once per session at handshake completion
    RootKey
}

secret_key! {
    /// Chain key, replaced on every message
    ChainKey
}

secret_key! {
    /// Single-use message key.
    ///
    /// Not `Clone`: the codec consumes it by value, so one key can encrypt
    /// or decrypt exactly one message before it is erased.
    MessageKey
}

impl RootKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl ChainKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Clone for ChainKey {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl MessageKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

/// Derive the message key and the next chain key from `chain_key`.
///
/// Deterministic; each output is an independent HMAC of the same input.
pub fn derive_message_key(chain_key: &ChainKey) -> (MessageKey, ChainKey) {
    let message_key = MessageKey(hmac_sha256(&chain_key.0, domain::MESSAGE_KEY));
    let next_chain_key = ChainKey(hmac_sha256(&chain_key.0, domain::NEXT_CHAIN_KEY));
    (message_key, next_chain_key)
}

/// Derive the key a message from `sender` is sealed under.
///
/// The chain message key is consumed and erased.
pub fn bind_sender(message_key: MessageKey, sender: Role) -> MessageKey {
    let label = match sender {
        Role::Initiator => domain::SENDER_INITIATOR,
        Role::Responder => domain::SENDER_RESPONDER,
    };
    MessageKey(hmac_sha256(&message_key.0, label))
}

/// Expand combined handshake key material into the root and first chain key.
///
/// HKDF-SHA256 without salt, 64 bytes of output: root key first, chain key second.
pub fn derive_root_and_chain(ikm: &[u8]) -> Result<(RootKey, ChainKey)> {
    let kdf = KeyDerivationContext::new(None, ikm);
    let okm: DerivedKey<{ 2 * KEY_SIZE }> = kdf.derive(domain::ROOT_AND_CHAIN)?;

    let mut root = [0u8; KEY_SIZE];
    let mut chain = [0u8; KEY_SIZE];
    root.copy_from_slice(&okm.as_bytes()[..KEY_SIZE]);
    chain.copy_from_slice(&okm.as_bytes()[KEY_SIZE..]);

    Ok((RootKey(root), ChainKey(chain)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_step_is_deterministic() {
        let chain_key = ChainKey::from_bytes([0x42u8; 32]);

        let (mk1, next1) = derive_message_key(&chain_key);
        let (mk2, next2) = derive_message_key(&chain_key);

        assert_eq!(mk1, mk2);
        assert_eq!(next1, next2);
    }

    #[test]
    fn test_chain_step_outputs_are_distinct() {
        let chain_key = ChainKey::from_bytes([0x42u8; 32]);
        let (message_key, next_chain_key) = derive_message_key(&chain_key);

        assert_ne!(message_key.as_bytes(), next_chain_key.as_bytes());
        assert_ne!(message_key.as_bytes(), chain_key.as_bytes());
        assert_ne!(next_chain_key, chain_key);
    }

    #[test]
    fn test_outputs_are_independent_labels() {
        // Neither output is the other fed back through the chain
        let chain_key = ChainKey::from_bytes([0x07u8; 32]);
        let (message_key, next_chain_key) = derive_message_key(&chain_key);

        let (from_message, _) = derive_message_key(&ChainKey::from_bytes(*message_key.as_bytes()));
        let (_, from_next) = derive_message_key(&next_chain_key);

        assert_ne!(from_message.as_bytes(), next_chain_key.as_bytes());
        assert_ne!(from_next.as_bytes(), message_key.as_bytes());
    }

    #[test]
    fn test_sender_binding_separates_roles() {
        let chain_key = ChainKey::from_bytes([0x42u8; 32]);

        let as_initiator = bind_sender(derive_message_key(&chain_key).0, Role::Initiator);
        let as_responder = bind_sender(derive_message_key(&chain_key).0, Role::Responder);
        let (raw, _) = derive_message_key(&chain_key);

        assert_ne!(as_initiator, as_responder);
        assert_ne!(as_initiator, raw);
        assert_eq!(
            as_initiator,
            bind_sender(derive_message_key(&chain_key).0, Role::Initiator)
        );
    }

    #[test]
    fn test_root_and_chain_split() {
        let ikm = [0x11u8; 128];
        let (root, chain) = derive_root_and_chain(&ikm).unwrap();

        assert_ne!(root.as_bytes(), chain.as_bytes());
        assert_ne!(root.as_bytes(), &[0u8; 32]);

        let (root_again, chain_again) = derive_root_and_chain(&ikm).unwrap();
        assert_eq!(root, root_again);
        assert_eq!(chain, chain_again);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let key = MessageKey::from_bytes([0xAB; 32]);
        assert_eq!(format!("{:?}", key), "MessageKey(<redacted>)");
    }
}
