//! Session state for an established pair
//!
//! A [`Session`] is created from a [`HandshakeOutput`] and owns the root
//! key and the current chain key. Every `send` and `receive` takes one
//! chain step, uses the message key exactly once, and stores the next
//! chain key only if the codec call succeeded. A message that fails
//! authentication leaves the chain where it was.
//!
//! Both participants walk the same chain in lockstep, so messages must be
//! processed in the order they were produced and the two sides must take
//! turns. There is no skipped-key store. Each message key is bound to the
//! sender's [`Role`] before use, so two sends that cross at the same chain
//! position never share a key; the later of the two still fails to open
//! on the other side.
//!
//! `send` and `receive` take `&mut self`; concurrent use of one session
//! goes through [`SharedSession`], which serialises whole ratchet steps.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::SessionConfig;
use crate::error::{CryptoError, Result};
use crate::kdf::domain;
use crate::ratchet::{ChainKey, RootKey};
use crate::suite::{CipherSuite, StandardSuite};
use crate::x3dh::{HandshakeOutput, Role};

/// An established session between two participants
pub struct Session<S: CipherSuite = StandardSuite> {
    suite: S,
    config: SessionConfig,
    role: Role,
    /// Set once at construction, never replaced
    root_key: RootKey,
    chain_key: ChainKey,
    message_count: u64,
    created_at: i64,
}

impl Session<StandardSuite> {
    /// Start a session from handshake output
    pub fn from_handshake(output: HandshakeOutput, config: SessionConfig) -> Result<Self> {
        let suite = StandardSuite::new(config.algorithm);
        Self::with_suite(suite, output, config)
    }

    /// Rebuild a session from state exported by [`Session::export_state`]
    pub fn restore(state: SessionState, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let suite = StandardSuite::new(config.algorithm);

        debug!(
            message_count = state.message_count,
            role = ?state.role,
            suite = suite.name(),
            "Restored session"
        );

        Ok(Self {
            suite,
            config,
            role: state.role,
            root_key: RootKey::from_bytes(state.root_key),
            chain_key: ChainKey::from_bytes(state.chain_key),
            message_count: state.message_count,
            created_at: state.created_at,
        })
    }
}

impl<S: CipherSuite> Session<S> {
    /// Start a session that uses a custom cipher suite
    pub fn with_suite(suite: S, output: HandshakeOutput, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let role = output.role();
        let (root_key, chain_key) = output.into_keys();

        debug!(?role, suite = suite.name(), "Session established");

        Ok(Self {
            suite,
            config,
            role,
            root_key,
            chain_key,
            message_count: 0,
            created_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Encrypt the next message.
    ///
    /// Advances the shared chain, so the peer must receive this message
    /// before sending its own. If both sides send from the same position
    /// the keys differ, but the peer's message can no longer be opened.
    pub fn send(&mut self, plaintext: &[u8]) -> Result<String> {
        self.send_with_aad(plaintext, &[])
    }

    /// Encrypt the next message, authenticating `aad` alongside it
    pub fn send_with_aad(&mut self, plaintext: &[u8], aad: &[u8]) -> Result<String> {
        if plaintext.len() > self.config.max_message_size {
            return Err(CryptoError::MessageTooLarge {
                size: plaintext.len(),
                max: self.config.max_message_size,
            });
        }
        self.check_chain_length()?;

        let (message_key, next_chain_key) = self.suite.derive_message_key(&self.chain_key);
        let message_key = self.suite.bind_sender(message_key, self.role);
        let blob = self.suite.encrypt(plaintext, aad, message_key)?;
        self.commit(next_chain_key);

        debug!(message = self.message_count, size = plaintext.len(), "Encrypted message");
        Ok(blob)
    }

    /// Decrypt the next message
    pub fn receive(&mut self, blob: &str) -> Result<Vec<u8>> {
        self.receive_with_aad(blob, &[])
    }

    /// Decrypt the next message whose metadata was authenticated with `aad`
    pub fn receive_with_aad(&mut self, blob: &str, aad: &[u8]) -> Result<Vec<u8>> {
        self.check_chain_length()?;

        let (message_key, next_chain_key) = self.suite.derive_message_key(&self.chain_key);
        let message_key = self.suite.bind_sender(message_key, self.role.peer());
        let plaintext = match self.suite.decrypt(blob, aad, message_key) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                // next_chain_key is dropped and erased here; state is untouched
                warn!(message = self.message_count + 1, error = %e, "Rejected message");
                return Err(e);
            }
        };
        self.commit(next_chain_key);

        debug!(message = self.message_count, size = plaintext.len(), "Decrypted message");
        Ok(plaintext)
    }

    fn check_chain_length(&self) -> Result<()> {
        if self.message_count >= self.config.max_chain_length {
            return Err(CryptoError::ChainTooLong {
                max: self.config.max_chain_length,
            });
        }
        Ok(())
    }

    /// Replace the chain key; the old value is erased on drop
    fn commit(&mut self, next_chain_key: ChainKey) {
        self.chain_key = next_chain_key;
        self.message_count += 1;
    }

    /// Root key
    pub fn root_key(&self) -> &RootKey {
        &self.root_key
    }

    pub(crate) fn chain_key(&self) -> &ChainKey {
        &self.chain_key
    }

    /// Role this side played in the handshake
    pub fn role(&self) -> Role {
        self.role
    }

    /// Messages sent or received so far
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Public fingerprint of the root key.
    ///
    /// Equal on both sides of a correctly completed handshake; reveals
    /// nothing about the key itself.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(domain::SESSION_FINGERPRINT);
        hasher.update(self.root_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Snapshot of the secret state for the host's secure store
    pub fn export_state(&self) -> SessionState {
        SessionState {
            root_key: *self.root_key.as_bytes(),
            chain_key: *self.chain_key.as_bytes(),
            role: self.role,
            message_count: self.message_count,
            created_at: self.created_at,
        }
    }
}

/// Serialisable session secrets, erased on drop
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SessionState {
    #[serde(with = "hex::serde")]
    root_key: [u8; 32],
    #[serde(with = "hex::serde")]
    chain_key: [u8; 32],
    /// Role this side played in the handshake
    #[zeroize(skip)]
    pub role: Role,
    /// Messages processed before export
    pub message_count: u64,
    /// Creation timestamp (unix seconds)
    pub created_at: i64,
}

impl SessionState {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// A session shared between threads.
///
/// Each call holds the lock for one complete chain step, so no two callers
/// can derive from the same chain key.
pub struct SharedSession<S: CipherSuite = StandardSuite> {
    inner: Arc<Mutex<Session<S>>>,
}

impl<S: CipherSuite> SharedSession<S> {
    /// Wrap a session
    pub fn new(session: Session<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Encrypt the next message
    pub fn send(&self, plaintext: &[u8]) -> Result<String> {
        self.inner.lock().send(plaintext)
    }

    /// Decrypt the next message
    pub fn receive(&self, blob: &str) -> Result<Vec<u8>> {
        self.inner.lock().receive(blob)
    }

    /// Messages sent or received so far
    pub fn message_count(&self) -> u64 {
        self.inner.lock().message_count()
    }

    /// Run `f` with exclusive access to the session
    pub fn with_session<T>(&self, f: impl FnOnce(&mut Session<S>) -> T) -> T {
        let mut session = self.inner.lock();
        f(&mut *session)
    }
}

impl<S: CipherSuite> Clone for SharedSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
