//! X3DH (Extended Triple Diffie-Hellman) Key Agreement
//!
//! Both participants publish a full [`PublicBundle`] and run the handshake
//! against the other's bundle. One side acts as initiator, the other as
//! responder, and each computes four DH values that must match role for
//! role:
//!
//! | #   | Initiator (A)        | Responder (B)        |
//! |-----|----------------------|----------------------|
//! | DH1 | DH(IK_A, SPK_B)      | DH(SPK_B, IK_A)      |
//! | DH2 | DH(EK_A, IK_B)       | DH(IK_B, EK_A)       |
//! | DH3 | DH(EK_A, SPK_B)      | DH(SPK_B, EK_A)      |
//! | DH4 | DH(EK_A, OPK_B)      | DH(OPK_B, EK_A)      |
//!
//! Two sides that both claim the same role still complete the handshake
//! but derive unrelated secrets. [`X3dhHandshake::run`] therefore picks the
//! role deterministically from the identity keys.
//!
//! Output = HKDF-SHA256(DH1 || DH2 || DH3 || DH4) expanded to 64 bytes,
//! split into root key and chain key. Every DH step and the expansion go
//! through a [`CipherSuite`]; [`X3dhHandshake::run`] uses [`StandardSuite`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};
use crate::keys::{IdentityKeySet, PublicBundle, SharedSecret};
use crate::ratchet::{ChainKey, RootKey};
use crate::suite::{CipherSuite, StandardSuite};

/// Which side of the DH table a participant computes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Left column: identity and ephemeral keys against the peer's pre-keys
    Initiator,
    /// Right column: pre-keys against the peer's identity and ephemeral keys
    Responder,
}

impl Role {
    /// Pick a role from the two Ed25519 identity keys.
    ///
    /// The lower key initiates. Both sides reach complementary answers
    /// without exchanging anything beyond their bundles.
    pub fn negotiate(local_identity: &[u8; 32], peer_identity: &[u8; 32]) -> Result<Self> {
        match local_identity.cmp(peer_identity) {
            Ordering::Less => Ok(Role::Initiator),
            Ordering::Greater => Ok(Role::Responder),
            Ordering::Equal => Err(CryptoError::InvalidPublicKey(
                "peer bundle carries the local identity key".to_string(),
            )),
        }
    }

    /// The role the peer must take
    pub fn peer(&self) -> Self {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }
}

/// Result of a completed handshake
pub struct HandshakeOutput {
    root_key: RootKey,
    chain_key: ChainKey,
    role: Role,
}

impl HandshakeOutput {
    /// Root key
    pub fn root_key(&self) -> &RootKey {
        &self.root_key
    }

    /// Initial chain key
    pub fn chain_key(&self) -> &ChainKey {
        &self.chain_key
    }

    /// Role this side played
    pub fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn into_keys(self) -> (RootKey, ChainKey) {
        (self.root_key, self.chain_key)
    }
}

/// X3DH key agreement
pub struct X3dhHandshake;

impl X3dhHandshake {
    /// Run the handshake, negotiating the role from the identity keys
    pub fn run(local: &IdentityKeySet, peer: &PublicBundle) -> Result<HandshakeOutput> {
        Self::run_with_suite(&StandardSuite::default(), local, peer)
    }

    /// Run the handshake in an explicitly assigned role
    pub fn run_as(role: Role, local: &IdentityKeySet, peer: &PublicBundle) -> Result<HandshakeOutput> {
        Self::run_as_with_suite(&StandardSuite::default(), role, local, peer)
    }

    /// Run the handshake through `suite`, negotiating the role
    pub fn run_with_suite<S: CipherSuite>(
        suite: &S,
        local: &IdentityKeySet,
        peer: &PublicBundle,
    ) -> Result<HandshakeOutput> {
        let local_identity = local.identity().public_key().signing_key_bytes();
        let role = Role::negotiate(&local_identity, &peer.identity_key)?;
        Self::run_as_with_suite(suite, role, local, peer)
    }

    /// Run the handshake through `suite` in an explicitly assigned role
    pub fn run_as_with_suite<S: CipherSuite>(
        suite: &S,
        role: Role,
        local: &IdentityKeySet,
        peer: &PublicBundle,
    ) -> Result<HandshakeOutput> {
        let peer_identity = peer.identity()?;

        let dh: [SharedSecret; 4] = match role {
            Role::Initiator => [
                suite.diffie_hellman(local.identity(), &peer.signed_prekey)?,
                suite.diffie_hellman(local.ephemeral(), peer_identity.dh_key())?,
                suite.diffie_hellman(local.ephemeral(), &peer.signed_prekey)?,
                suite.diffie_hellman(local.ephemeral(), &peer.one_time_prekey)?,
            ],
            Role::Responder => [
                suite.diffie_hellman(local.signed_prekey(), peer_identity.dh_key())?,
                suite.diffie_hellman(local.identity(), &peer.ephemeral_key)?,
                suite.diffie_hellman(local.signed_prekey(), &peer.ephemeral_key)?,
                suite.diffie_hellman(local.one_time_prekey(), &peer.ephemeral_key)?,
            ],
        };
        trace!(?role, suite = suite.name(), "Computed 4 DH outputs");

        let (root_key, chain_key) = Self::combine(suite, &dh)?;

        debug!(
            ?role,
            peer = %peer.signed_prekey.short_id(),
            "Handshake complete"
        );

        Ok(HandshakeOutput {
            root_key,
            chain_key,
            role,
        })
    }

    /// Concatenate DH outputs in table order and expand them
    fn combine<S: CipherSuite>(suite: &S, dh: &[SharedSecret; 4]) -> Result<(RootKey, ChainKey)> {
        let mut ikm = Zeroizing::new(Vec::with_capacity(32 * dh.len()));
        for output in dh {
            ikm.extend_from_slice(output.as_bytes());
        }
        suite.derive_root_and_chain(&ikm)
    }
}
