//! # Pairseal Cryptographic Library
//!
//! Two-party session bootstrap for end-to-end encrypted messaging: an
//! X3DH-style handshake that turns four Diffie-Hellman outputs into a root
//! key and a chain key, followed by a one-way HMAC chain that mints a fresh
//! single-use key for every message.
//!
//! ## Security Features
//!
//! - **Forward Secrecy**: the chain only moves forward, and each message key
//!   is erased after one use
//! - **Typed Key Roles**: identity, signed pre-key, one-time pre-key and
//!   ephemeral keys are distinct types
//! - **Point Validation**: low-order peer points abort the handshake
//! - **Scoped Erasure**: every secret type is zeroized on drop
//!
//! ## Core Components
//!
//! - [`keys`]: Key generation and public bundles
//! - [`x3dh`]: Handshake producing root and chain keys
//! - [`ratchet`]: Symmetric chain step
//! - [`aead`]: Message encryption and transport encoding
//! - [`session`]: Per-pair state that ties the above together
//! - [`suite`]: Capability trait the handshake and sessions run through
//!
//! ## Example
//!
//! ```rust
//! use pairseal_crypto::prelude::*;
//!
//! # fn main() -> pairseal_crypto::Result<()> {
//! let alice_keys = IdentityKeySet::generate()?;
//! let bob_keys = IdentityKeySet::generate()?;
//!
//! let alice_out = X3dhHandshake::run(&alice_keys, &bob_keys.public_bundle())?;
//! let bob_out = X3dhHandshake::run(&bob_keys, &alice_keys.public_bundle())?;
//!
//! let mut alice = Session::from_handshake(alice_out, SessionConfig::default())?;
//! let mut bob = Session::from_handshake(bob_out, SessionConfig::default())?;
//!
//! let blob = alice.send(b"Hello, Bob!")?;
//! assert_eq!(bob.receive(&blob)?, b"Hello, Bob!");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod aead;
pub mod config;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod ratchet;
pub mod session;
pub mod suite;
pub mod x3dh;

pub use error::{CryptoError, Result};

/// Default maximum message size in bytes (64 KB)
pub const MAX_MESSAGE_SIZE: usize = 65536;

/// Default number of messages before a new handshake is required
pub const DEFAULT_MAX_CHAIN_LENGTH: u64 = 100_000;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aead::{AeadAlgorithm, Codec};
    pub use crate::config::SessionConfig;
    pub use crate::error::{CryptoError, Result};
    pub use crate::keys::{IdentityKeySet, PublicBundle};
    pub use crate::ratchet::{derive_message_key, ChainKey, MessageKey, RootKey};
    pub use crate::session::{Session, SessionState, SharedSession};
    pub use crate::suite::{CipherSuite, StandardSuite};
    pub use crate::x3dh::{HandshakeOutput, Role, X3dhHandshake};
}
