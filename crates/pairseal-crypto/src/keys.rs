//! Key types and generation for the Pairseal handshake
//!
//! Every participant owns four key pairs, one per handshake role:
//! - Identity key (long-term Ed25519, converted to X25519 for DH)
//! - Signed pre-key (X25519, signed by the identity key)
//! - One-time pre-key (X25519)
//! - Ephemeral key (X25519)
//!
//! Roles are carried in the type system. A `KeyPair<SignedPreKey>` can not
//! be handed to code expecting a `KeyPair<Ephemeral>`, and the same holds
//! for the public halves.

use std::fmt;
use std::marker::PhantomData;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret as X25519StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, Result};
use crate::suite::{CipherSuite, StandardSuite};

/// Size of X25519 public keys in bytes
pub const X25519_PUBLIC_KEY_SIZE: usize = 32;

/// Size of X25519 private keys in bytes
pub const X25519_PRIVATE_KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Handshake roles, used as type parameters on key types
pub mod role {
    /// Marker trait implemented by every handshake role
    pub trait KeyRole: private::Sealed {
        /// Human readable role name, used in errors and logs
        const NAME: &'static str;
    }

    mod private {
        pub trait Sealed {}
    }

    macro_rules! roles {
        ($($(#[$doc:meta])* $name:ident => $label:literal),* $(,)?) => {
            $(
                $(#[$doc])*
                #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
                pub enum $name {}

                impl private::Sealed for $name {}

                impl KeyRole for $name {
                    const NAME: &'static str = $label;
                }
            )*
        };
    }

    roles! {
        /// Long-term identity key
        Identity => "identity",
        /// Medium-term signed pre-key
        SignedPreKey => "signed pre-key",
        /// Single-use pre-key
        OneTimePreKey => "one-time pre-key",
        /// Per-handshake ephemeral key
        Ephemeral => "ephemeral",
    }
}

use role::KeyRole;

/// Fill `N` bytes from the operating system CSPRNG.
///
/// Fails with [`CryptoError::RngFailure`] when the source is unavailable.
pub(crate) fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    random_bytes_from(&mut OsRng)
}

fn random_bytes_from<const N: usize, G: RngCore + CryptoRng + ?Sized>(rng: &mut G) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    rng.try_fill_bytes(&mut bytes)?;
    Ok(bytes)
}

/// An X25519 public key bound to a handshake role
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PublicKey<R> {
    #[serde(with = "hex::serde")]
    bytes: [u8; X25519_PUBLIC_KEY_SIZE],
    #[serde(skip)]
    _role: PhantomData<R>,
}

impl<R: KeyRole> PublicKey<R> {
    /// Wrap raw public key bytes received from a peer
    pub fn from_bytes(bytes: [u8; X25519_PUBLIC_KEY_SIZE]) -> Self {
        Self {
            bytes,
            _role: PhantomData,
        }
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; X25519_PUBLIC_KEY_SIZE] {
        &self.bytes
    }

    /// Short hex identifier, safe to log
    pub fn short_id(&self) -> String {
        hex::encode(&self.bytes[..4])
    }

    fn from_x25519(key: &X25519PublicKey) -> Self {
        Self::from_bytes(*key.as_bytes())
    }

    fn to_x25519(&self) -> X25519PublicKey {
        X25519PublicKey::from(self.bytes)
    }
}

impl<R: KeyRole> fmt::Debug for PublicKey<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey<{}>({})", R::NAME, hex::encode(self.bytes))
    }
}

/// An X25519 key pair bound to a handshake role
///
/// The secret half is erased when the pair is dropped.
pub struct KeyPair<R> {
    secret: X25519StaticSecret,
    public: X25519PublicKey,
    _role: PhantomData<R>,
}

/// Signed pre-key pair
pub type SignedPreKeyPair = KeyPair<role::SignedPreKey>;

/// One-time pre-key pair
pub type OneTimePreKeyPair = KeyPair<role::OneTimePreKey>;

/// Ephemeral key pair
pub type EphemeralKeyPair = KeyPair<role::Ephemeral>;

impl<R: KeyRole> KeyPair<R> {
    /// Generate a new random key pair
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate a key pair from the given random source
    pub fn generate_with_rng<G: RngCore + CryptoRng + ?Sized>(rng: &mut G) -> Result<Self> {
        let seed = Zeroizing::new(random_bytes_from::<X25519_PRIVATE_KEY_SIZE, G>(rng)?);
        Ok(Self::from_secret_bytes(*seed))
    }

    /// Create from existing secret bytes
    ///
    /// # Security
    /// The input bytes should come from a secure random source
    pub fn from_secret_bytes(bytes: [u8; X25519_PRIVATE_KEY_SIZE]) -> Self {
        let secret = X25519StaticSecret::from(bytes);
        let public = X25519PublicKey::from(&secret);
        Self {
            secret,
            public,
            _role: PhantomData,
        }
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey<R> {
        PublicKey::from_x25519(&self.public)
    }

    /// Perform X25519 Diffie-Hellman with a peer key of any role.
    ///
    /// Rejects peer points that produce a non-contributory (low-order) result.
    pub fn diffie_hellman<P: KeyRole>(&self, their_public: &PublicKey<P>) -> Result<SharedSecret> {
        x25519_agree(&self.secret, their_public)
    }
}

/// A local X25519 secret that can take part in a handshake
///
/// Implemented by every role-typed [`KeyPair`] and by [`IdentityKeyPair`],
/// so a [`CipherSuite`] can run all four handshake DH steps through one
/// entry point.
pub trait DhSecret {
    /// Agree with a peer public key of any role
    fn agree<P: KeyRole>(&self, their_public: &PublicKey<P>) -> Result<SharedSecret>;
}

impl<R: KeyRole> DhSecret for KeyPair<R> {
    fn agree<P: KeyRole>(&self, their_public: &PublicKey<P>) -> Result<SharedSecret> {
        x25519_agree(&self.secret, their_public)
    }
}

fn x25519_agree<P: KeyRole>(
    secret: &X25519StaticSecret,
    their_public: &PublicKey<P>,
) -> Result<SharedSecret> {
    let shared = secret.diffie_hellman(&their_public.to_x25519());
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidPublicKey(format!(
            "peer {} key is a low-order point",
            P::NAME
        )));
    }
    Ok(SharedSecret(*shared.as_bytes()))
}

/// A shared secret derived from Diffie-Hellman key exchange
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(pub(crate) [u8; 32]);

impl SharedSecret {
    /// Get the secret bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for SharedSecret {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Identity key pair (Ed25519 for signing, X25519 form for DH)
pub struct IdentityKeyPair {
    signing_key: SigningKey,
    dh_secret: X25519StaticSecret,
}

impl IdentityKeyPair {
    /// Generate a new random identity key pair
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Generate an identity key pair from the given random source
    pub fn generate_with_rng<G: RngCore + CryptoRng + ?Sized>(rng: &mut G) -> Result<Self> {
        let seed = Zeroizing::new(random_bytes_from::<32, G>(rng)?);
        Ok(Self::from_secret_bytes(&seed))
    }

    /// Create from an Ed25519 seed
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let dh_secret = Self::derive_x25519_from_ed25519(&signing_key);
        Self {
            signing_key,
            dh_secret,
        }
    }

    /// Derive the X25519 secret that matches the Ed25519 verifying key
    /// under the Edwards to Montgomery map.
    fn derive_x25519_from_ed25519(signing_key: &SigningKey) -> X25519StaticSecret {
        use sha2::{Digest, Sha512};

        let mut hash = Sha512::digest(signing_key.to_bytes());

        let mut x25519_bytes = Zeroizing::new([0u8; 32]);
        x25519_bytes.copy_from_slice(&hash[..32]);
        hash.as_mut_slice().zeroize();

        x25519_bytes[0] &= 248;
        x25519_bytes[31] &= 127;
        x25519_bytes[31] |= 64;

        X25519StaticSecret::from(*x25519_bytes)
    }

    /// Get the public identity key
    pub fn public_key(&self) -> IdentityPublicKey {
        IdentityPublicKey {
            signing_key: self.signing_key.verifying_key(),
            dh_key: PublicKey::from_x25519(&X25519PublicKey::from(&self.dh_secret)),
        }
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Perform Diffie-Hellman with a peer key of any role
    pub fn diffie_hellman<P: KeyRole>(&self, their_public: &PublicKey<P>) -> Result<SharedSecret> {
        x25519_agree(&self.dh_secret, their_public)
    }
}

impl DhSecret for IdentityKeyPair {
    fn agree<P: KeyRole>(&self, their_public: &PublicKey<P>) -> Result<SharedSecret> {
        x25519_agree(&self.dh_secret, their_public)
    }
}

/// Public identity key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityPublicKey {
    signing_key: VerifyingKey,
    dh_key: PublicKey<role::Identity>,
}

impl IdentityPublicKey {
    /// Decode from Ed25519 public key bytes, deriving the X25519 form
    pub fn from_bytes(ed25519_bytes: &[u8; 32]) -> Result<Self> {
        use curve25519_dalek::edwards::CompressedEdwardsY;

        let signing_key = VerifyingKey::from_bytes(ed25519_bytes)
            .map_err(|_| CryptoError::InvalidPublicKey("invalid Ed25519 identity key".to_string()))?;

        let edwards = CompressedEdwardsY(*ed25519_bytes)
            .decompress()
            .ok_or_else(|| CryptoError::InvalidPublicKey("could not decompress identity point".to_string()))?;

        if edwards.is_small_order() {
            return Err(CryptoError::InvalidPublicKey(
                "identity key is a low-order point".to_string(),
            ));
        }

        let dh_key = PublicKey::from_bytes(edwards.to_montgomery().to_bytes());
        Ok(Self {
            signing_key,
            dh_key,
        })
    }

    /// Ed25519 verifying key
    pub fn signing_key(&self) -> &VerifyingKey {
        &self.signing_key
    }

    /// X25519 form used in the handshake
    pub fn dh_key(&self) -> &PublicKey<role::Identity> {
        &self.dh_key
    }

    /// Get Ed25519 public key bytes
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

/// The four role-distinct key pairs one participant brings to a handshake
pub struct IdentityKeySet {
    identity: IdentityKeyPair,
    signed_prekey: SignedPreKeyPair,
    signed_prekey_signature: [u8; SIGNATURE_SIZE],
    one_time_prekey: OneTimePreKeyPair,
    ephemeral: EphemeralKeyPair,
}

impl IdentityKeySet {
    /// Generate four independent key pairs from the OS random source.
    ///
    /// Aborts with [`CryptoError::RngFailure`] if any of them can not be drawn.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&StandardSuite::default(), &mut OsRng)
    }

    /// Generate from the given random source
    pub fn generate_with_rng<G: RngCore + CryptoRng + ?Sized>(rng: &mut G) -> Result<Self> {
        Self::generate_with(&StandardSuite::default(), rng)
    }

    /// Generate with the given suite and random source.
    ///
    /// The identity key is always Ed25519; the three X25519 pairs come from
    /// [`CipherSuite::generate_key_pair`].
    pub fn generate_with<S, G>(suite: &S, rng: &mut G) -> Result<Self>
    where
        S: CipherSuite,
        G: RngCore + CryptoRng + ?Sized,
    {
        let identity = IdentityKeyPair::generate_with_rng(rng)?;
        let signed_prekey = suite.generate_key_pair(rng)?;
        let one_time_prekey = suite.generate_key_pair(rng)?;
        let ephemeral = suite.generate_key_pair(rng)?;

        Ok(Self::from_parts(identity, signed_prekey, one_time_prekey, ephemeral))
    }

    /// Assemble from existing key pairs, signing the pre-key with the identity key
    pub fn from_parts(
        identity: IdentityKeyPair,
        signed_prekey: SignedPreKeyPair,
        one_time_prekey: OneTimePreKeyPair,
        ephemeral: EphemeralKeyPair,
    ) -> Self {
        let signed_prekey_signature = identity.sign(signed_prekey.public_key().as_bytes());
        Self {
            identity,
            signed_prekey,
            signed_prekey_signature,
            one_time_prekey,
            ephemeral,
        }
    }

    /// Identity key pair
    pub fn identity(&self) -> &IdentityKeyPair {
        &self.identity
    }

    /// Signed pre-key pair
    pub fn signed_prekey(&self) -> &SignedPreKeyPair {
        &self.signed_prekey
    }

    /// One-time pre-key pair
    pub fn one_time_prekey(&self) -> &OneTimePreKeyPair {
        &self.one_time_prekey
    }

    /// Ephemeral key pair
    pub fn ephemeral(&self) -> &EphemeralKeyPair {
        &self.ephemeral
    }

    /// Public halves for publication to a directory
    pub fn public_bundle(&self) -> PublicBundle {
        PublicBundle {
            identity_key: self.identity.public_key().signing_key_bytes(),
            signed_prekey: self.signed_prekey.public_key(),
            signed_prekey_signature: self.signed_prekey_signature,
            one_time_prekey: self.one_time_prekey.public_key(),
            ephemeral_key: self.ephemeral.public_key(),
        }
    }
}

/// Published public keys of one participant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicBundle {
    /// Identity public key (Ed25519)
    #[serde(with = "hex::serde")]
    pub identity_key: [u8; 32],
    /// Signed pre-key
    pub signed_prekey: PublicKey<role::SignedPreKey>,
    /// Identity signature over the signed pre-key bytes
    #[serde(with = "hex::serde")]
    pub signed_prekey_signature: [u8; SIGNATURE_SIZE],
    /// One-time pre-key
    pub one_time_prekey: PublicKey<role::OneTimePreKey>,
    /// Ephemeral key
    pub ephemeral_key: PublicKey<role::Ephemeral>,
}

impl PublicBundle {
    /// Decode the identity key into its signing and DH forms
    pub fn identity(&self) -> Result<IdentityPublicKey> {
        IdentityPublicKey::from_bytes(&self.identity_key)
    }
}
