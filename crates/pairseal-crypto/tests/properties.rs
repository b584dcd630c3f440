//! Property tests for the chain step and the codec

use std::collections::HashSet;

use pairseal_crypto::aead::{decrypt, encrypt, Codec};
use pairseal_crypto::prelude::*;
use proptest::prelude::*;
use rand::RngCore;

fn random_chain_key() -> ChainKey {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    ChainKey::from_bytes(bytes)
}

#[test]
fn test_no_collisions_across_random_chain_keys() {
    let mut seen = HashSet::with_capacity(30_000);

    for _ in 0..10_000 {
        let chain_key = random_chain_key();
        let (message_key, next_chain_key) = derive_message_key(&chain_key);

        assert_ne!(message_key.as_bytes(), chain_key.as_bytes());
        assert_ne!(next_chain_key.as_bytes(), chain_key.as_bytes());
        assert_ne!(message_key.as_bytes(), next_chain_key.as_bytes());

        assert!(seen.insert(*message_key.as_bytes()));
        assert!(seen.insert(*next_chain_key.as_bytes()));
    }
}

#[test]
fn test_sequential_message_keys_are_distinct() {
    let mut chain_key = ChainKey::from_bytes([0x5Au8; 32]);
    let mut message_keys = HashSet::with_capacity(10_000);

    for _ in 0..10_000 {
        let (message_key, next_chain_key) = derive_message_key(&chain_key);
        assert!(message_keys.insert(*message_key.as_bytes()));
        chain_key = next_chain_key;
    }

    assert_eq!(message_keys.len(), 10_000);
}

#[test]
fn test_roundtrip_every_length_up_to_10000() {
    let codec = Codec::new();
    let mut plaintext = vec![0u8; 10_000];
    rand::thread_rng().fill_bytes(&mut plaintext);

    for len in (0..=10_000).step_by(97).chain([1, 11, 12, 13, 16, 17, 9_999, 10_000]) {
        let key = [len as u8; 32];
        let blob = codec.encrypt(&plaintext[..len], MessageKey::from_bytes(key)).unwrap();
        let opened = codec.decrypt(&blob, MessageKey::from_bytes(key)).unwrap();
        assert_eq!(opened, &plaintext[..len]);
    }
}

proptest! {
    #[test]
    fn prop_chain_step_is_deterministic(bytes in any::<[u8; 32]>()) {
        let chain_key = ChainKey::from_bytes(bytes);
        let (mk1, next1) = derive_message_key(&chain_key);
        let (mk2, next2) = derive_message_key(&chain_key);

        prop_assert_eq!(mk1, mk2);
        prop_assert_eq!(next1, next2);
    }

    #[test]
    fn prop_roundtrip(
        plaintext in proptest::collection::vec(any::<u8>(), 0..=10_000),
        key in any::<[u8; 32]>(),
    ) {
        let blob = encrypt(&plaintext, MessageKey::from_bytes(key)).unwrap();
        let opened = decrypt(&blob, MessageKey::from_bytes(key)).unwrap();
        prop_assert_eq!(opened, plaintext);
    }

    #[test]
    fn prop_wrong_key_fails_authentication(
        plaintext in proptest::collection::vec(any::<u8>(), 0..512),
        key in any::<[u8; 32]>(),
        other in any::<[u8; 32]>(),
    ) {
        prop_assume!(key != other);

        let blob = encrypt(&plaintext, MessageKey::from_bytes(key)).unwrap();
        let result = decrypt(&blob, MessageKey::from_bytes(other));
        prop_assert!(matches!(result, Err(CryptoError::AuthenticationFailure)));
    }

    #[test]
    fn prop_arbitrary_blobs_never_panic(blob in "[A-Za-z0-9+/=]{0,64}") {
        let result = decrypt(&blob, MessageKey::from_bytes([0x42; 32]));
        prop_assert!(matches!(
            result,
            Err(CryptoError::MalformedCiphertext(_)) | Err(CryptoError::AuthenticationFailure)
        ));
    }
}
