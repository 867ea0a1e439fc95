use sealroute_crypto::cipher::{decrypt, encrypt, EncryptedPayload, SymmetricKey};
use sealroute_crypto::{CryptoError, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use std::collections::HashSet;

#[test]
fn encrypt_decrypt_roundtrip() {
    let key = SymmetricKey::generate();
    let plaintext = b"the payload never touches the wire in the clear";

    let payload = encrypt(&key, plaintext).unwrap();
    let recovered = decrypt(&key, &payload).unwrap();

    assert_eq!(recovered, plaintext);
}

#[test]
fn empty_plaintext_roundtrips() {
    let key = SymmetricKey::generate();

    let payload = encrypt(&key, b"").unwrap();
    // Even an empty message carries the full authentication tag
    assert_eq!(payload.ciphertext.len(), TAG_SIZE);

    assert_eq!(decrypt(&key, &payload).unwrap(), b"");
}

#[test]
fn large_plaintext_roundtrips() {
    let key = SymmetricKey::generate();
    let plaintext = vec![0x5Au8; 1024 * 1024];

    let payload = encrypt(&key, &plaintext).unwrap();
    assert_eq!(payload.ciphertext.len(), plaintext.len() + TAG_SIZE);

    assert_eq!(decrypt(&key, &payload).unwrap(), plaintext);
}

#[test]
fn ciphertext_embeds_tag_at_tail() {
    let key = SymmetricKey::generate();
    let plaintext = b"tag position check";

    let payload = encrypt(&key, plaintext).unwrap();
    assert_eq!(payload.ciphertext.len(), plaintext.len() + TAG_SIZE);
    assert_eq!(payload.nonce.len(), NONCE_SIZE);
}

#[test]
fn key_import_rejects_wrong_lengths() {
    for len in [0usize, 16, 31, 33, 64] {
        let err = SymmetricKey::from_bytes(&vec![0u8; len]).unwrap_err();
        match err {
            CryptoError::InvalidKeyLength { expected, actual } => {
                assert_eq!(expected, KEY_SIZE);
                assert_eq!(actual, len);
            }
            other => panic!("expected InvalidKeyLength, got {other:?}"),
        }
    }
}

#[test]
fn key_export_import_roundtrip() {
    let key = SymmetricKey::generate();
    let exported = *key.as_bytes();

    let imported = SymmetricKey::from_bytes(&exported).unwrap();
    let payload = encrypt(&key, b"cross-key check").unwrap();

    assert_eq!(decrypt(&imported, &payload).unwrap(), b"cross-key check");
}

#[test]
fn key_debug_is_redacted() {
    let key = SymmetricKey::from_bytes(&[0xAB; KEY_SIZE]).unwrap();
    let debug = format!("{key:?}");

    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains("ab"));
    assert!(!debug.contains("171"));
}

#[test]
fn nonces_are_unique_across_10000_encryptions() {
    let key = SymmetricKey::generate();
    let mut seen = HashSet::with_capacity(10_000);

    for _ in 0..10_000 {
        let payload = encrypt(&key, b"x").unwrap();
        assert!(
            seen.insert(payload.nonce.clone()),
            "nonce reused under the same key"
        );
    }
}

#[test]
fn same_plaintext_encrypts_differently() {
    let key = SymmetricKey::generate();

    let p1 = encrypt(&key, b"identical input").unwrap();
    let p2 = encrypt(&key, b"identical input").unwrap();

    assert_ne!(p1.nonce, p2.nonce);
    assert_ne!(p1.ciphertext, p2.ciphertext);
}

#[test]
fn wrong_key_fails_decrypt() {
    let key = SymmetricKey::generate();
    let other = SymmetricKey::generate();

    let payload = encrypt(&key, b"for the right key only").unwrap();
    assert!(decrypt(&other, &payload).is_err());
}

#[test]
fn every_single_bit_flip_in_ciphertext_is_detected() {
    let key = SymmetricKey::generate();
    let payload = encrypt(&key, b"tamper evidence across body and tag").unwrap();

    // Covers the message body and the appended tag
    for byte_idx in 0..payload.ciphertext.len() {
        for bit in 0..8 {
            let mut tampered = payload.clone();
            tampered.ciphertext[byte_idx] ^= 1 << bit;

            assert!(
                decrypt(&key, &tampered).is_err(),
                "bit {bit} of byte {byte_idx} flipped undetected"
            );
        }
    }
}

#[test]
fn every_single_bit_flip_in_nonce_is_detected() {
    let key = SymmetricKey::generate();
    let payload = encrypt(&key, b"nonce tamper check").unwrap();

    for byte_idx in 0..payload.nonce.len() {
        for bit in 0..8 {
            let mut tampered = payload.clone();
            tampered.nonce[byte_idx] ^= 1 << bit;

            assert!(
                decrypt(&key, &tampered).is_err(),
                "nonce bit {bit} of byte {byte_idx} flipped undetected"
            );
        }
    }
}

#[test]
fn truncated_ciphertext_fails() {
    let key = SymmetricKey::generate();
    let payload = encrypt(&key, b"truncation check").unwrap();

    for keep in [0usize, 1, TAG_SIZE - 1, TAG_SIZE] {
        let mut truncated = payload.clone();
        truncated.ciphertext.truncate(keep);
        assert!(decrypt(&key, &truncated).is_err(), "kept {keep} bytes");
    }
}

#[test]
fn wrong_nonce_length_is_rejected_before_decrypt() {
    let key = SymmetricKey::generate();
    let mut payload = encrypt(&key, b"nonce length check").unwrap();
    payload.nonce.pop();

    match decrypt(&key, &payload).unwrap_err() {
        CryptoError::InvalidNonceLength { expected, actual } => {
            assert_eq!(expected, NONCE_SIZE);
            assert_eq!(actual, NONCE_SIZE - 1);
        }
        other => panic!("expected InvalidNonceLength, got {other:?}"),
    }
}

#[test]
fn payload_serializes_as_base64_strings() {
    let key = SymmetricKey::generate();
    let payload = encrypt(&key, b"wire shape").unwrap();

    let value = serde_json::to_value(&payload).unwrap();
    assert!(value["ciphertext"].is_string());
    assert!(value["nonce"].is_string());

    let parsed: EncryptedPayload = serde_json::from_value(value).unwrap();
    assert_eq!(decrypt(&key, &parsed).unwrap(), b"wire shape");
}

// Property-based tests
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn encrypt_decrypt_always_roundtrips(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let key = SymmetricKey::generate();
            let payload = encrypt(&key, &data).unwrap();
            prop_assert_eq!(decrypt(&key, &payload).unwrap(), data);
        }
    }
}
