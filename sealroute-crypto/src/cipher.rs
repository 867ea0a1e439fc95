//! Authenticated symmetric encryption with AES-256-GCM.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce from the OS CSPRNG;
//! there is no API for supplying a nonce from outside, which makes nonce
//! reuse under one key impossible by construction.

use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;
/// AES-GCM nonce size in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;
/// GCM authentication tag size in bytes, appended to the ciphertext tail.
pub const TAG_SIZE: usize = 16;

/// A 256-bit symmetric key. Zeroed on drop, redacted in debug output.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generates a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Imports a key from raw bytes; the input must be exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Exposes the raw key bytes for export or asymmetric wrapping.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

/// AES-256-GCM output: ciphertext with the embedded tag, plus the nonce.
///
/// Serializes with the wire field names `ciphertext` and `nonce`, both
/// base64 strings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedPayload {
    #[serde(with = "codec::base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "codec::base64_bytes")]
    pub nonce: Vec<u8>,
}

/// Encrypts plaintext under the given key with a freshly generated nonce.
///
/// The returned ciphertext carries the 16-byte GCM tag at its tail.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<EncryptedPayload> {
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("payload seal failed: {e}")))?;

    Ok(EncryptedPayload {
        ciphertext,
        nonce: nonce_bytes.to_vec(),
    })
}

/// Decrypts and verifies an [`EncryptedPayload`].
///
/// Tag verification is implicit; any corruption of ciphertext, nonce, or tag
/// fails with the same generic error.
pub fn decrypt(key: &SymmetricKey, payload: &EncryptedPayload) -> CryptoResult<Vec<u8>> {
    if payload.nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: payload.nonce.len(),
        });
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(
            Nonce::from_slice(&payload.nonce),
            payload.ciphertext.as_ref(),
        )
        .map_err(|_| {
            CryptoError::Decryption("payload open failed (wrong key or tampered data)".to_string())
        })
}
