//! Crypto error types.

use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Deliberately generic: the message never distinguishes wrong key,
    /// tampered ciphertext, or malformed input.
    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("PEM error: {0}")]
    Pem(String),
}
