//! The hybrid wire envelope.
//!
//! Each package carries an AES-256-GCM encrypted payload plus the AES key
//! wrapped with the recipient's RSA-OAEP-SHA256 public key. Every seal draws
//! a fresh symmetric key, so compromising one package never exposes another.
//!
//! Field names and algorithm labels are fixed by the router protocol and
//! must not change.

use crate::cipher::{self, EncryptedPayload, SymmetricKey};
use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use crate::keypair;
use crate::secret::SecretScope;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

/// Envelope schema version.
pub const ENVELOPE_VERSION: &str = "1.0";
/// Hybrid scheme label.
pub const ENVELOPE_ALGORITHM: &str = "hybrid-aes256-rsa4096";
/// Key-wrap algorithm label.
pub const KEY_ALGORITHM: &str = "RSA-OAEP-SHA256";
/// Payload cipher label.
pub const PAYLOAD_ALGORITHM: &str = "AES-256-GCM";

/// Wire envelope exchanged with the router. All six fields are required;
/// byte fields travel as base64 strings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedPackage {
    pub version: String,
    pub algorithm: String,
    pub encrypted_payload: EncryptedPayload,
    #[serde(with = "codec::base64_bytes")]
    pub encrypted_aes_key: Vec<u8>,
    pub key_algorithm: String,
    pub payload_algorithm: String,
}

impl EncryptedPackage {
    fn assemble(encrypted_payload: EncryptedPayload, encrypted_aes_key: Vec<u8>) -> Self {
        Self {
            version: ENVELOPE_VERSION.to_string(),
            algorithm: ENVELOPE_ALGORITHM.to_string(),
            encrypted_payload,
            encrypted_aes_key,
            key_algorithm: KEY_ALGORITHM.to_string(),
            payload_algorithm: PAYLOAD_ALGORITHM.to_string(),
        }
    }

    /// Serializes the package to JSON bytes.
    pub fn to_bytes(&self) -> CryptoResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| CryptoError::Encoding(format!("package serialization failed: {e}")))
    }

    /// Parses a package from JSON bytes; any missing field is an error.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| CryptoError::Encoding(format!("package parse failed: {e}")))
    }
}

/// Seals plaintext for a recipient: fresh AES key, AEAD encrypt, RSA wrap.
///
/// The raw AES key bytes live inside the secret scope for the duration of
/// the wrap and are zeroed before this returns.
pub fn seal_package(
    recipient: &RsaPublicKey,
    secrets: &SecretScope,
    plaintext: &[u8],
) -> CryptoResult<EncryptedPackage> {
    let key = SymmetricKey::generate();
    let encrypted_payload = cipher::encrypt(&key, plaintext)?;

    let mut raw_key = key.as_bytes().to_vec();
    let encrypted_aes_key = secrets.with(&mut raw_key, |raw| keypair::wrap_key(recipient, raw))?;

    Ok(EncryptedPackage::assemble(
        encrypted_payload,
        encrypted_aes_key,
    ))
}

/// Opens a package with the local private key.
///
/// The unwrapped AES key bytes are scoped and zeroed before this returns.
/// Unwrap and decrypt failures share one generic error shape so callers
/// cannot tell which stage rejected the package.
pub fn open_package(
    private: &RsaPrivateKey,
    secrets: &SecretScope,
    package: &EncryptedPackage,
) -> CryptoResult<Vec<u8>> {
    let mut raw_key = keypair::unwrap_key(private, &package.encrypted_aes_key)?;
    let key = secrets.with(&mut raw_key, |raw| SymmetricKey::from_bytes(raw))?;
    cipher::decrypt(&key, &package.encrypted_payload)
}
