//! Hybrid encryption layer for SealRoute.
//!
//! Provides the cryptographic core of the secure router protocol:
//! - AES-256-GCM for bulk payload encryption
//! - RSA-OAEP-SHA256 for wrapping the per-request AES key
//! - PBKDF2 + AES-256-CBC for password-protected private key storage
//! - Scoped secret buffers with injectable memory protection
//!
//! # Architecture
//!
//! Every request is sealed under a freshly generated symmetric key; only
//! that key, never the payload, is touched by RSA. The wrapped key rides
//! alongside the ciphertext in an [`EncryptedPackage`], so one wire blob is
//! all a recipient needs.
//!
//! This layering gives per-request forward secrecy: recovering one package's
//! AES key tells an attacker nothing about any other package.
//!
//! All randomness (keys, nonces, salts, IVs) comes from the OS CSPRNG.
//! There is no userspace PRNG fallback anywhere in this crate.

pub mod cipher;
pub mod codec;
pub mod envelope;
mod error;
pub mod keypair;
pub mod memory;
pub mod secret;

pub use cipher::{
    decrypt, encrypt, EncryptedPayload, SymmetricKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE,
};
pub use codec::{b64_decode, b64_encode};
pub use envelope::{
    open_package, seal_package, EncryptedPackage, ENVELOPE_ALGORITHM, ENVELOPE_VERSION,
    KEY_ALGORITHM, PAYLOAD_ALGORITHM,
};
pub use error::{CryptoError, CryptoResult};
pub use keypair::{
    export_private_pem, export_public_pem, generate_keypair, import_private_pem,
    import_public_pem, protect_private_key, public_fingerprint, unprotect_private_key,
    unwrap_key, wrap_key, RouterKeyPair, IV_SIZE, PBKDF2_ITERATIONS, RSA_KEY_SIZES, SALT_SIZE,
};
#[cfg(unix)]
pub use memory::PageLockProvider;
pub use memory::{default_provider, ProtectionInfo, ProtectionMethod, SecureMemory, ZeroOnlyProvider};
pub use secret::SecretScope;

// Key types surfaced so dependents never import the rsa crate directly
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use zeroize::Zeroizing;
