//! RSA identity keys: generation, OAEP key wrapping, PEM interchange, and
//! password-protected private key storage.
//!
//! Public keys travel as SPKI PEM, private keys as PKCS#8 PEM. A private key
//! saved with a password is first DER-encoded, then encrypted with a key
//! derived via PBKDF2-HMAC-SHA256 and AES-256-CBC, and stored as
//! `salt(16) || iv(16) || ciphertext` inside a `PRIVATE KEY` PEM block.

use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// RSA modulus sizes accepted for identity keys.
pub const RSA_KEY_SIZES: [usize; 2] = [2048, 4096];
/// PBKDF2-HMAC-SHA256 iteration count for password-protected keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
/// Salt length for password-protected keys.
pub const SALT_SIZE: usize = 16;
/// AES-CBC IV length for password-protected keys.
pub const IV_SIZE: usize = 16;

const PROTECTED_LABEL: &str = "PRIVATE KEY";
const UNPROTECT_FAILED: &str = "failed to decrypt private key";

/// An RSA identity key pair. Redacted in debug output.
///
/// The private half never leaves this process in plaintext unless the caller
/// explicitly exports it without a password.
pub struct RouterKeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

impl RouterKeyPair {
    /// Rebuilds the pair from a private key, deriving the public half.
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self { private, public }
    }

    /// RSA modulus size in bytes (256 for 2048-bit keys, 512 for 4096-bit).
    pub fn modulus_size(&self) -> usize {
        self.public.size()
    }
}

impl std::fmt::Debug for RouterKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RouterKeyPair([REDACTED])")
    }
}

/// Generates a new RSA key pair; `bits` must be 2048 or 4096.
pub fn generate_keypair(bits: usize) -> CryptoResult<RouterKeyPair> {
    if !RSA_KEY_SIZES.contains(&bits) {
        return Err(CryptoError::KeyGeneration(format!(
            "unsupported RSA key size: {bits} (expected 2048 or 4096)"
        )));
    }
    let private = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| CryptoError::KeyGeneration(format!("RSA generation failed: {e}")))?;
    Ok(RouterKeyPair::from_private(private))
}

/// Wraps a raw symmetric key for a recipient using RSA-OAEP-SHA256.
///
/// The output length equals the recipient's modulus size.
pub fn wrap_key(recipient: &RsaPublicKey, key_bytes: &[u8]) -> CryptoResult<Vec<u8>> {
    recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key_bytes)
        .map_err(|e| CryptoError::Encryption(format!("key wrap failed: {e}")))
}

/// Unwraps an RSA-OAEP-SHA256 wrapped key with the local private key.
pub fn unwrap_key(private: &RsaPrivateKey, wrapped: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
    private
        .decrypt(Oaep::new::<Sha256>(), wrapped)
        .map(Zeroizing::new)
        .map_err(|_| {
            CryptoError::Decryption("key unwrap failed (wrong key or tampered data)".to_string())
        })
}

/// Exports a public key as SPKI PEM.
pub fn export_public_pem(public: &RsaPublicKey) -> CryptoResult<String> {
    public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::Pem(format!("public key export failed: {e}")))
}

/// Imports a public key from SPKI PEM.
pub fn import_public_pem(pem_text: &str) -> CryptoResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem_text)
        .map_err(|e| CryptoError::Pem(format!("public key import failed: {e}")))
}

/// Exports a private key as unencrypted PKCS#8 PEM.
pub fn export_private_pem(private: &RsaPrivateKey) -> CryptoResult<Zeroizing<String>> {
    private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::Pem(format!("private key export failed: {e}")))
}

/// Imports a private key from unencrypted PKCS#8 PEM.
pub fn import_private_pem(pem_text: &str) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem_text)
        .map_err(|e| CryptoError::Pem(format!("private key import failed: {e}")))
}

/// Hex SHA-256 fingerprint of the SPKI DER encoding of a public key.
pub fn public_fingerprint(public: &RsaPublicKey) -> CryptoResult<String> {
    let der = public
        .to_public_key_der()
        .map_err(|e| CryptoError::Pem(format!("public key export failed: {e}")))?;
    Ok(hex::encode(Sha256::digest(der.as_bytes())))
}

/// Encrypts a private key under a password.
///
/// A fresh salt and IV are drawn per call, so protecting the same key twice
/// yields different blobs.
pub fn protect_private_key(private: &RsaPrivateKey, password: &str) -> CryptoResult<String> {
    let der = private
        .to_pkcs8_der()
        .map_err(|e| CryptoError::Pem(format!("private key export failed: {e}")))?;

    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);

    let mut kek = Zeroizing::new([0u8; 32]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut kek[..]);

    let ciphertext =
        Aes256CbcEnc::new((&*kek).into(), (&iv).into()).encrypt_padded_vec_mut::<Pkcs7>(der.as_bytes());

    let mut blob = Vec::with_capacity(SALT_SIZE + IV_SIZE + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);

    Ok(codec::encode_pem_block(PROTECTED_LABEL, &blob))
}

/// Decrypts a password-protected private key.
///
/// A wrong password, a truncated blob, and tampered ciphertext all surface
/// the same generic error; nothing confirms which stage rejected the input.
pub fn unprotect_private_key(pem_text: &str, password: &str) -> CryptoResult<RsaPrivateKey> {
    let blob = codec::decode_pem_block(PROTECTED_LABEL, pem_text)
        .map_err(|_| CryptoError::Decryption(UNPROTECT_FAILED.to_string()))?;
    if blob.len() < SALT_SIZE + IV_SIZE {
        return Err(CryptoError::Decryption(UNPROTECT_FAILED.to_string()));
    }

    let (salt, rest) = blob.split_at(SALT_SIZE);
    let (iv, ciphertext) = rest.split_at(IV_SIZE);

    let mut kek = Zeroizing::new([0u8; 32]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut kek[..]);

    let decryptor = Aes256CbcDec::new_from_slices(&kek[..], iv)
        .map_err(|_| CryptoError::Decryption(UNPROTECT_FAILED.to_string()))?;
    let der = Zeroizing::new(
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::Decryption(UNPROTECT_FAILED.to_string()))?,
    );

    RsaPrivateKey::from_pkcs8_der(&der)
        .map_err(|_| CryptoError::Decryption(UNPROTECT_FAILED.to_string()))
}
