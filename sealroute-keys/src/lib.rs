//! Identity key custody for SealRoute.
//!
//! A [`KeyManager`] owns the client's RSA identity across its lifecycle:
//! `Uninitialized` until material exists, `Ready` once a pair lives in
//! memory, and `Persisted` when the pair is also on durable storage.
//! Storage sits behind the [`KeyStore`] trait so callers choose between
//! on-disk PEM files and an in-memory store.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use sealroute_crypto::{
    export_private_pem, export_public_pem, generate_keypair, import_private_pem,
    import_public_pem, protect_private_key, public_fingerprint, unprotect_private_key,
    CryptoError, RouterKeyPair, RsaPrivateKey, Zeroizing,
};
use thiserror::Error;
use tracing::info;

// ============================================================================
// Error types
// ============================================================================

/// Errors from key lifecycle operations.
#[derive(Debug, Error)]
pub enum KeyError {
    /// An operation needed key material before any was generated or loaded.
    #[error("no key available")]
    NoKeyAvailable,

    #[error("key store error: {0}")]
    Store(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type KeyResult<T> = Result<T, KeyError>;

// ============================================================================
// Key store
// ============================================================================

/// File name of the persisted private half.
pub const PRIVATE_KEY_FILE: &str = "private_key.pem";
/// File name of the persisted public half.
pub const PUBLIC_KEY_FILE: &str = "public_key.pem";

/// Persistence backend for an identity key pair.
///
/// Both halves are stored as PEM text. The private PEM may be a protected
/// block when the caller supplied a password at generation time; the store
/// does not interpret the contents.
pub trait KeyStore: Send + Sync {
    /// Saves both PEM artifacts, replacing any previous pair.
    fn save(&self, private_pem: &str, public_pem: &str) -> KeyResult<()>;

    /// Loads the saved `(private_pem, public_pem)` pair, or `None` when the
    /// store holds no material yet.
    fn load(&self) -> KeyResult<Option<(String, String)>>;

    /// Human-readable location for diagnostics and error messages.
    fn location(&self) -> String;
}

// ============================================================================
// File-backed store
// ============================================================================

/// Stores the key pair as `private_key.pem` and `public_key.pem` under a
/// directory, created on first save.
///
/// On Unix the private key is restricted to `0600`, the public key to
/// `0644` and the directory to `0700`. A failed permission change is
/// logged as a warning, not treated as fatal.
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn private_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    fn public_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }
}

impl KeyStore for FileKeyStore {
    fn save(&self, private_pem: &str, public_pem: &str) -> KeyResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        restrict_permissions(&self.dir, 0o700);

        let private_path = self.private_path();
        write_owner_only(&private_path, private_pem)?;
        restrict_permissions(&private_path, 0o600);

        let public_path = self.public_path();
        std::fs::write(&public_path, public_pem)?;
        restrict_permissions(&public_path, 0o644);

        Ok(())
    }

    fn load(&self) -> KeyResult<Option<(String, String)>> {
        let private_path = self.private_path();
        let public_path = self.public_path();
        if !private_path.exists() || !public_path.exists() {
            return Ok(None);
        }
        let private_pem = std::fs::read_to_string(&private_path)?;
        let public_pem = std::fs::read_to_string(&public_path)?;
        Ok(Some((private_pem, public_pem)))
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Writes the private half with `0600` applied at creation, so the file is
/// never readable by others. A pre-existing file keeps its mode here; the
/// chmod that follows handles that case.
#[cfg(unix)]
fn write_owner_only(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    use tracing::warn;

    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)) {
        warn!(
            path = %path.display(),
            error = %e,
            "failed to restrict key file permissions"
        );
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) {}

// ============================================================================
// In-memory store
// ============================================================================

/// Volatile store for tests and ephemeral identities.
#[derive(Default)]
pub struct MemoryKeyStore {
    slot: RwLock<Option<(String, String)>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts pre-populated, as if a previous session had saved keys.
    pub fn preloaded(private_pem: &str, public_pem: &str) -> Self {
        Self {
            slot: RwLock::new(Some((private_pem.to_string(), public_pem.to_string()))),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn save(&self, private_pem: &str, public_pem: &str) -> KeyResult<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|_| KeyError::Store("key store lock poisoned".to_string()))?;
        *slot = Some((private_pem.to_string(), public_pem.to_string()));
        Ok(())
    }

    fn load(&self) -> KeyResult<Option<(String, String)>> {
        let slot = self
            .slot
            .read()
            .map_err(|_| KeyError::Store("key store lock poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// Key manager
// ============================================================================

/// Lifecycle of the managed identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyState {
    /// No key material exists yet.
    Uninitialized,
    /// A key pair lives in memory only.
    Ready,
    /// The in-memory pair is also on durable storage.
    Persisted,
}

struct Identity {
    pair: RouterKeyPair,
    persisted: bool,
}

/// Owns the client identity key pair and its persistence.
///
/// All accessors return [`KeyError::NoKeyAvailable`] until either
/// [`generate`](KeyManager::generate) or [`load`](KeyManager::load) has
/// installed a pair.
pub struct KeyManager {
    identity: RwLock<Option<Identity>>,
    store: Option<Arc<dyn KeyStore>>,
}

impl KeyManager {
    /// Creates a manager with no key material. Pass a store to enable
    /// persistence; without one only in-memory identities are possible.
    pub fn new(store: Option<Arc<dyn KeyStore>>) -> Self {
        Self {
            identity: RwLock::new(None),
            store,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> KeyState {
        match self.identity.read() {
            Ok(guard) => match guard.as_ref() {
                Some(identity) if identity.persisted => KeyState::Persisted,
                Some(_) => KeyState::Ready,
                None => KeyState::Uninitialized,
            },
            Err(_) => KeyState::Uninitialized,
        }
    }

    /// Generates a fresh RSA pair of `bits` size, replacing any current pair.
    ///
    /// With `persist` the pair is written to the configured store before the
    /// in-memory slot is updated; a `password` additionally wraps the private
    /// half in a protected PEM block.
    pub fn generate(&self, bits: usize, persist: bool, password: Option<&str>) -> KeyResult<()> {
        // Fail on a missing store before the expensive generation step.
        if persist && self.store.is_none() {
            return Err(KeyError::Store("no key store configured".to_string()));
        }
        self.install(generate_keypair(bits)?, persist, password)
    }

    /// Installs an externally generated pair, replacing any current pair.
    ///
    /// Persistence and password protection behave exactly as in
    /// [`generate`](KeyManager::generate). Callers that must keep RSA
    /// generation off their executor produce the pair elsewhere and hand it
    /// over here.
    pub fn install(
        &self,
        pair: RouterKeyPair,
        persist: bool,
        password: Option<&str>,
    ) -> KeyResult<()> {
        let store_for_persist = if persist {
            Some(self.store.as_ref().ok_or_else(|| {
                KeyError::Store("no key store configured".to_string())
            })?)
        } else {
            None
        };

        let fingerprint = public_fingerprint(&pair.public)?;
        let bits = pair.modulus_size() * 8;

        let persisted = if let Some(store) = store_for_persist {
            let public_pem = export_public_pem(&pair.public)?;
            let private_pem = match password {
                Some(password) => Zeroizing::new(protect_private_key(&pair.private, password)?),
                None => export_private_pem(&pair.private)?,
            };
            store.save(&private_pem, &public_pem)?;
            info!(location = %store.location(), "persisted identity key pair");
            true
        } else {
            false
        };

        info!(fingerprint = %fingerprint, bits, "installed identity key pair");

        let mut slot = self
            .identity
            .write()
            .map_err(|_| KeyError::Store("key slot lock poisoned".to_string()))?;
        *slot = Some(Identity { pair, persisted });
        Ok(())
    }

    /// Loads the persisted pair from the configured store.
    ///
    /// A `password` is required when the private half was saved protected.
    /// The stored public half must match the private key; a mismatch means
    /// the store contents were replaced independently and is rejected.
    pub fn load(&self, password: Option<&str>) -> KeyResult<()> {
        let store = self.store.as_ref().ok_or_else(|| {
            KeyError::Store("no key store configured".to_string())
        })?;
        let (private_pem, public_pem) = store.load()?.ok_or_else(|| {
            KeyError::Store(format!("no key material at {}", store.location()))
        })?;
        let private_pem = Zeroizing::new(private_pem);

        let private = match password {
            Some(password) => unprotect_private_key(&private_pem, password)?,
            None => import_private_pem(&private_pem)?,
        };
        let pair = RouterKeyPair::from_private(private);

        let fingerprint = public_fingerprint(&pair.public)?;
        let stored_public = import_public_pem(&public_pem)?;
        if public_fingerprint(&stored_public)? != fingerprint {
            return Err(KeyError::Store(
                "stored public key does not match private key".to_string(),
            ));
        }

        info!(fingerprint = %fingerprint, location = %store.location(), "loaded identity key pair");

        let mut slot = self
            .identity
            .write()
            .map_err(|_| KeyError::Store("key slot lock poisoned".to_string()))?;
        *slot = Some(Identity { pair, persisted: true });
        Ok(())
    }

    /// SPKI PEM of the public half.
    pub fn public_key_pem(&self) -> KeyResult<String> {
        let guard = self
            .identity
            .read()
            .map_err(|_| KeyError::Store("key slot lock poisoned".to_string()))?;
        let identity = guard.as_ref().ok_or(KeyError::NoKeyAvailable)?;
        Ok(export_public_pem(&identity.pair.public)?)
    }

    /// Clone of the private key for decryption.
    pub fn private_key(&self) -> KeyResult<RsaPrivateKey> {
        let guard = self
            .identity
            .read()
            .map_err(|_| KeyError::Store("key slot lock poisoned".to_string()))?;
        let identity = guard.as_ref().ok_or(KeyError::NoKeyAvailable)?;
        Ok(identity.pair.private.clone())
    }

    /// SHA-256 fingerprint of the public half, as lowercase hex.
    pub fn fingerprint(&self) -> KeyResult<String> {
        let guard = self
            .identity
            .read()
            .map_err(|_| KeyError::Store("key slot lock poisoned".to_string()))?;
        let identity = guard.as_ref().ok_or(KeyError::NoKeyAvailable)?;
        Ok(public_fingerprint(&identity.pair.public)?)
    }
}
