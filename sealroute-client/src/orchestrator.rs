//! Request/response envelope orchestration.
//!
//! [`SecureRouterClient`] composes identity custody, hybrid sealing, and
//! the router transport: ensure an identity exists, seal the payload for
//! the router, submit it, and open the sealed reply. No state is carried
//! between requests beyond the identity itself.

use std::sync::Arc;

use sealroute_crypto::{
    default_provider, generate_keypair, open_package, seal_package, EncryptedPackage, SecretScope,
    Zeroizing,
};
use sealroute_keys::{FileKeyStore, KeyError, KeyManager, KeyState, KeyStore};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::api_client::RouterApiClient;
use crate::config::RouterConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::{ProtocolObserver, TracingObserver};
use crate::types::SecureResponse;

/// End-to-end encrypted client for the SealRoute router.
pub struct SecureRouterClient {
    api: RouterApiClient,
    keys: KeyManager,
    secrets: SecretScope,
    observer: Arc<dyn ProtocolObserver>,
    config: RouterConfig,
    /// Serializes identity initialization so concurrent first requests
    /// cannot generate two key pairs for one identity.
    init_lock: Mutex<()>,
}

impl SecureRouterClient {
    /// Builds a client reporting protocol events to `tracing`.
    pub fn new(config: RouterConfig) -> ClientResult<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Builds a client reporting protocol events to `observer`.
    pub fn with_observer(
        config: RouterConfig,
        observer: Arc<dyn ProtocolObserver>,
    ) -> ClientResult<Self> {
        config.validate()?;

        let secrets = SecretScope::new(default_provider(config.secure_memory));
        observer.memory_protection(&secrets.provider().protection_info());

        let store: Option<Arc<dyn KeyStore>> = config
            .key_dir
            .as_ref()
            .map(|dir| Arc::new(FileKeyStore::new(dir.clone())) as Arc<dyn KeyStore>);
        let keys = KeyManager::new(store);

        let api = RouterApiClient::new(config.clone(), observer.clone());

        Ok(Self {
            api,
            keys,
            secrets,
            observer,
            config,
            init_lock: Mutex::new(()),
        })
    }

    /// Current state of the client identity.
    pub fn key_state(&self) -> KeyState {
        self.keys.state()
    }

    /// SPKI PEM of the client identity's public half.
    pub fn public_key_pem(&self) -> ClientResult<String> {
        self.keys.public_key_pem().map_err(key_err)
    }

    /// Loads the persisted identity or generates a fresh one.
    ///
    /// Safe to call concurrently: the first caller performs the transition,
    /// later callers observe the installed identity.
    pub async fn ensure_identity(&self) -> ClientResult<()> {
        if self.keys.state() != KeyState::Uninitialized {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        // A concurrent caller may have finished while we waited.
        if self.keys.state() != KeyState::Uninitialized {
            return Ok(());
        }

        let persist = self.config.key_dir.is_some();
        if persist {
            match self.keys.load(None) {
                Ok(()) => {
                    let fingerprint = self.keys.fingerprint().map_err(key_err)?;
                    self.observer.identity_loaded(&fingerprint);
                    return Ok(());
                }
                Err(e) => {
                    debug!("no usable persisted identity ({e}), generating");
                }
            }
        }

        // RSA generation takes seconds at 4096 bits; run it on the blocking
        // pool so executor threads keep serving other tasks.
        let bits = self.config.key_size;
        let pair = tokio::task::spawn_blocking(move || generate_keypair(bits))
            .await
            .map_err(|e| ClientError::Configuration(format!("key generation task failed: {e}")))?
            .map_err(|e| key_err(e.into()))?;
        self.keys.install(pair, persist, None).map_err(key_err)?;

        let fingerprint = self.keys.fingerprint().map_err(key_err)?;
        self.observer
            .identity_generated(&fingerprint, self.config.key_size);
        Ok(())
    }

    /// Seals `payload` into wire envelope bytes for the router.
    ///
    /// The serialized plaintext sits in a zeroize-on-drop buffer while the
    /// router key fetch is awaited, so cancelling the request mid-fetch
    /// still wipes it; the secret scope zeroes it once sealing finishes.
    pub async fn encrypt_payload(&self, payload: &Value) -> ClientResult<Vec<u8>> {
        self.ensure_identity().await?;

        let mut plaintext = Zeroizing::new(serde_json::to_vec(payload).map_err(|e| {
            ClientError::Configuration(format!("payload serialization failed: {e}"))
        })?);
        if plaintext.len() > self.config.max_payload_bytes {
            return Err(ClientError::PayloadTooLarge {
                size: plaintext.len(),
                limit: self.config.max_payload_bytes,
            });
        }

        let router_key = self.api.fetch_public_key().await?;

        let package = self
            .secrets
            .with(&mut plaintext, |bytes| {
                seal_package(&router_key, &self.secrets, bytes)
            })
            .map_err(|e| ClientError::Configuration(format!("payload encryption failed: {e}")))?;
        let envelope = package
            .to_bytes()
            .map_err(|e| ClientError::Configuration(format!("envelope serialization failed: {e}")))?;

        self.observer.payload_sealed(plaintext.len());
        Ok(envelope)
    }

    /// Opens a sealed router reply and attaches the protocol metadata.
    ///
    /// Outer structure problems surface as [`ClientError::MalformedPackage`];
    /// once decryption starts, every failure collapses into the one generic
    /// [`ClientError::Security`].
    pub fn decrypt_response(&self, body: &[u8], request_id: &str) -> ClientResult<SecureResponse> {
        let package = EncryptedPackage::from_bytes(body)
            .map_err(|e| ClientError::MalformedPackage(e.to_string()))?;

        let private = self.keys.private_key().map_err(key_err)?;

        let mut plaintext = open_package(&private, &self.secrets, &package)
            .map_err(ClientError::security)?;
        let document = self
            .secrets
            .with(&mut plaintext, |bytes| serde_json::from_slice::<Value>(bytes))
            .map_err(ClientError::security)?;

        self.observer.response_opened(request_id);
        Ok(SecureResponse {
            request_id: request_id.to_string(),
            encrypted: true,
            algorithm: package.algorithm,
            body: document,
        })
    }

    /// Seals `payload`, submits it under `request_id`, and opens the reply.
    pub async fn send_secure_request(
        &self,
        payload: &Value,
        request_id: &str,
        bearer: Option<&str>,
    ) -> ClientResult<SecureResponse> {
        let envelope = self.encrypt_payload(payload).await?;
        let public_pem = self.keys.public_key_pem().map_err(key_err)?;

        let body = self
            .api
            .submit_envelope(request_id, &public_pem, envelope, bearer)
            .await?;

        self.decrypt_response(&body, request_id)
    }

    /// Sends with a freshly generated request identifier.
    pub async fn send(&self, payload: &Value, bearer: Option<&str>) -> ClientResult<SecureResponse> {
        let request_id = Uuid::new_v4().to_string();
        self.send_secure_request(payload, &request_id, bearer).await
    }
}

/// Key custody failures indicate setup mistakes, not attacks.
fn key_err(e: KeyError) -> ClientError {
    ClientError::Configuration(e.to_string())
}
