//! Secure router client configuration.

use std::path::PathBuf;

use sealroute_crypto::RSA_KEY_SIZES;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Default ceiling on the serialized plaintext payload (10 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for the secure router client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Base URL of the router (e.g., "https://router.sealroute.dev").
    pub router_url: String,

    /// Permits plain-http router URLs. Off by default; every request over
    /// http is reported through the observer once per client.
    pub allow_http: bool,

    /// Selects the page-locking secure memory provider where the platform
    /// offers one; otherwise buffers are zeroed without locking.
    pub secure_memory: bool,

    /// RSA modulus size for the client identity, 2048 or 4096 bits.
    pub key_size: usize,

    /// Upper bound on the serialized plaintext payload in bytes.
    pub max_payload_bytes: usize,

    /// Timeout for router calls, in seconds.
    pub request_timeout_secs: u64,

    /// Directory for the persisted identity key pair. `None` keeps the
    /// identity in memory for the process lifetime only.
    pub key_dir: Option<PathBuf>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            router_url: "https://router.sealroute.dev".to_string(),
            allow_http: false,
            secure_memory: true,
            key_size: 4096,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            request_timeout_secs: 30,
            key_dir: None,
        }
    }
}

impl RouterConfig {
    /// Checks field shapes. The transport scheme is deliberately not
    /// validated here; the channel policy is enforced per request so that
    /// an insecure URL fails as a security error, not a configuration one.
    pub fn validate(&self) -> ClientResult<()> {
        if self.router_url.is_empty() {
            return Err(ClientError::Configuration(
                "router_url must not be empty".to_string(),
            ));
        }
        if !RSA_KEY_SIZES.contains(&self.key_size) {
            return Err(ClientError::Configuration(format!(
                "unsupported key size {}, expected one of {:?}",
                self.key_size, RSA_KEY_SIZES
            )));
        }
        if self.max_payload_bytes == 0 {
            return Err(ClientError::Configuration(
                "max_payload_bytes must be positive".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Configuration(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the router URL uses TLS. The scheme is matched
    /// case-insensitively.
    pub fn is_secure_url(&self) -> bool {
        self.router_url
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
    }
}
