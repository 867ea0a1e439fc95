//! Protocol event observation.
//!
//! The engine performs no ambient console output. Anything noteworthy is
//! reported through [`ProtocolObserver`]; [`TracingObserver`] forwards to
//! `tracing` and [`NoopObserver`] discards everything.

use sealroute_crypto::ProtectionInfo;
use tracing::{debug, info, warn};

/// Receives protocol lifecycle notifications.
///
/// Implementations run inline on the request path and must not block.
pub trait ProtocolObserver: Send + Sync {
    /// A fresh identity key pair was generated.
    fn identity_generated(&self, _fingerprint: &str, _bits: usize) {}

    /// An existing identity was loaded from storage.
    fn identity_loaded(&self, _fingerprint: &str) {}

    /// The router URL is plain http and the config explicitly permits it.
    fn insecure_channel(&self, _url: &str) {}

    /// A payload was sealed into an envelope.
    fn payload_sealed(&self, _payload_bytes: usize) {}

    /// A router reply was opened successfully.
    fn response_opened(&self, _request_id: &str) {}

    /// A secure memory provider was selected for this client.
    fn memory_protection(&self, _info: &ProtectionInfo) {}
}

/// Forwards protocol events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl ProtocolObserver for TracingObserver {
    fn identity_generated(&self, fingerprint: &str, bits: usize) {
        info!(fingerprint, bits, "generated client identity");
    }

    fn identity_loaded(&self, fingerprint: &str) {
        info!(fingerprint, "loaded client identity");
    }

    fn insecure_channel(&self, url: &str) {
        warn!(url, "router channel is plain http, continuing because allow_http is set");
    }

    fn payload_sealed(&self, payload_bytes: usize) {
        debug!(payload_bytes, "payload sealed");
    }

    fn response_opened(&self, request_id: &str) {
        debug!(request_id, "response opened");
    }

    fn memory_protection(&self, info: &ProtectionInfo) {
        debug!(method = ?info.method, locked = info.can_lock, "secure memory provider selected");
    }
}

/// Discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl ProtocolObserver for NoopObserver {}
