//! Scoped handling of secret byte buffers.
//!
//! [`SecretScope::with`] is the one primitive the rest of the system uses for
//! every transient secret: raw symmetric keys, plaintext payload bytes, and
//! plaintext response bytes. The buffer is zeroed through the injected
//! provider exactly once on every exit path, including panics.
//!
//! The closure runs synchronously. Secrets that must live across await
//! points use zeroize-on-drop containers instead, so task cancellation still
//! wipes them.

use crate::memory::SecureMemory;
use std::sync::Arc;

/// Runs closures over secret buffers and guarantees zeroing afterwards.
#[derive(Clone)]
pub struct SecretScope {
    provider: Arc<dyn SecureMemory>,
}

impl SecretScope {
    pub fn new(provider: Arc<dyn SecureMemory>) -> Self {
        Self { provider }
    }

    /// The provider backing this scope.
    pub fn provider(&self) -> &dyn SecureMemory {
        self.provider.as_ref()
    }

    /// Runs `f` over the buffer, then zeroes it.
    ///
    /// Zeroing happens exactly once whether `f` returns a value, returns an
    /// error, or unwinds.
    pub fn with<R>(&self, secret: &mut [u8], f: impl FnOnce(&[u8]) -> R) -> R {
        let guard = ZeroGuard {
            buf: secret,
            provider: self.provider.as_ref(),
        };
        f(&*guard.buf)
    }
}

impl std::fmt::Debug for SecretScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretScope")
            .field("provider", &self.provider.protection_info().method)
            .finish()
    }
}

struct ZeroGuard<'a> {
    buf: &'a mut [u8],
    provider: &'a dyn SecureMemory,
}

impl Drop for ZeroGuard<'_> {
    fn drop(&mut self) {
        self.provider.zero(self.buf);
    }
}
