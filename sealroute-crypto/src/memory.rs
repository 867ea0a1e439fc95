//! Secure memory capability providers.
//!
//! A [`SecureMemory`] implementation is chosen once at construction and
//! injected; callers stay polymorphic over the capability set and never
//! probe the platform at call time. Zeroing always happens through the
//! `zeroize` crate so the writes cannot be elided.

use serde::Serialize;
use std::sync::Arc;
use zeroize::Zeroize;

/// What a provider can guarantee for secret buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtectionMethod {
    /// Pages are locked against swap while the buffer is zeroed.
    Lock,
    /// Bytes are overwritten with zeros; no page locking.
    ZeroOnly,
    /// No protection at all.
    None,
}

/// Read-only description of a provider's capabilities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProtectionInfo {
    pub can_lock: bool,
    pub platform_secure: bool,
    pub method: ProtectionMethod,
    pub details: String,
}

/// Zeroes secret buffers and reports the platform protection available.
pub trait SecureMemory: Send + Sync {
    /// Overwrites the buffer with zeros.
    fn zero(&self, buf: &mut [u8]);

    /// Describes what this provider guarantees.
    fn protection_info(&self) -> ProtectionInfo;
}

/// Provider that only overwrites buffers; available on every target.
pub struct ZeroOnlyProvider;

impl SecureMemory for ZeroOnlyProvider {
    fn zero(&self, buf: &mut [u8]) {
        buf.zeroize();
    }

    fn protection_info(&self) -> ProtectionInfo {
        ProtectionInfo {
            can_lock: false,
            platform_secure: false,
            method: ProtectionMethod::ZeroOnly,
            details: "zeroize overwrite, no page locking".to_string(),
        }
    }
}

/// Provider that pins buffer pages with `mlock` while zeroing.
///
/// Locking is best effort: if `mlock` fails (RLIMIT_MEMLOCK exhausted, or an
/// unaligned short buffer on an unusual kernel), the buffer is still zeroed.
#[cfg(unix)]
pub struct PageLockProvider;

#[cfg(unix)]
impl SecureMemory for PageLockProvider {
    fn zero(&self, buf: &mut [u8]) {
        if buf.is_empty() {
            return;
        }
        let ptr = buf.as_ptr() as *const libc::c_void;
        let len = buf.len();
        let locked = unsafe { libc::mlock(ptr, len) } == 0;
        buf.zeroize();
        if locked {
            let _ = unsafe { libc::munlock(ptr, len) };
        }
    }

    fn protection_info(&self) -> ProtectionInfo {
        ProtectionInfo {
            can_lock: true,
            platform_secure: true,
            method: ProtectionMethod::Lock,
            details: "mlock page pinning with zeroize overwrite".to_string(),
        }
    }
}

/// Selects the strongest provider the build target offers.
///
/// `secure = false` always yields the zero-only provider; the choice is made
/// here, once, and injected into everything that handles secrets.
pub fn default_provider(secure: bool) -> Arc<dyn SecureMemory> {
    #[cfg(unix)]
    {
        if secure {
            return Arc::new(PageLockProvider);
        }
    }
    #[cfg(not(unix))]
    let _ = secure;
    Arc::new(ZeroOnlyProvider)
}
