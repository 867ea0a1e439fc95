//! Secure router client for SealRoute.
//!
//! Exchanges arbitrary JSON payloads with a SealRoute router such that
//! payload contents are never observable in transit:
//! - Hybrid sealing per request (fresh AES-256-GCM key, RSA-OAEP wrapped)
//! - Client identity custody with optional on-disk persistence
//! - Channel policy enforced before any bytes leave the process
//! - Structured protocol events through an injectable observer

pub mod api_client;
pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod types;

pub use config::{RouterConfig, DEFAULT_MAX_PAYLOAD_BYTES};
pub use error::{ClientError, ClientResult};
pub use events::{NoopObserver, ProtocolObserver, TracingObserver};
pub use orchestrator::SecureRouterClient;
pub use types::SecureResponse;
