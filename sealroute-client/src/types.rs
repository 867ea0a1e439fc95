//! Wire types and protocol constants for the router API.

use serde::{Deserialize, Serialize};

/// Header carrying the opaque request identifier.
pub const HEADER_PAYLOAD_ID: &str = "X-Payload-ID";
/// Header carrying the sender's public key as percent-encoded PEM.
pub const HEADER_PUBLIC_KEY: &str = "X-Public-Key";

/// Router endpoint serving its SPKI public key as PEM bytes.
pub const PUBLIC_KEY_PATH: &str = "/pki/public_key";
/// Router endpoint accepting sealed completion requests.
pub const SECURE_COMPLETION_PATH: &str = "/v1/chat/secure_completion";

/// A decrypted router reply plus the protocol metadata the client attaches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecureResponse {
    /// Identifier the request was submitted under.
    pub request_id: String,
    /// Always true for replies that traveled through the sealed channel.
    pub encrypted: bool,
    /// Envelope algorithm label taken from the reply package.
    pub algorithm: String,
    /// The decrypted response document.
    pub body: serde_json::Value,
}
