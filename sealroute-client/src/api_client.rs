//! HTTP client for the router's PKI and secure completion endpoints.
//!
//! Enforces the channel policy before any bytes leave the process and maps
//! router status codes onto the client error taxonomy. Uses reqwest with
//! rustls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use sealroute_crypto::{import_public_pem, RsaPublicKey};
use tracing::debug;

use crate::config::RouterConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::ProtocolObserver;
use crate::types::{
    HEADER_PAYLOAD_ID, HEADER_PUBLIC_KEY, PUBLIC_KEY_PATH, SECURE_COMPLETION_PATH,
};

/// Characters sent verbatim in the public key header. Everything outside
/// this set is percent-encoded, matching the unreserved set of RFC 3986
/// plus the marks that survive `encodeURIComponent`.
const HEADER_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// HTTP client for the SealRoute router.
pub struct RouterApiClient {
    client: Client,
    config: RouterConfig,
    observer: Arc<dyn ProtocolObserver>,
    /// Set after the first insecure-channel notification so the warning
    /// fires once per client, not once per request.
    insecure_notified: AtomicBool,
}

impl RouterApiClient {
    pub fn new(config: RouterConfig, observer: Arc<dyn ProtocolObserver>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            config,
            observer,
            insecure_notified: AtomicBool::new(false),
        }
    }

    /// Rejects plain-http router URLs unless the config explicitly opted
    /// in. Runs before every request so nothing is transmitted on a channel
    /// the caller did not accept.
    pub fn ensure_secure_channel(&self) -> ClientResult<()> {
        if self.config.is_secure_url() {
            return Ok(());
        }
        if !self.config.allow_http {
            return Err(ClientError::InsecureChannel(self.config.router_url.clone()));
        }
        if !self.insecure_notified.swap(true, Ordering::Relaxed) {
            self.observer.insecure_channel(&self.config.router_url);
        }
        Ok(())
    }

    // ── Key discovery ──

    /// Fetches and validates the router's SPKI public key PEM.
    pub async fn fetch_public_key(&self) -> ClientResult<RsaPublicKey> {
        self.ensure_secure_channel()?;

        let url = format!("{}{}", self.config.router_url, PUBLIC_KEY_PATH);
        let resp = self.client.get(&url).send().await?;
        let resp = check_status(resp).await?;

        let pem = resp.text().await?;
        let key = import_public_pem(&pem).map_err(|e| {
            ClientError::InvalidServerResponse(format!(
                "router public key is not valid SPKI PEM: {e}"
            ))
        })?;

        debug!("fetched router public key ({} PEM bytes)", pem.len());
        Ok(key)
    }

    // ── Secure completion ──

    /// Submits a sealed envelope and returns the raw reply body.
    ///
    /// The sender's public key travels percent-encoded in a header so the
    /// router can seal its reply without a second round trip.
    pub async fn submit_envelope(
        &self,
        request_id: &str,
        sender_public_pem: &str,
        envelope: Vec<u8>,
        bearer: Option<&str>,
    ) -> ClientResult<Vec<u8>> {
        self.ensure_secure_channel()?;

        let url = format!("{}{}", self.config.router_url, SECURE_COMPLETION_PATH);
        let encoded_key = utf8_percent_encode(sender_public_pem, HEADER_ENCODE_SET).to_string();

        let mut request = self
            .client
            .post(&url)
            .header(HEADER_PAYLOAD_ID, request_id)
            .header(HEADER_PUBLIC_KEY, encoded_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(envelope);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let resp = check_status(resp).await?;

        Ok(resp.bytes().await?.to_vec())
    }
}

/// Maps router status codes onto the error taxonomy. These concern the
/// outer HTTP exchange, never payload confidentiality.
async fn check_status(resp: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Authentication(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ClientError::InvalidRequest(detail)
        }
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimit(detail),
        _ => ClientError::Server(detail),
    })
}
