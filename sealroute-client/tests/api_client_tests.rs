use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sealroute_client::api_client::RouterApiClient;
use sealroute_client::{ClientError, NoopObserver, ProtocolObserver, RouterConfig};
use sealroute_crypto::{import_public_pem, public_fingerprint};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROUTER_PUBLIC_PEM: &str =
    include_str!("../../sealroute-crypto/tests/fixtures/router_rsa4096.pub.pem");

fn test_config(server: &MockServer) -> RouterConfig {
    RouterConfig {
        router_url: server.uri(),
        allow_http: true,
        ..RouterConfig::default()
    }
}

fn client(server: &MockServer) -> RouterApiClient {
    RouterApiClient::new(test_config(server), Arc::new(NoopObserver))
}

#[derive(Default)]
struct CountingObserver {
    insecure: AtomicUsize,
}

impl ProtocolObserver for CountingObserver {
    fn insecure_channel(&self, _url: &str) {
        self.insecure.fetch_add(1, Ordering::SeqCst);
    }
}

// --- Key discovery ---

#[tokio::test]
async fn fetch_public_key_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pki/public_key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ROUTER_PUBLIC_PEM))
        .mount(&server)
        .await;

    let key = client(&server).fetch_public_key().await.unwrap();

    let expected = import_public_pem(ROUTER_PUBLIC_PEM).unwrap();
    assert_eq!(
        public_fingerprint(&key).unwrap(),
        public_fingerprint(&expected).unwrap()
    );
}

#[tokio::test]
async fn fetch_public_key_rejects_invalid_pem() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pki/public_key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("this is not a key"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_public_key().await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidServerResponse(_)));
}

#[tokio::test]
async fn fetch_public_key_maps_error_statuses() {
    let cases: [(u16, fn(&ClientError) -> bool); 7] = [
        (400, |e| matches!(e, ClientError::InvalidRequest(_))),
        (401, |e| matches!(e, ClientError::Authentication(_))),
        (403, |e| matches!(e, ClientError::Authentication(_))),
        (422, |e| matches!(e, ClientError::InvalidRequest(_))),
        (429, |e| matches!(e, ClientError::RateLimit(_))),
        (500, |e| matches!(e, ClientError::Server(_))),
        (503, |e| matches!(e, ClientError::Server(_))),
    ];

    for (status, is_expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pki/public_key"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = client(&server).fetch_public_key().await.unwrap_err();
        assert!(is_expected(&err), "status {status} mapped to {err:?}");
    }
}

// --- Channel policy ---

#[tokio::test]
async fn insecure_channel_blocks_before_network() {
    let server = MockServer::start().await;
    let config = RouterConfig {
        router_url: server.uri(),
        allow_http: false,
        ..RouterConfig::default()
    };
    let api = RouterApiClient::new(config, Arc::new(NoopObserver));

    let err = api.fetch_public_key().await.unwrap_err();
    assert!(matches!(err, ClientError::InsecureChannel(_)));

    let err = api
        .submit_envelope("req-1", "pem", b"envelope".to_vec(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InsecureChannel(_)));

    // Nothing reached the server.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn insecure_opt_in_notifies_once_per_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pki/public_key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ROUTER_PUBLIC_PEM))
        .mount(&server)
        .await;

    let observer = Arc::new(CountingObserver::default());
    let api = RouterApiClient::new(test_config(&server), observer.clone());

    api.fetch_public_key().await.unwrap();
    api.fetch_public_key().await.unwrap();

    assert_eq!(observer.insecure.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn https_url_passes_channel_check_without_notification() {
    let observer = Arc::new(CountingObserver::default());
    let config = RouterConfig {
        router_url: "https://router.sealroute.dev".to_string(),
        allow_http: false,
        ..RouterConfig::default()
    };
    let api = RouterApiClient::new(config, observer.clone());

    api.ensure_secure_channel().unwrap();
    assert_eq!(observer.insecure.load(Ordering::SeqCst), 0);
}

// --- Secure completion ---

#[tokio::test]
async fn submit_envelope_sends_protocol_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/secure_completion"))
        .and(header("X-Payload-ID", "req-42"))
        .and(header("Content-Type", "application/octet-stream"))
        .and(header("Authorization", "Bearer sk-test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"sealed-reply".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let sender_pem = "-----BEGIN PUBLIC KEY-----\nAbC+def/ghi=\n-----END PUBLIC KEY-----\n";
    let reply = client(&server)
        .submit_envelope("req-42", sender_pem, b"envelope-bytes".to_vec(), Some("sk-test-token"))
        .await
        .unwrap();
    assert_eq!(reply, b"sealed-reply");

    let requests = server.received_requests().await.unwrap();
    let request = requests
        .iter()
        .find(|r| r.url.path() == "/v1/chat/secure_completion")
        .unwrap();

    assert_eq!(request.body, b"envelope-bytes");

    // The public key header is percent-encoded and must decode back exactly.
    let encoded = request
        .headers
        .get("X-Public-Key")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(!encoded.contains('+'));
    assert!(!encoded.contains('/'));
    assert!(!encoded.contains('='));
    assert!(!encoded.contains('\n'));
    let decoded = percent_encoding::percent_decode_str(encoded)
        .decode_utf8()
        .unwrap();
    assert_eq!(decoded, sender_pem);
}

#[tokio::test]
async fn submit_envelope_without_credential_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/secure_completion"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
        .mount(&server)
        .await;

    client(&server)
        .submit_envelope("req-1", "pem", b"envelope".to_vec(), None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("Authorization").is_none());
}

#[tokio::test]
async fn submit_envelope_maps_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/secure_completion"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = client(&server)
        .submit_envelope("req-1", "pem", b"envelope".to_vec(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RateLimit(_)));
    assert!(err.to_string().contains("slow down"));
}

// --- Timeouts ---

#[tokio::test]
async fn slow_router_surfaces_as_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pki/public_key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(ROUTER_PUBLIC_PEM)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = RouterConfig {
        request_timeout_secs: 1,
        ..test_config(&server)
    };
    let api = RouterApiClient::new(config, Arc::new(NoopObserver));

    let err = api.fetch_public_key().await.unwrap_err();
    assert!(matches!(err, ClientError::Connection(_)));
    assert!(err.to_string().contains("timed out"));
}
