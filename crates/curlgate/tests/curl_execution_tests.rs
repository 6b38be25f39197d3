//! Curl execution tests against a local echo server
//!
//! The echo server reflects method, path, headers and body as JSON so each
//! test can check exactly what went over the wire. TLS tests run against a
//! local listener with a freshly generated self-signed certificate.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Redirect;
use axum::routing::{any, get};
use axum::{Json, Router};
use curlgate::{ClientLimits, CurlEngine, Error, HttpClient};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::TlsAcceptor;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                v.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn chunked() -> Body {
    let chunks = (0..8).map(|_| Ok::<_, std::io::Error>(Bytes::from(vec![b'y'; 512])));
    Body::from_stream(futures_util::stream::iter(chunks))
}

/// Start the echo server and return its base URL.
async fn spawn_echo() -> String {
    let app = Router::new()
        .route("/big", get(|| async { "x".repeat(4096) }))
        .route("/chunked", get(chunked))
        .route("/redirect", any(|| async { Redirect::to("/landing") }))
        .route("/temporary", any(|| async { Redirect::temporary("/landing") }))
        .route("/loop", any(|| async { Redirect::to("/loop") }))
        .fallback(echo);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Start an HTTPS server whose certificate no root store trusts.
///
/// It answers every request that completes the handshake with `secure`.
async fn spawn_self_signed() -> String {
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let params =
        rcgen::CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])
            .unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![cert.der().clone()], key)
    .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                // Verifying clients abort the handshake
                let Ok(mut stream) = acceptor.accept(tcp).await else {
                    return;
                };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-length: 6\r\nconnection: close\r\n\r\nsecure",
                    )
                    .await;
                let _ = stream.shutdown().await;
            });
        }
    });
    format!("https://{addr}")
}

/// Header names the echo server saw, minus the ones the transport must add.
fn header_names(echoed: &Value) -> BTreeSet<String> {
    echoed["headers"]
        .as_object()
        .unwrap()
        .keys()
        .filter(|name| *name != "host" && *name != "content-length")
        .cloned()
        .collect()
}

fn engine() -> CurlEngine {
    CurlEngine::new(HttpClient::new().unwrap())
}

async fn run(engine: &CurlEngine, command: &str) -> Value {
    let result = engine.execute(command).await.unwrap();
    serde_json::from_str(&result.body).unwrap()
}

mod round_trip {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn get_with_header() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!(r#"curl -H "X-Test: hello" {base}/path?q=1"#)).await;

        assert_eq!(echoed["method"], "GET");
        assert_eq!(echoed["path"], "/path");
        assert_eq!(echoed["query"], "q=1");
        assert_eq!(echoed["headers"]["x-test"], "hello");
        assert_eq!(echoed["body"], "");
    }

    #[tokio::test]
    async fn data_promotes_to_post_with_form_type() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!(r#"curl -d "a=b&c=d" {base}/form"#)).await;

        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["body"], "a=b&c=d");
        assert_eq!(
            echoed["headers"]["content-type"],
            "application/x-www-form-urlencoded"
        );
    }

    #[tokio::test]
    async fn explicit_json_post() {
        let base = spawn_echo().await;
        let command = format!(
            r#"curl -X POST {base}/api -H 'Content-Type: application/json' -H "Authorization: Bearer t0k" -d '{{"k": [1, 2]}}'"#
        );
        let echoed = run(&engine(), &command).await;

        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["body"], r#"{"k": [1, 2]}"#);
        assert_eq!(echoed["headers"]["content-type"], "application/json");
        assert_eq!(echoed["headers"]["authorization"], "Bearer t0k");
    }

    #[tokio::test]
    async fn method_is_verbatim_and_not_promoted() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!("curl -X DELETE -d x=1 {base}/item")).await;

        assert_eq!(echoed["method"], "DELETE");
        assert_eq!(echoed["body"], "x=1");
        assert!(echoed["headers"].get("content-type").is_none());
    }

    #[tokio::test]
    async fn put_gets_default_content_type() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!("curl -X PUT --data-raw v=2 {base}/item")).await;

        assert_eq!(echoed["method"], "PUT");
        assert_eq!(
            echoed["headers"]["content-type"],
            "application/x-www-form-urlencoded"
        );
    }

    #[tokio::test]
    async fn metacharacters_reach_server_literally() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!("curl -d 'a|b && $(id) `id`' {base}/")).await;
        assert_eq!(echoed["body"], "a|b && $(id) `id`");
    }

    #[tokio::test]
    async fn line_continuation() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!("curl \\\n  -H 'X-A: 1' \\\n  {base}/cont")).await;
        assert_eq!(echoed["path"], "/cont");
        assert_eq!(echoed["headers"]["x-a"], "1");
    }

    #[tokio::test]
    async fn only_command_headers_are_sent() {
        let base = spawn_echo().await;
        let command = format!("curl -H 'X-One: 1' -H 'Accept-Language: en' -d a=1 {base}/wire");
        let echoed = run(&engine(), &command).await;

        let expected: BTreeSet<String> = ["accept-language", "content-type", "x-one"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(header_names(&echoed), expected);
    }

    #[tokio::test]
    async fn bare_get_sends_no_extra_headers() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!("curl {base}/bare")).await;
        assert_eq!(header_names(&echoed), BTreeSet::new());
        assert!(echoed["headers"].get("accept").is_none());
        assert!(echoed["headers"].get("user-agent").is_none());
    }

    #[tokio::test]
    async fn redirects_are_followed() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!("curl {base}/redirect")).await;
        assert_eq!(echoed["path"], "/landing");
    }

    #[tokio::test]
    async fn see_other_turns_post_into_get() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!("curl -d a=1 {base}/redirect")).await;
        assert_eq!(echoed["method"], "GET");
        assert_eq!(echoed["path"], "/landing");
        assert_eq!(echoed["body"], "");
        assert!(echoed["headers"].get("content-type").is_none());
    }

    #[tokio::test]
    async fn temporary_redirect_replays_post() {
        let base = spawn_echo().await;
        let echoed = run(&engine(), &format!("curl -d a=1 {base}/temporary")).await;
        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["path"], "/landing");
        assert_eq!(echoed["body"], "a=1");
    }
}

mod limits {
    use super::*;
    use pretty_assertions::assert_eq;

    fn small_engine() -> CurlEngine {
        let limits = ClientLimits::new().max_response_bytes(1024);
        CurlEngine::new(HttpClient::with_limits(&limits).unwrap())
    }

    #[tokio::test]
    async fn content_length_over_limit() {
        let base = spawn_echo().await;
        let err = small_engine()
            .execute(&format!("curl {base}/big"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResponseTooLarge { limit: 1024 }), "{err}");
    }

    #[tokio::test]
    async fn streamed_body_over_limit() {
        let base = spawn_echo().await;
        let err = small_engine()
            .execute(&format!("curl {base}/chunked"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResponseTooLarge { .. }), "{err}");
    }

    #[tokio::test]
    async fn body_under_limit() {
        let base = spawn_echo().await;
        let result = engine().execute(&format!("curl {base}/chunked")).await.unwrap();
        assert_eq!(result.body.len(), 4096);
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn rejected_before_network() {
        let engine = engine();
        for (command, expected) in [
            ("wget http://127.0.0.1:1/", "command must start with curl"),
            ("curl http://127.0.0.1:1/; id", "semicolons are not allowed"),
            ("curl 'http://127.0.0.1:1/", "unterminated single quote"),
            ("curl", "no arguments"),
            ("curl -X POST", "no URL specified"),
        ] {
            let err = engine.execute(command).await.unwrap_err();
            assert!(err.is_validation(), "{command}: {err}");
            assert!(err.to_string().contains(expected), "{command}: {err}");
        }
    }

    #[tokio::test]
    async fn redirect_loop_stops() {
        let base = spawn_echo().await;
        let err = engine().execute(&format!("curl {base}/loop")).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err}");
        assert!(err.to_string().contains("stopped after 10 redirects"), "{err}");
    }

    #[tokio::test]
    async fn connection_refused() {
        let err = engine().execute("curl http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err}");
        assert!(!err.is_validation());
    }
}

mod tls {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn insecure_flag_accepts_self_signed() {
        let base = spawn_self_signed().await;
        let result = engine().execute(&format!("curl -k {base}/")).await.unwrap();
        assert_eq!(result.body, "secure");
    }

    #[tokio::test]
    async fn self_signed_rejected_without_insecure() {
        let base = spawn_self_signed().await;
        let err = engine().execute(&format!("curl {base}/")).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err}");
    }

    #[tokio::test]
    async fn insecure_flag_is_per_request() {
        let base = spawn_self_signed().await;
        let engine = engine();

        let result = engine.execute(&format!("curl -k {base}/")).await.unwrap();
        assert_eq!(result.body, "secure");

        // Same engine, same URL: certificates are verified again
        let err = engine.execute(&format!("curl {base}/")).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err}");

        let result = engine.execute(&format!("curl --insecure {base}/")).await.unwrap();
        assert_eq!(result.body, "secure");

        // A fresh engine verifies too, and no default provider was installed
        let err = super::engine()
            .execute(&format!("curl {base}/"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)), "{err}");
        assert!(CryptoProvider::get_default().is_none());
    }
}
