//! HTTP client for executing interpreted curl commands.
//!
//! # Security Mitigations
//!
//! - Large response DoS → `max_response_bytes` limit (32MB default), checked
//!   against `Content-Length` up front and again while streaming
//! - Connection hang → connect timeout (10s) and overall timeout (30s)
//! - Gzip/compression bomb → bodies are returned exactly as received
//! - Redirect loops → at most 10 hops, only to `http`/`https`
//! - `-k` never touches process-wide TLS state: a second pooled client with
//!   certificate checks disabled serves only requests that asked for it
//!
//! The transport adds `host` and, for bodies, `content-length`. Every other
//! header on the wire comes from the command.

use std::time::Duration;

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use url::Url;

use super::tls;
use crate::curl::RequestSpec;
use crate::error::{Error, Result};
use crate::limits::ClientLimits;
use crate::logging_impl::LogConfig;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

type Transport = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTP response
#[derive(Debug)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl Response {
    /// Get the body as a UTF-8 string (lossy)
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One hop of a request: what goes on the wire next.
struct Hop {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

/// Pooled HTTP client shared by all tasks.
///
/// Cloning is cheap; clones share connection pools.
#[derive(Clone)]
pub struct HttpClient {
    verified: Transport,
    insecure: Transport,
    timeout: Duration,
    /// Maximum response body size in bytes
    max_response_bytes: usize,
    log: LogConfig,
}

impl HttpClient {
    /// Create a client with default limits.
    pub fn new() -> Result<Self> {
        Self::with_limits(&ClientLimits::default())
    }

    /// Create a client with custom limits.
    pub fn with_limits(limits: &ClientLimits) -> Result<Self> {
        Ok(Self {
            verified: build_transport(limits, tls::verified_config()?),
            insecure: build_transport(limits, tls::insecure_config()?),
            timeout: limits.timeout,
            max_response_bytes: limits.max_response_bytes,
            log: LogConfig::default(),
        })
    }

    /// Replace the log redaction settings.
    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Get the maximum response size in bytes.
    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    /// Send exactly one request described by `spec`.
    ///
    /// Headers are applied as given; the only header this crate adds is the
    /// default Content-Type chosen by the flag interpreter. No retries.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Response> {
        let method = Method::from_bytes(spec.method.as_bytes())
            .map_err(|_| Error::RequestConstruction(format!("invalid method: {}", spec.method)))?;
        let url = parse_url(&spec.url)?;
        let headers = build_headers(spec)?;

        tracing::debug!(
            method = %method,
            url = %self.log.redact_url(&spec.url),
            headers = ?spec.headers.keys().collect::<Vec<_>>(),
            body_bytes = spec.body.as_ref().map_or(0, String::len),
            insecure = spec.skip_tls_verify,
            "sending request"
        );
        for (name, value) in &spec.headers {
            tracing::trace!(header = %name, value = %self.log.redact_header(name, value), "request header");
        }

        let transport = if spec.skip_tls_verify {
            &self.insecure
        } else {
            &self.verified
        };

        let hop = Hop {
            method,
            url,
            headers,
            body: spec.body.as_ref().map(|b| Bytes::copy_from_slice(b.as_bytes())),
        };

        // The deadline covers every hop and the body download
        match tokio::time::timeout(self.timeout, self.exchange(transport, hop)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Network("operation timed out".to_string())),
        }
    }

    async fn exchange(&self, transport: &Transport, mut hop: Hop) -> Result<Response> {
        let mut redirects = 0;
        loop {
            let response = transport
                .request(build_request(&hop)?)
                .await
                .map_err(|e| Error::Network(format!("request failed: {}", error_chain(&e))))?;
            let status = response.status();

            if let Some(location) = redirect_location(status, response.headers()) {
                if redirects == MAX_REDIRECTS {
                    return Err(Error::Network(format!(
                        "stopped after {MAX_REDIRECTS} redirects"
                    )));
                }
                redirects += 1;
                let next = resolve_redirect(&hop.url, location)?;
                tracing::debug!(
                    status = status.as_u16(),
                    location = %self.log.redact_url(next.as_str()),
                    "following redirect"
                );
                hop = hop.redirect(status, next);
                continue;
            }

            // Check Content-Length header to fail fast on large responses
            if let Some(content_length) = content_length(response.headers()) {
                if content_length > self.max_response_bytes as u64 {
                    return Err(Error::ResponseTooLarge {
                        limit: self.max_response_bytes,
                    });
                }
            }

            let body = self.read_body_with_limit(response.into_body()).await?;
            tracing::debug!(status = status.as_u16(), body_bytes = body.len(), "response received");

            return Ok(Response {
                status: status.as_u16(),
                body,
            });
        }
    }

    /// Read response body with size limit enforcement.
    ///
    /// This streams the response to avoid allocating memory for oversized responses.
    async fn read_body_with_limit(&self, mut incoming: Incoming) -> Result<Vec<u8>> {
        let mut body = Vec::new();

        while let Some(frame) = incoming.frame().await {
            let frame = frame.map_err(|e| {
                Error::Network(format!("failed to read response: {}", error_chain(&e)))
            })?;
            let Ok(chunk) = frame.into_data() else {
                // Trailers carry no body bytes
                continue;
            };

            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(Error::ResponseTooLarge {
                    limit: self.max_response_bytes,
                });
            }

            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

impl Hop {
    /// Next hop after a redirect to `next`.
    ///
    /// 301/302 turn a POST into a GET and 303 turns anything but HEAD into a
    /// GET, dropping the body. 307/308 replay method and body. Credentials
    /// are not forwarded to another host.
    fn redirect(mut self, status: StatusCode, next: Url) -> Self {
        let to_get = match status {
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => self.method == Method::POST,
            StatusCode::SEE_OTHER => self.method != Method::HEAD,
            _ => false,
        };
        if to_get {
            self.method = Method::GET;
            self.body = None;
            self.headers.remove(header::CONTENT_TYPE);
            self.headers.remove(header::CONTENT_LENGTH);
        }

        if !same_origin(&self.url, &next) {
            self.headers.remove(header::AUTHORIZATION);
            self.headers.remove(header::PROXY_AUTHORIZATION);
            self.headers.remove(header::COOKIE);
        }

        self.url = next;
        self
    }
}

fn build_transport(limits: &ClientLimits, tls: rustls::ClientConfig) -> Transport {
    let mut http = HttpConnector::new();
    // https URLs pass through the plain connector before TLS wraps them
    http.enforce_http(false);
    http.set_connect_timeout(Some(limits.connect_timeout));
    http.set_nodelay(true);

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Client::builder(TokioExecutor::new()).build(https)
}

fn build_request(hop: &Hop) -> Result<http::Request<Full<Bytes>>> {
    let uri: Uri = hop
        .url
        .as_str()
        .parse()
        .map_err(|e| Error::RequestConstruction(format!("invalid URL: {e}")))?;

    let mut request = http::Request::builder()
        .method(hop.method.clone())
        .uri(uri)
        .body(Full::new(hop.body.clone().unwrap_or_default()))
        .map_err(|e| Error::RequestConstruction(e.to_string()))?;
    *request.headers_mut() = hop.headers.clone();
    Ok(request)
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::RequestConstruction(format!("invalid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::RequestConstruction(format!(
            "unsupported URL scheme: {other}"
        ))),
    }
}

fn build_headers(spec: &RequestSpec) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(spec.headers.len());
    for (name, value) in &spec.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::RequestConstruction(format!("invalid header name: {name}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| Error::RequestConstruction(format!("invalid value for header {name}")))?;
        // `X-A` and `x-a` are distinct `RequestSpec` keys but one header on the wire
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

fn redirect_location(status: StatusCode, headers: &HeaderMap) -> Option<&str> {
    match status {
        StatusCode::MOVED_PERMANENTLY
        | StatusCode::FOUND
        | StatusCode::SEE_OTHER
        | StatusCode::TEMPORARY_REDIRECT
        | StatusCode::PERMANENT_REDIRECT => headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty()),
        _ => None,
    }
}

fn resolve_redirect(base: &Url, location: &str) -> Result<Url> {
    let next = base
        .join(location)
        .map_err(|e| Error::Network(format!("invalid redirect location: {e}")))?;
    match next.scheme() {
        "http" | "https" => Ok(next),
        other => Err(Error::Network(format!(
            "redirect to unsupported URL scheme: {other}"
        ))),
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Flatten an error and its sources; hyper keeps TLS and DNS detail in the chain.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
