//! Auth gate: every protected request must present the secure key.
//!
//! The candidate key is looked up in this order:
//! 1. `X-Secure-Key` header
//! 2. `secure_key` form field (POST only): urlencoded body, then query string
//! 3. `secure_key` field of a JSON body (POST with `application/json`)
//!
//! Steps 2 and 3 buffer the body (bounded) and hand the same bytes to the
//! wrapped handler, so it can still decode the body from the start.

use std::fmt;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::server::ApiError;

/// Header carrying the secure key.
pub const SECURE_KEY_HEADER: &str = "x-secure-key";

/// Form/JSON field carrying the secure key.
pub const SECURE_KEY_FIELD: &str = "secure_key";

/// The configured shared secret. Immutable for the life of the process.
#[derive(Clone)]
pub struct SecureKey(Arc<str>);

impl SecureKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::from(key.into()))
    }

    /// Exact byte comparison in constant time for equal-length candidates.
    ///
    /// An empty candidate never matches.
    pub fn matches(&self, candidate: &str) -> bool {
        !candidate.is_empty()
            && self.0.len() == candidate.len()
            && bool::from(self.0.as_bytes().ct_eq(candidate.as_bytes()))
    }
}

impl fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureKey(<redacted>)")
    }
}

/// Middleware state: the key plus the body buffering bound.
#[derive(Debug, Clone)]
pub struct AuthGate {
    key: SecureKey,
    max_body_bytes: usize,
}

impl AuthGate {
    pub fn new(key: SecureKey, max_body_bytes: usize) -> Self {
        Self {
            key,
            max_body_bytes,
        }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Check `request` and return it (with its body intact) when authorized.
    pub async fn authorize(&self, request: Request) -> Result<Request, ApiError> {
        let (parts, body) = request.into_parts();

        if let Some(candidate) = header_candidate(&parts.headers) {
            return if self.key.matches(candidate) {
                Ok(Request::from_parts(parts, body))
            } else {
                Err(ApiError::Unauthorized)
            };
        }

        if parts.method != Method::POST {
            return Err(ApiError::Unauthorized);
        }

        // Over-limit bodies are treated as carrying no key
        let bytes = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| {
                tracing::debug!("auth body not buffered: {e}");
                ApiError::Unauthorized
            })?;

        let candidate = form_candidate(&parts.headers, parts.uri.query(), &bytes)
            .or_else(|| json_candidate(&parts.headers, &bytes));

        match candidate {
            Some(candidate) if self.key.matches(&candidate) => {
                Ok(Request::from_parts(parts, Body::from(bytes)))
            }
            _ => Err(ApiError::Unauthorized),
        }
    }
}

/// axum middleware wrapping protected routes.
pub async fn require_secure_key(
    State(gate): State<AuthGate>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    match gate.authorize(request).await {
        Ok(request) => next.run(request).await,
        Err(err) => {
            tracing::warn!(path = %path, "rejected request with invalid secure key");
            err.into_response()
        }
    }
}

fn header_candidate(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SECURE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn form_candidate(headers: &HeaderMap, query: Option<&str>, body: &Bytes) -> Option<String> {
    let from_body = if has_media_type(headers, "application/x-www-form-urlencoded") {
        form_field(body)
    } else {
        None
    };
    from_body.or_else(|| query.and_then(|q| form_field(q.as_bytes())))
}

fn form_field(input: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(input)
        .find(|(k, _)| k == SECURE_KEY_FIELD)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
struct SecureKeyField {
    #[serde(default)]
    secure_key: Option<String>,
}

fn json_candidate(headers: &HeaderMap, body: &Bytes) -> Option<String> {
    if !has_media_type(headers, "application/json") {
        return None;
    }
    serde_json::from_slice::<SecureKeyField>(body)
        .ok()
        .and_then(|field| field.secure_key)
        .filter(|v| !v.is_empty())
}

fn has_media_type(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(expected))
}
