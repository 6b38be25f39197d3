//! Curl engine - transfer data from URLs described by curl command lines
//!
//! Pipeline: validate + tokenize ([`crate::parser`]) → interpret flags
//! ([`RequestSpec::from_args`]) → execute ([`HttpClient`]).
//!
//! The executor only ever sees the interpreted [`RequestSpec`]; the raw
//! command string never reaches a shell or any other program.

mod spec;

pub use spec::{DEFAULT_CONTENT_TYPE, DEFAULT_METHOD, RequestSpec};

use crate::error::Result;
use crate::network::HttpClient;
use crate::parser;

/// Payload returned to the caller of a curl task.
///
/// Only the body is surfaced; status and headers of the remote response are
/// not part of the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Response body, UTF-8 decoded lossily
    pub body: String,
}

/// Validate and interpret a raw command without sending anything.
pub fn prepare(raw: &str) -> Result<RequestSpec> {
    let words = parser::parse_command(raw)?;
    RequestSpec::from_args(&words[1..])
}

/// Executes curl commands over a shared [`HttpClient`].
#[derive(Clone)]
pub struct CurlEngine {
    client: HttpClient,
}

impl CurlEngine {
    /// Create an engine around an existing client.
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Run one raw curl command and return the remote response body.
    pub async fn execute(&self, raw: &str) -> Result<ExecutionResult> {
        let spec = prepare(raw)?;
        let response = self.client.execute(&spec).await?;
        Ok(ExecutionResult {
            body: response.body_string(),
        })
    }
}
