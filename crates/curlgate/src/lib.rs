//! Curlgate - secured agent that runs curl-style commands as HTTP requests
//!
//! A caller posts a command line such as
//! `curl -X POST https://api.example.com -H 'Content-Type: application/json' -d '{}'`
//! together with the agent's secure key. The agent tokenizes and validates
//! the line, interprets its flags into a [`RequestSpec`], sends exactly one
//! HTTP request, and returns the response body. No shell is involved.
//!
//! # Example
//!
//! ```rust
//! use curlgate::{Error, curl};
//!
//! let spec = curl::prepare(r#"curl -H "X: Y" http://a/b"#).unwrap();
//! assert_eq!(spec.method, "GET");
//! assert_eq!(spec.url, "http://a/b");
//! assert_eq!(spec.headers["X"], "Y");
//!
//! assert!(matches!(
//!     curl::prepare("curl http://a; rm -rf /"),
//!     Err(Error::CommandInjectionRejected)
//! ));
//! ```
//!
//! Serving the endpoint:
//!
//! ```rust,no_run
//! use curlgate::{SecureKey, ServerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = ServerBuilder::new()
//!         .secure_key(SecureKey::new("s3cret"))
//!         .build()?;
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     curlgate::serve(listener, router, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod curl;
mod error;
mod limits;
mod logging_impl;
mod network;
pub mod parser;
pub mod server;
pub mod system;
pub mod task;

pub use auth::{AuthGate, SecureKey};
pub use config::{AgentConfig, LoadedConfig};
pub use curl::{CurlEngine, ExecutionResult, RequestSpec};
pub use error::{Error, Result};
pub use limits::{
    ClientLimits, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_AUTH_BODY_BYTES,
    DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_TIMEOUT_SECS,
};
pub use logging_impl::{LogConfig, sanitize_for_log};
pub use network::{HttpClient, Response};
pub use server::{ApiResponse, AppState, ServerBuilder, create_router, serve};
pub use system::{MemoryUsage, ProcMetrics, SystemMetrics};
pub use task::{TaskKind, TaskOutcome, TaskRequest};
