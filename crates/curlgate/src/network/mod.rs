//! Network layer for Curlgate
//!
//! Executes [`RequestSpec`](crate::curl::RequestSpec)s over pooled HTTP
//! clients with bounded response capture.
//!
//! # Security Model
//!
//! - Only `http` and `https` URLs are accepted
//! - Response bodies are capped (see [`ClientLimits`](crate::ClientLimits))
//! - Certificate checks are skipped per request, never process-wide

mod client;
mod tls;

pub use client::{HttpClient, Response};
