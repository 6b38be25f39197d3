//! Resource limits for outbound requests and inbound auth buffering
//!
//! These limits keep a single task from hanging the agent or exhausting memory.

use std::time::Duration;

/// Default maximum response body size (32 MB)
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 32 * 1024 * 1024;

/// Maximum request body the auth gate buffers while looking for a key (1 MB)
pub const DEFAULT_MAX_AUTH_BODY_BYTES: usize = 1024 * 1024;

/// Default request timeout (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout (10 seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum allowed timeout (10 minutes) - prevents resource exhaustion from very long timeouts
pub const MAX_TIMEOUT_SECS: u64 = 600;

/// Minimum allowed timeout (1 second) - prevents instant timeouts that waste resources
pub const MIN_TIMEOUT_SECS: u64 = 1;

/// Limits applied to every task the agent runs.
#[derive(Debug, Clone)]
pub struct ClientLimits {
    /// Overall request timeout
    /// Default: 30 seconds
    pub timeout: Duration,

    /// TCP/TLS connect timeout
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Maximum response body read from the remote server
    /// Default: 32 MB
    pub max_response_bytes: usize,

    /// Maximum request body the auth gate buffers
    /// Default: 1 MB
    pub max_auth_body_bytes: usize,
}

impl Default for ClientLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            max_auth_body_bytes: DEFAULT_MAX_AUTH_BODY_BYTES,
        }
    }
}

impl ClientLimits {
    /// Create new limits with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set request timeout, clamped to [`MIN_TIMEOUT_SECS`]..=[`MAX_TIMEOUT_SECS`]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = clamp_timeout(timeout);
        self
    }

    /// Set connect timeout, clamped like [`ClientLimits::timeout`]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = clamp_timeout(timeout);
        self
    }

    /// Set maximum response body size
    pub fn max_response_bytes(mut self, bytes: usize) -> Self {
        self.max_response_bytes = bytes;
        self
    }

    /// Set maximum buffered auth body size
    pub fn max_auth_body_bytes(mut self, bytes: usize) -> Self {
        self.max_auth_body_bytes = bytes;
        self
    }
}

fn clamp_timeout(timeout: Duration) -> Duration {
    timeout.clamp(
        Duration::from_secs(MIN_TIMEOUT_SECS),
        Duration::from_secs(MAX_TIMEOUT_SECS),
    )
}
