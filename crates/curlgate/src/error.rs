//! Error types for Curlgate
//!
//! This module provides error types for the curl pipeline with the following design goals:
//! - Human-readable error messages for callers of the task endpoint
//! - No leakage of sensitive information (secure key, local paths)
//! - One variant per failure class so the endpoint can pick a status code

use thiserror::Error;

/// Result type alias using Curlgate's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Curlgate error types.
///
/// All error messages are designed to be safe for display to remote callers.
#[derive(Error, Debug)]
pub enum Error {
    /// Quoting in the command line is unbalanced.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// The command does not start with the `curl` program name.
    #[error("command must start with curl")]
    UnsupportedCommand,

    /// The raw command contains a statement separator.
    #[error("semicolons are not allowed: command chaining rejected")]
    CommandInjectionRejected,

    /// The command has no arguments after the program name.
    #[error("invalid curl command: no arguments")]
    EmptyCommand,

    /// No URL token was found while interpreting flags.
    #[error("no URL specified")]
    MissingUrl,

    /// Method, URL or a header is not acceptable to the HTTP transport.
    #[error("invalid request: {0}")]
    RequestConstruction(String),

    /// Connection, TLS, timeout or read failure.
    #[error("network error: {0}")]
    Network(String),

    /// Response body exceeded the configured ceiling.
    #[error("response too large: exceeded {limit} bytes limit")]
    ResponseTooLarge { limit: usize },

    /// Agent configuration is missing or invalid.
    #[error("config error: {0}")]
    Config(String),

    /// System metrics could not be collected.
    #[error("metrics error: {0}")]
    Metrics(String),

    /// I/O error from config or metrics files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error for unexpected failures.
    ///
    /// Never carries stack traces or panic payloads.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures rejected before any network activity.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MalformedCommand(_)
                | Self::UnsupportedCommand
                | Self::CommandInjectionRejected
                | Self::EmptyCommand
                | Self::MissingUrl
                | Self::RequestConstruction(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_caller_safe() {
        assert_eq!(
            Error::CommandInjectionRejected.to_string(),
            "semicolons are not allowed: command chaining rejected"
        );
        assert_eq!(Error::MissingUrl.to_string(), "no URL specified");
        assert_eq!(
            Error::ResponseTooLarge { limit: 10 }.to_string(),
            "response too large: exceeded 10 bytes limit"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(Error::UnsupportedCommand.is_validation());
        assert!(Error::MalformedCommand("x".into()).is_validation());
        assert!(!Error::Network("refused".into()).is_validation());
        assert!(!Error::ResponseTooLarge { limit: 1 }.is_validation());
    }
}
