//! Logging helpers for Curlgate
//!
//! Commands arriving at the agent routinely carry credentials (bearer
//! tokens in `-H`, passwords in URLs, API keys in query strings). Everything
//! written to the log goes through [`LogConfig`] first.
//!
//! # Log Levels
//!
//! - **ERROR**: Server failures, recovered panics
//! - **WARN**: Failed tasks, rejected auth
//! - **INFO**: Server lifecycle, config creation
//! - **DEBUG**: Outbound request shape (method, redacted URL, header names)
//! - **TRACE**: Outbound header values (redacted)

use std::borrow::Cow;

use url::Url;

const REDACTED: &str = "[REDACTED]";

/// Configuration for logging behavior.
///
/// By default, sensitive data is redacted from logs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to redact sensitive data from logs (default: true)
    pub redact_sensitive: bool,

    /// Header/query-name fragments treated as secrets (case-insensitive)
    pub sensitive_names: Vec<String>,

    /// Maximum length of logged values before truncation (default: 200)
    pub max_value_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        let sensitive_names = [
            "AUTHORIZATION",
            "COOKIE",
            "SECURE_KEY",
            "SECURE-KEY",
            "PASSWORD",
            "PASSWD",
            "SECRET",
            "TOKEN",
            "KEY",
            "CREDENTIAL",
            "SESSION",
            "SIGNATURE",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            redact_sensitive: true,
            sensitive_names,
            max_value_length: 200,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable redaction (for local debugging only).
    ///
    /// # Warning
    ///
    /// Logs will contain caller credentials.
    pub fn unsafe_disable_redaction(mut self) -> Self {
        self.redact_sensitive = false;
        self
    }

    /// Set maximum logged value length
    pub fn max_value_length(mut self, len: usize) -> Self {
        self.max_value_length = len;
        self
    }

    /// Check whether a header or query parameter name looks sensitive
    pub fn is_sensitive_name(&self, name: &str) -> bool {
        let upper = name.to_uppercase();
        self.sensitive_names
            .iter()
            .any(|pattern| upper.contains(pattern.as_str()))
    }

    /// Redact a header value if its name looks sensitive
    pub fn redact_header<'a>(&self, name: &str, value: &'a str) -> Cow<'a, str> {
        if self.redact_sensitive && self.is_sensitive_name(name) {
            return Cow::Borrowed(REDACTED);
        }
        self.truncate(value)
    }

    /// Strip URL credentials and redact sensitive query values.
    pub fn redact_url<'a>(&self, url: &'a str) -> Cow<'a, str> {
        if !self.redact_sensitive {
            return self.truncate(url);
        }

        let Ok(mut parsed) = Url::parse(url) else {
            return Cow::Owned(self.truncate(&sanitize_for_log(url)).into_owned());
        };

        let mut changed = false;
        if !parsed.username().is_empty() || parsed.password().is_some() {
            // set_* only fail for cannot-be-a-base URLs, which carry no userinfo
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            changed = true;
        }

        if parsed.query().is_some() {
            let pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| {
                    if self.is_sensitive_name(&k) {
                        changed = true;
                        (k.into_owned(), REDACTED.to_string())
                    } else {
                        (k.into_owned(), v.into_owned())
                    }
                })
                .collect();
            if changed {
                parsed.query_pairs_mut().clear().extend_pairs(pairs);
            }
        }

        if changed {
            Cow::Owned(self.truncate(parsed.as_str()).into_owned())
        } else {
            self.truncate(url)
        }
    }

    /// Summarize a raw command for logging without its arguments.
    pub fn format_command_for_log(&self, command: &str) -> String {
        if !self.redact_sensitive {
            return self.truncate(&sanitize_for_log(command)).into_owned();
        }
        format!(
            "[command: {} words, {} bytes]",
            command.split_whitespace().count(),
            command.len()
        )
    }

    /// Truncate value if it exceeds max length
    ///
    /// Handles UTF-8 char boundaries properly to avoid panics on multi-byte chars.
    fn truncate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.len() <= self.max_value_length {
            Cow::Borrowed(value)
        } else {
            let mut end = self.max_value_length;
            while end > 0 && !value.is_char_boundary(end) {
                end -= 1;
            }
            Cow::Owned(format!(
                "{}...[truncated {} bytes]",
                &value[..end],
                value.len() - end
            ))
        }
    }
}

/// Escape characters that could be used for log injection.
pub fn sanitize_for_log(input: &str) -> String {
    input
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .chars()
        .filter(|c| !c.is_control() || *c == ' ')
        .collect()
}
