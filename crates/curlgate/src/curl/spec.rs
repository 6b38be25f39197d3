//! Flag interpreter - curl arguments to [`RequestSpec`]

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Method used when no flag sets one.
pub const DEFAULT_METHOD: &str = "GET";

/// Content type applied to POST/PUT bodies without an explicit one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Abstract description of the HTTP request a curl command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Request method, verbatim from `-X` (default `GET`)
    pub method: String,
    /// Target URL, never empty once interpreted
    pub url: String,
    /// Header name to value; names keep the caller's casing
    pub headers: BTreeMap<String, String>,
    /// Request body from the last `-d`-style flag
    pub body: Option<String>,
    /// Disable certificate validation for this request only (`-k`)
    pub skip_tls_verify: bool,
}

impl RequestSpec {
    /// Interpret the words following the program name.
    ///
    /// Single left-to-right scan with one word of lookahead. Unknown flags and
    /// extra positional words are ignored; a flag missing its argument at the
    /// end of the line is ignored too.
    ///
    /// Usage: curl [OPTIONS] URL
    ///
    /// Options:
    ///   -X, --request METHOD   Set request method
    ///   -H, --header "N: V"    Add header (words without a colon are dropped)
    ///   -d, --data DATA        Set body; GET becomes POST
    ///       --data-ascii, --data-binary, --data-raw   Same as -d
    ///   -k, --insecure         Skip TLS certificate verification
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut method = DEFAULT_METHOD.to_string();
        let mut url = String::new();
        let mut headers = BTreeMap::new();
        let mut body: Option<String> = None;
        let mut skip_tls_verify = false;

        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];

            // First positional word wins
            if !arg.starts_with('-') && url.is_empty() {
                url = arg.clone();
                i += 1;
                continue;
            }

            match arg.as_str() {
                "-X" | "--request" => {
                    if let Some(value) = args.get(i + 1) {
                        method = value.clone();
                        i += 1;
                    }
                }
                "-H" | "--header" => {
                    if let Some(line) = args.get(i + 1) {
                        if let Some((name, value)) = line.split_once(':') {
                            headers.insert(name.trim().to_string(), value.trim().to_string());
                        }
                        i += 1;
                    }
                }
                "-d" | "--data" | "--data-ascii" | "--data-binary" | "--data-raw" => {
                    if let Some(data) = args.get(i + 1) {
                        body = Some(data.clone());
                        if method == DEFAULT_METHOD {
                            method = "POST".to_string();
                        }
                        i += 1;
                    }
                }
                "-k" | "--insecure" => skip_tls_verify = true,
                _ => {
                    // Ignore unknown options for compatibility
                }
            }
            i += 1;
        }

        if url.is_empty() {
            return Err(Error::MissingUrl);
        }

        let mut spec = Self {
            method,
            url,
            headers,
            body,
            skip_tls_verify,
        };
        spec.apply_default_content_type();
        Ok(spec)
    }

    /// Header lookup ignoring ASCII case, as HTTP does.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn apply_default_content_type(&mut self) {
        let has_body = self.body.as_deref().is_some_and(|b| !b.is_empty());
        let sends_form = matches!(self.method.as_str(), "POST" | "PUT");
        if has_body && sends_form && self.header("Content-Type").is_none() {
            self.headers
                .insert("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string());
        }
    }
}
