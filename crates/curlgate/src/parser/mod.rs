//! Parser module for Curlgate
//!
//! Turns a raw command line into shell words and checks that it is a curl
//! invocation that cannot chain further statements.
//!
//! Validation runs in this order on the raw input:
//! 1. the trimmed command must start with the word `curl`
//! 2. the raw string must not contain `;` anywhere (quoted or not)
//! 3. quoting must be balanced
//! 4. at least one argument must follow the program name

mod lexer;
mod span;

pub use lexer::Lexer;
pub use span::Position;

use crate::error::{Error, Result};

/// Program name every accepted command must start with.
pub const PROGRAM_NAME: &str = "curl";

/// Split a command line into words.
///
/// Pure and deterministic: quoting is resolved, nothing is expanded.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut lexer = Lexer::new(input);
    let mut words = Vec::new();
    while let Some(word) = lexer.next_word()? {
        words.push(word);
    }
    Ok(words)
}

/// Validate a raw command line and return its words.
///
/// The returned vector always starts with [`PROGRAM_NAME`] and has at least
/// two entries.
pub fn parse_command(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if !starts_with_program(trimmed) {
        return Err(Error::UnsupportedCommand);
    }

    if raw.contains(';') {
        return Err(Error::CommandInjectionRejected);
    }

    let words = tokenize(trimmed)?;
    if words.len() < 2 {
        return Err(Error::EmptyCommand);
    }

    Ok(words)
}

/// `curl` must be a whole word: `curlx` is some other program.
///
/// Stricter than a plain prefix match, which would also accept `curlx ...`.
fn starts_with_program(trimmed: &str) -> bool {
    match trimmed.strip_prefix(PROGRAM_NAME) {
        Some(rest) => rest.chars().next().is_none_or(char::is_whitespace),
        None => false,
    }
}
