//! Lexer for curl command lines
//!
//! Splits input into shell words with POSIX quoting rules and no expansion:
//! `$`, backticks, globs and operators such as `|` or `&&` are plain
//! characters here. Nothing produced by this lexer is ever handed to a shell.

use super::span::Position;
use crate::error::{Error, Result};

/// Lexer for curl command lines.
pub struct Lexer<'a> {
    /// Current position in the input
    position: Position,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            position: Position::new(),
            chars: input.chars().peekable(),
        }
    }

    /// Get the current position in the input.
    pub fn position(&self) -> Position {
        self.position
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next();
        if let Some(c) = ch {
            self.position.advance(c);
        }
        ch
    }

    /// Get the next word from the input.
    ///
    /// Returns `Ok(None)` at end of input and `MalformedCommand` when a quote
    /// is left open or the input ends with a lone backslash.
    pub fn next_word(&mut self) -> Result<Option<String>> {
        self.skip_whitespace();

        // `''` is a real (empty) word, so track "started" separately from content
        let mut started = false;
        let mut word = String::new();

        while let Some(ch) = self.peek_char() {
            match ch {
                c if is_separator(c) => {
                    if started {
                        break;
                    }
                    // only reachable after a line continuation
                    self.advance();
                }
                '\'' => {
                    started = true;
                    self.read_single_quoted_into(&mut word)?;
                }
                '"' => {
                    started = true;
                    self.read_double_quoted_into(&mut word)?;
                }
                '\\' => {
                    let start = self.position;
                    self.advance();
                    match self.advance() {
                        // \<newline> is line continuation: discard both
                        Some('\n') => {}
                        Some(next) => {
                            started = true;
                            word.push(next);
                        }
                        None => {
                            return Err(Error::MalformedCommand(format!(
                                "dangling escape at {start}"
                            )));
                        }
                    }
                }
                _ => {
                    started = true;
                    word.push(ch);
                    self.advance();
                }
            }
        }

        Ok(started.then_some(word))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if is_separator(ch) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_single_quoted_into(&mut self, word: &mut String) -> Result<()> {
        let start = self.position;
        self.advance(); // consume opening '

        while let Some(ch) = self.advance() {
            if ch == '\'' {
                return Ok(());
            }
            word.push(ch);
        }

        Err(Error::MalformedCommand(format!(
            "unterminated single quote starting at {start}"
        )))
    }

    fn read_double_quoted_into(&mut self, word: &mut String) -> Result<()> {
        let start = self.position;
        self.advance(); // consume opening "

        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Ok(()),
                '\\' => match self.advance() {
                    Some(next) => word.push(next),
                    None => break,
                },
                _ => word.push(ch),
            }
        }

        Err(Error::MalformedCommand(format!(
            "unterminated double quote starting at {start}"
        )))
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn words(input: &str) -> Vec<String> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        while let Some(word) = lexer.next_word().unwrap() {
            out.push(word);
        }
        out
    }

    #[test]
    fn test_simple_words() {
        assert_eq!(words("curl  -s\thttp://a"), vec!["curl", "-s", "http://a"]);
    }

    #[test]
    fn test_single_quoted_string() {
        assert_eq!(
            words(r#"curl -d '{"a": "b c"}'"#),
            vec!["curl", "-d", r#"{"a": "b c"}"#]
        );
        // backslash is literal inside single quotes
        assert_eq!(words(r"'a\b'"), vec![r"a\b"]);
    }

    #[test]
    fn test_double_quoted_string() {
        assert_eq!(words(r#"-H "X: Y""#), vec!["-H", "X: Y"]);
        assert_eq!(words(r#""say \"hi\"""#), vec![r#"say "hi""#]);
    }

    #[test]
    fn test_adjacent_segments_join() {
        assert_eq!(words(r#"a'b c'"d e"f"#), vec!["ab cde f"]);
    }

    #[test]
    fn test_empty_quotes_are_words() {
        assert_eq!(words(r#"curl '' """#), vec!["curl", "", ""]);
    }

    #[test]
    fn test_escapes_outside_quotes() {
        assert_eq!(words(r"a\ b c\\d"), vec!["a b", r"c\d"]);
        assert_eq!(words("a\\\nb"), vec!["ab"]);
    }

    #[test]
    fn test_line_continuation_between_words() {
        assert_eq!(
            words("curl \\\n  -H 'X: 1' \\\n  http://a"),
            vec!["curl", "-H", "X: 1", "http://a"]
        );
        assert_eq!(words("curl \\\n"), vec!["curl"]);
    }

    #[test]
    fn test_no_expansion() {
        assert_eq!(
            words("echo $HOME `id` $(id) a|b &&"),
            vec!["echo", "$HOME", "`id`", "$(id)", "a|b", "&&"]
        );
    }

    #[test]
    fn test_unterminated_single_quote() {
        let mut lexer = Lexer::new("curl 'abc");
        assert_eq!(lexer.next_word().unwrap(), Some("curl".to_string()));
        let msg = lexer.next_word().unwrap_err().to_string();
        assert!(msg.contains("unterminated single quote"));
        assert!(msg.contains("1:6"));
    }

    #[test]
    fn test_unterminated_double_quote() {
        let mut lexer = Lexer::new("\"abc\\\"");
        assert!(matches!(
            lexer.next_word(),
            Err(Error::MalformedCommand(_))
        ));
    }

    #[test]
    fn test_dangling_escape() {
        let mut lexer = Lexer::new("abc\\");
        assert!(matches!(
            lexer.next_word(),
            Err(Error::MalformedCommand(_))
        ));
    }

    #[test]
    fn test_position_tracks_input() {
        let mut lexer = Lexer::new("curl x");
        lexer.next_word().unwrap();
        assert_eq!(lexer.position().column, 5);
    }
}
