//! Character scanner for splitting DDL scripts and CREATE TABLE bodies.
//!
//! Splits on separators only at parenthesis depth zero and outside of quoted
//! strings or identifiers, so `DECIMAL(10, 2)` and `CHECK (a > 0, b < 10)` stay
//! in one piece. Comments are replaced by a single space.

use std::iter::Peekable;
use std::str::Chars;

pub struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self { chars, current_char }
    }

    fn advance(&mut self) {
        self.current_char = self.chars.next();
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current_char {
            self.advance();
            if c == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // skip /
        self.advance(); // skip *
        while let Some(c) = self.current_char {
            self.advance();
            if c == '*' && self.current_char == Some('/') {
                self.advance();
                break;
            }
        }
    }

    /// Copy a quoted run verbatim, delimiters included. A doubled closing
    /// delimiter is an escape.
    fn read_quoted(&mut self, close: char, out: &mut String) {
        if let Some(open) = self.current_char {
            out.push(open);
        }
        self.advance();
        while let Some(c) = self.current_char {
            out.push(c);
            self.advance();
            if c == close {
                if self.current_char == Some(close) {
                    out.push(close);
                    self.advance();
                } else {
                    break;
                }
            }
        }
    }

    /// Split a script into `;`-terminated statements, comments removed.
    /// A `;` inside a quoted run does not end a statement, and text after the
    /// last `;` is dropped.
    pub fn split_statements(mut self) -> Vec<String> {
        let mut statements = Vec::new();
        let mut current = String::new();

        while let Some(c) = self.current_char {
            match c {
                '-' if self.peek() == Some(&'-') => {
                    self.skip_line_comment();
                    current.push(' ');
                }
                '/' if self.peek() == Some(&'*') => {
                    self.skip_block_comment();
                    current.push(' ');
                }
                '\'' | '"' | '`' => self.read_quoted(c, &mut current),
                '[' => self.read_quoted(']', &mut current),
                ';' => {
                    flush(&mut statements, &mut current);
                    self.advance();
                }
                _ => {
                    current.push(c);
                    self.advance();
                }
            }
        }

        statements
    }

    /// Split the text following an opening parenthesis into comma-separated
    /// fragments, stopping at the matching close parenthesis (or end of input).
    pub fn split_body(self) -> Vec<String> {
        self.split_top_level(|c| c == ',', true)
    }

    /// Split a fragment into whitespace-separated words. Parenthesized groups
    /// and quoted runs are never broken.
    pub fn split_words(self) -> Vec<String> {
        self.split_top_level(char::is_whitespace, false)
    }

    fn split_top_level(
        mut self,
        is_separator: impl Fn(char) -> bool,
        stop_at_close: bool,
    ) -> Vec<String> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;

        while let Some(c) = self.current_char {
            match c {
                '-' if self.peek() == Some(&'-') => {
                    self.skip_line_comment();
                    push_part(&mut parts, &mut current, &is_separator, ' ');
                }
                '/' if self.peek() == Some(&'*') => {
                    self.skip_block_comment();
                    push_part(&mut parts, &mut current, &is_separator, ' ');
                }
                '\'' | '"' | '`' => self.read_quoted(c, &mut current),
                '[' => self.read_quoted(']', &mut current),
                '(' => {
                    depth += 1;
                    current.push(c);
                    self.advance();
                }
                ')' if depth == 0 => {
                    if stop_at_close {
                        break;
                    }
                    current.push(c);
                    self.advance();
                }
                ')' => {
                    depth -= 1;
                    current.push(c);
                    self.advance();
                }
                c if depth == 0 && is_separator(c) => {
                    flush(&mut parts, &mut current);
                    self.advance();
                }
                _ => {
                    current.push(c);
                    self.advance();
                }
            }
        }

        flush(&mut parts, &mut current);
        parts
    }
}

/// A comment acts like a space: it separates words but not fragments.
fn push_part(
    parts: &mut Vec<String>,
    current: &mut String,
    is_separator: &impl Fn(char) -> bool,
    c: char,
) {
    if is_separator(c) {
        flush(parts, current);
    } else {
        current.push(c);
    }
}

fn flush(parts: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
    current.clear();
}

/// Strip identifier quoting and keep the last segment of a qualified name.
/// `"public"."Users"` becomes `Users`.
pub fn unquote_ident(raw: &str) -> String {
    let last = split_qualified(raw).pop().unwrap_or_default();
    let s = last.trim();
    let inner = match (s.chars().next(), s.chars().last()) {
        (Some('"'), Some('"')) | (Some('`'), Some('`')) | (Some('['), Some(']'))
            if s.len() >= 2 =>
        {
            &s[1..s.len() - 1]
        }
        _ => s,
    };
    inner.to_string()
}

fn split_qualified(raw: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;

    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '`') => quote = Some(c),
            (None, '[') => quote = Some(']'),
            (Some(q), c) if c == q => quote = None,
            (None, '.') => {
                segments.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&raw[start..]);
    segments
}
