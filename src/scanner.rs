//! Module `scanner` implements a one‑pass, streaming UTF‑8 lexer.
//!
//! It transforms a `&str` into a sequence of [`Token`]s, skipping whitespace
//! and emitting exactly one `EOF` token at the end. Comments are *not*
//! discarded: `// ...` becomes a `COMMENT` token and `/* ... */` a
//! `MULTI_COMMENT` token, both carrying their text as a literal.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//! - `impl Iterator for Scanner<'a>` yields `Result<Token, LhoxError>`; an
//!   error never stops the iterator, scanning resumes at the next character.
//! - `Scanner::scan_tokens(self) -> (Vec<Token>, Vec<LhoxError>)` drains the
//!   iterator, splitting tokens from accumulated errors.
//!
//! # Token Recognition
//!
//! - Single‑character punctuators and `?`/`:` for the ternary operator.
//! - Two‑character operators: `!=`, `==`, `<=`, `>=`.
//! - String literals: `"` … `"`, multi‑line, no escape processing.
//! - Numbers: digits with optional `.digits`, or a leading `.digits`; more
//!   than one decimal point is an error. Integers become `NUMBER_INT`
//!   (`i64`), anything with a point `NUMBER_REAL` (`f64`).
//! - Identifiers start with a letter or `_` (Unicode letters included) and
//!   continue with letters, digits and combining marks; keywords are resolved
//!   through a perfect‑hash `KEYWORDS` map.
//!
//! Line comments are skipped in bulk with `memchr`.

use crate::error::{LhoxError, Result};
use crate::token::{Literal, Offset, Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"class"    => TokenType::CLASS,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"fun"      => TokenType::FUN,
    b"for"      => TokenType::FOR,
    b"if"       => TokenType::IF,
    b"nil"      => TokenType::NIL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"true"     => TokenType::TRUE,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
    b"break"    => TokenType::BREAK,
    b"continue" => TokenType::CONTINUE,
    b"T"        => TokenType::TRUE,
    b"F"        => TokenType::FALSE,
};

/// A single pass **scanner / lexer** over UTF‑8 source text.
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    start: usize, // index of the *first* byte of the current lexeme
    curr: usize,  // index *one past* the last byte examined
    line: usize,  // 1‑based line counter (\n increments)
    pending: Option<(TokenType, Option<Literal>)>,
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a str) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            bytes: src.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    /// Scan the whole input, returning every token (ending in `EOF`) and
    /// every error encountered along the way.
    pub fn scan_tokens(self) -> (Vec<Token>, Vec<LhoxError>) {
        let mut tokens: Vec<Token> = Vec::new();
        let mut errors: Vec<LhoxError> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        info!(
            "Scan finished: {} token(s), {} error(s)",
            tokens.len(),
            errors.len()
        );

        (tokens, errors)
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it. Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte, or `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.bytes[self.curr + 1]
        }
    }

    /// Current character; only called while `curr` sits on a char boundary.
    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.src.get(self.curr..).and_then(|rest| rest.chars().next())
    }

    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    #[inline(always)]
    fn set(&mut self, token_type: TokenType) {
        self.pending = Some((token_type, None));
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`. A recognised token is
    /// left in `self.pending`; whitespace leaves it empty.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            b'(' => self.set(TokenType::LEFT_PAREN),
            b')' => self.set(TokenType::RIGHT_PAREN),
            b'{' => self.set(TokenType::LEFT_BRACE),
            b'}' => self.set(TokenType::RIGHT_BRACE),
            b',' => self.set(TokenType::COMMA),
            b'-' => self.set(TokenType::MINUS),
            b'+' => self.set(TokenType::PLUS),
            b';' => self.set(TokenType::SEMICOLON),
            b'*' => self.set(TokenType::STAR),
            b'?' => self.set(TokenType::QUESTION),
            b':' => self.set(TokenType::COLON),

            b'!' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                };

                self.set(tt);
            }

            b'=' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                };

                self.set(tt);
            }

            b'<' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                };

                self.set(tt);
            }

            b'>' => {
                let tt = if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                };

                self.set(tt);
            }

            b' ' | b'\r' | b'\t' => {}

            b'\n' => {
                self.line += 1;
            }

            b'/' => {
                if self.match_byte(b'/') {
                    self.line_comment();
                } else if self.match_byte(b'*') {
                    return self.block_comment();
                } else {
                    self.set(TokenType::SLASH);
                }
            }

            b'"' => {
                return self.parse_string();
            }

            b'.' => {
                if self.peek().is_ascii_digit() {
                    return self.parse_number(true);
                }

                self.set(TokenType::DOT);
            }

            b'0'..=b'9' => {
                return self.parse_number(false);
            }

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            _ if !b.is_ascii() => {
                // Re-read the whole multi-byte character.
                let c: char = self.src[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.curr = self.start + c.len_utf8();

                if c.is_alphabetic() {
                    self.parse_identifier();
                } else {
                    return Err(LhoxError::scan(
                        self.line,
                        c.to_string(),
                        format!("unexpected character: {}", c),
                    ));
                }
            }

            _ => {
                return Err(LhoxError::scan(
                    self.line,
                    (b as char).to_string(),
                    format!("unexpected character: {}", b as char),
                ));
            }
        }

        Ok(())
    }

    /// `//` already consumed; the comment runs to (not including) the newline.
    fn line_comment(&mut self) {
        match memchr(b'\n', &self.bytes[self.curr..]) {
            Some(pos) => self.curr += pos,
            None => self.curr = self.len(),
        }

        let text: &str = &self.src[self.start + 2..self.curr];
        self.pending = Some((TokenType::COMMENT, Some(Literal::Str(text.to_owned()))));
    }

    /// `/*` already consumed; scan to the matching `*/`, counting newlines.
    fn block_comment(&mut self) -> Result<()> {
        loop {
            if self.is_at_end() {
                return Err(LhoxError::scan(
                    self.line,
                    "end of input",
                    "unterminated multi-line comment",
                ));
            }

            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.curr += 2;
                break;
            }

            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        let text: &str = &self.src[self.start + 2..self.curr - 2];
        self.pending = Some((
            TokenType::MULTI_COMMENT,
            Some(Literal::Str(text.to_owned())),
        ));

        Ok(())
    }

    /// Parse a double‑quoted string literal. No escape sequences.
    fn parse_string(&mut self) -> Result<()> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LhoxError::scan(
                self.line,
                "end of input",
                "unterminated string",
            ));
        }

        self.advance(); // closing quote

        let s: &str = &self.src[self.start + 1..self.curr - 1];
        self.pending = Some((TokenType::STRING, Some(Literal::Str(s.to_owned()))));

        Ok(())
    }

    /// Parse `123`, `3.14` or `.5`. `leading_dot` is set when the lexeme
    /// started with the `.` that has already been consumed.
    fn parse_number(&mut self, leading_dot: bool) -> Result<()> {
        let mut dots: usize = usize::from(leading_dot);

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        while self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            dots += 1;
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme: &str = &self.src[self.start..self.curr];

        if dots > 1 {
            return Err(LhoxError::scan(
                self.line,
                lexeme,
                "invalid number format: multiple decimal points",
            ));
        }

        if dots == 0 {
            let n: i64 = lexeme.parse::<i64>().map_err(|e| {
                LhoxError::scan(self.line, lexeme, format!("invalid integer literal: {}", e))
            })?;
            self.pending = Some((TokenType::NUMBER_INT, Some(Literal::Int(n))));
        } else {
            let n: f64 = lexeme.parse::<f64>().map_err(|e| {
                LhoxError::scan(self.line, lexeme, format!("invalid float literal: {}", e))
            })?;
            self.pending = Some((TokenType::NUMBER_REAL, Some(Literal::Real(n))));
        }

        Ok(())
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while let Some(c) = self.peek_char() {
            if !(c.is_alphanumeric() || c == '_' || is_combining_mark(c)) {
                break;
            }

            self.curr += c.len_utf8();
        }

        let slice: &[u8] = &self.bytes[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .copied()
            .unwrap_or(TokenType::IDENTIFIER);

        self.set(tt);
    }
}

/// Combining diacritical mark blocks.
fn is_combining_mark(c: char) -> bool {
    matches!(
        c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F
    )
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // Emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                let offset = Offset::new(self.line, self.len());
                return Some(Ok(Token::new(TokenType::EOF, "", None, offset)));
            }

            self.start = self.curr;
            self.pending = None;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some((tt, literal)) = self.pending.take() {
                let lexeme: &str = &self.src[self.start..self.curr];
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                let offset = Offset::new(self.line, self.start);
                return Some(Ok(Token::new(tt, lexeme, literal, offset)));
            }
            // Whitespace → continue loop.
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
