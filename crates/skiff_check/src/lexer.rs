//! Lexical analysis.
//!
//! Produces tokens for the whole file in one pass. Whitespace and comments
//! are skipped, except `/// <reference path="..." />`, which becomes a
//! [`TokenKind::ReferencePath`] token spanning the path. Problems are
//! collected and the offending input becomes a [`TokenKind::Error`] token,
//! so the parser always sees a complete stream ending in [`TokenKind::Eof`].

use crate::codes::{Problem, INVALID_CHARACTER, UNTERMINATED_STRING};
use crate::span::Span;
use crate::token::{lookup_keyword, Token, TokenKind};

/// Lexes `source` into tokens, appending problems to `problems`.
pub fn lex(source: &str, problems: &mut Vec<Problem>) -> Vec<Token> {
    let mut lexer = Lexer {
        source: source.as_bytes(),
        pos: 0,
        problems,
    };
    lexer.lex_all()
}

struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    problems: &'a mut Vec<Problem>,
}

impl Lexer<'_> {
    fn lex_all(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            if let Some(reference) = self.skip_trivia() {
                tokens.push(reference);
                continue;
            }
            if self.pos >= self.source.len() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: self.span_from(self.pos),
                });
                return tokens;
            }
            tokens.push(self.next_token());
        }
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.source.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    /// Skips whitespace and comments. Returns a reference token if a
    /// triple-slash reference directive was skipped.
    fn skip_trivia(&mut self) -> Option<Token> {
        loop {
            while self.peek().is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'/' {
                let start = self.pos;
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                if let Some(token) = reference_path(self.source, start, self.pos) {
                    return Some(token);
                }
                continue;
            }
            if self.peek() == b'/' && self.peek_at(1) == b'*' {
                self.pos += 2;
                while self.pos < self.source.len() && !(self.peek() == b'*' && self.peek_at(1) == b'/') {
                    self.pos += 1;
                }
                self.pos = (self.pos + 2).min(self.source.len());
                continue;
            }
            return None;
        }
    }

    fn next_token(&mut self) -> Token {
        let start = self.pos;
        let b = self.peek();
        if is_ident_start(b) {
            while is_ident_char(self.peek()) {
                self.pos += 1;
            }
            let word = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
            let kind = lookup_keyword(word).unwrap_or(TokenKind::Identifier);
            return Token {
                kind,
                span: self.span_from(start),
            };
        }
        if b.is_ascii_digit() || (b == b'.' && self.peek_at(1).is_ascii_digit()) {
            return self.lex_number(start);
        }
        if b == b'"' || b == b'\'' {
            return self.lex_string(start, b);
        }

        let (kind, len) = match (b, self.peek_at(1), self.peek_at(2)) {
            (b'=', b'=', b'=') => (TokenKind::EqEqEq, 3),
            (b'=', b'=', _) => (TokenKind::EqEq, 2),
            (b'=', _, _) => (TokenKind::Eq, 1),
            (b'{', _, _) => (TokenKind::LeftBrace, 1),
            (b'}', _, _) => (TokenKind::RightBrace, 1),
            (b'(', _, _) => (TokenKind::LeftParen, 1),
            (b')', _, _) => (TokenKind::RightParen, 1),
            (b',', _, _) => (TokenKind::Comma, 1),
            (b';', _, _) => (TokenKind::Semicolon, 1),
            (b':', _, _) => (TokenKind::Colon, 1),
            (b'.', _, _) => (TokenKind::Dot, 1),
            (b'*', _, _) => (TokenKind::Star, 1),
            (b'+', _, _) => (TokenKind::Plus, 1),
            (b'-', _, _) => (TokenKind::Minus, 1),
            (b'/', _, _) => (TokenKind::Slash, 1),
            (b'!', _, _) => (TokenKind::Bang, 1),
            (b'<', _, _) => (TokenKind::Lt, 1),
            (b'>', _, _) => (TokenKind::Gt, 1),
            _ => (TokenKind::Error, char_len(b)),
        };
        self.pos = (self.pos + len).min(self.source.len());
        let span = self.span_from(start);
        if kind == TokenKind::Error {
            let text = String::from_utf8_lossy(&self.source[start..self.pos]);
            self.problems.push(Problem::new(
                INVALID_CHARACTER,
                format!("invalid character '{text}'"),
                span,
            ));
        }
        Token { kind, span }
    }

    fn lex_number(&mut self, start: usize) -> Token {
        while self.peek().is_ascii_digit() || self.peek() == b'_' {
            self.pos += 1;
        }
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            self.pos += 1;
            while self.peek().is_ascii_digit() {
                self.pos += 1;
            }
        }
        Token {
            kind: TokenKind::Number,
            span: self.span_from(start),
        }
    }

    fn lex_string(&mut self, start: usize, quote: u8) -> Token {
        self.pos += 1;
        loop {
            match self.peek() {
                0 if self.pos >= self.source.len() => break,
                b'\n' => break,
                b'\\' => self.pos = (self.pos + 1 + char_len(self.peek_at(1))).min(self.source.len()),
                b if b == quote => {
                    self.pos += 1;
                    return Token {
                        kind: TokenKind::String,
                        span: self.span_from(start),
                    };
                }
                _ => self.pos += 1,
            }
        }
        let span = self.span_from(start);
        self.problems.push(Problem::new(
            UNTERMINATED_STRING,
            "unterminated string literal",
            span,
        ));
        Token {
            kind: TokenKind::String,
            span,
        }
    }
}

/// Recognizes `/// <reference path="x" />` in the comment `source[start..end]`.
fn reference_path(source: &[u8], start: usize, end: usize) -> Option<Token> {
    let comment = std::str::from_utf8(&source[start..end]).ok()?;
    let rest = comment.strip_prefix("///")?.trim_start();
    let rest = rest.strip_prefix("<reference")?.trim_start();
    let rest = rest.strip_prefix("path")?.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &rest[1..];
    let len = body.find(quote)?;
    let path_start = end - rest.len() + 1;
    Some(Token {
        kind: TokenKind::ReferencePath,
        span: Span::new(path_start as u32, (path_start + len) as u32),
    })
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Byte length of the UTF-8 character starting with `b`.
fn char_len(b: u8) -> usize {
    match b {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}
