//! Lazy tokenizer for MDL text.
//!
//! [`tokenize`] returns an iterator; each call starts over from the beginning
//! of the source. Comments are emitted as tokens rather than skipped.

use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    String,
    Number,
    Boolean,
    Punctuation(char),
    Comment,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Exact source slice, quotes and escapes included.
    pub lexeme: &'a str,
    /// Decoded text: unescaped contents for strings, the lexeme otherwise.
    pub value: Cow<'a, str>,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("{line}:{column}: unterminated string literal")]
    UnterminatedString { line: usize, column: usize },
    #[error("{line}:{column}: invalid escape sequence '\\{found}'")]
    InvalidEscape {
        line: usize,
        column: usize,
        found: char,
    },
    #[error("{line}:{column}: unexpected character '{found}'")]
    UnexpectedChar {
        line: usize,
        column: usize,
        found: char,
    },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            Self::UnterminatedString { line, .. }
            | Self::InvalidEscape { line, .. }
            | Self::UnexpectedChar { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Self::UnterminatedString { column, .. }
            | Self::InvalidEscape { column, .. }
            | Self::UnexpectedChar { column, .. } => *column,
        }
    }
}

const PUNCTUATION: [char; 6] = ['{', '}', '[', ']', '=', ','];

pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer::new(source)
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Whether `s` can be written without quotes as an MDL identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => {}
        _ => return false,
    }
    chars.all(is_identifier_continue) && s != "true" && s != "false"
}

/// Tokenizer state: a byte cursor plus the line/column of that cursor.
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn skip_whitespace(&mut self) {
        self.bump_while(char::is_whitespace);
    }

    fn token(
        &self,
        kind: TokenKind,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token<'a> {
        let lexeme = &self.source[start..self.pos];
        Token {
            kind,
            lexeme,
            value: Cow::Borrowed(lexeme),
            line,
            column,
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<Cow<'a, str>, LexError> {
        let source = self.source;
        let (line, column) = (self.line, self.column);
        self.bump();
        let content_start = self.pos;
        let mut decoded: Option<String> = None;
        loop {
            let Some(c) = self.peek() else {
                return Err(LexError::UnterminatedString { line, column });
            };
            if c == '\n' {
                return Err(LexError::UnterminatedString { line, column });
            }
            if c == quote {
                let raw = &source[content_start..self.pos];
                self.bump();
                return Ok(decoded.map_or(Cow::Borrowed(raw), Cow::Owned));
            }
            if c == '\\' {
                let (esc_line, esc_column) = (self.line, self.column);
                let raw_so_far = &source[content_start..self.pos];
                let buf = decoded.get_or_insert_with(|| raw_so_far.to_owned());
                self.bump();
                let escaped = match self.bump() {
                    Some('"') => '"',
                    Some('\'') => '\'',
                    Some('\\') => '\\',
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some(other) => {
                        return Err(LexError::InvalidEscape {
                            line: esc_line,
                            column: esc_column,
                            found: other,
                        })
                    }
                    None => return Err(LexError::UnterminatedString { line, column }),
                };
                buf.push(escaped);
                continue;
            }
            if let Some(buf) = decoded.as_mut() {
                buf.push(c);
            }
            self.bump();
        }
    }

    fn lex_number(&mut self) {
        if self.peek() == Some('-') {
            self.bump();
        }
        self.bump_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_follows = match self.peek_second() {
                Some(c) if c.is_ascii_digit() => true,
                Some('+' | '-') => {
                    let rest = &self.source[self.pos..];
                    rest.chars().nth(2).is_some_and(|c| c.is_ascii_digit())
                }
                _ => false,
            };
            if exponent_follows {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }
    }

    fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        self.skip_whitespace();
        let (start, line, column) = (self.pos, self.line, self.column);
        let Some(c) = self.peek() else {
            return Ok(self.token(TokenKind::EndOfInput, start, line, column));
        };

        if c == '#' || (c == '/' && self.peek_second() == Some('/')) {
            self.bump_while(|c| c != '\n');
            let mut tok = self.token(TokenKind::Comment, start, line, column);
            let trimmed = tok.lexeme.trim_end();
            tok.lexeme = trimmed;
            tok.value = Cow::Borrowed(trimmed);
            return Ok(tok);
        }

        if PUNCTUATION.contains(&c) {
            self.bump();
            return Ok(self.token(TokenKind::Punctuation(c), start, line, column));
        }

        if c == '"' || c == '\'' {
            let value = self.lex_string(c)?;
            let mut tok = self.token(TokenKind::String, start, line, column);
            tok.value = value;
            return Ok(tok);
        }

        if c.is_ascii_digit()
            || (c == '-' && self.peek_second().is_some_and(|n| n.is_ascii_digit()))
        {
            self.lex_number();
            return Ok(self.token(TokenKind::Number, start, line, column));
        }

        if is_identifier_start(c) {
            self.bump_while(is_identifier_continue);
            let lexeme = &self.source[start..self.pos];
            let kind = if lexeme == "true" || lexeme == "false" {
                TokenKind::Boolean
            } else {
                TokenKind::Identifier
            };
            return Ok(self.token(kind, start, line, column));
        }

        Err(LexError::UnexpectedChar {
            line,
            column,
            found: c,
        })
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    /// Yields tokens up to and including a single `EndOfInput`, or stops
    /// after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(tok) if tok.kind == TokenKind::EndOfInput => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(result)
    }
}
