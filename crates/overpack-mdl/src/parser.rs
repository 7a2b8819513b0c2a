//! Recursive-descent parser producing a [`Document`].
//!
//! One token of lookahead, no backtracking and no recovery: the first error
//! ends the parse.

use crate::ast::{Block, Document, Scalar, Statement, Value};
use crate::lexer::{tokenize, Lexer, Token, TokenKind};
use crate::MdlError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: expected {expected}, found {found}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub expected: String,
    pub found: String,
}

/// Deepest nesting of blocks and lists accepted by [`parse`].
///
/// Every layer that walks a document recurses once per level, so the limit
/// keeps those walks within the stack of a rayon worker thread.
pub const MAX_DEPTH: usize = 256;

/// Parse MDL source text into a document.
pub fn parse(source: &str) -> Result<Document, MdlError> {
    let mut parser = Parser::new(tokenize(source))?;
    let statements = parser.statements(false)?;
    Ok(Document {
        statements,
        trailing_newline: source.ends_with('\n'),
    })
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(mut lexer: Lexer<'a>) -> Result<Self, MdlError> {
        let current = next_from(&mut lexer)?;
        Ok(Self {
            lexer,
            current,
            depth: 0,
        })
    }

    /// Consume the lookahead token and load the next one.
    fn advance(&mut self) -> Result<Token<'a>, MdlError> {
        let next = next_from(&mut self.lexer)?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, expected: &str) -> MdlError {
        MdlError::Parse(ParseError {
            line: self.current.line,
            column: self.current.column,
            expected: expected.to_owned(),
            found: describe(&self.current),
        })
    }

    /// Enter one block or list level, failing past [`MAX_DEPTH`].
    fn descend(&mut self) -> Result<(), MdlError> {
        if self.depth == MAX_DEPTH {
            return Err(self.error(&format!("nesting depth <= {MAX_DEPTH}")));
        }
        self.depth += 1;
        Ok(())
    }

    fn at_punct(&self, c: char) -> bool {
        self.current.kind == TokenKind::Punctuation(c)
    }

    fn expect_punct(&mut self, c: char) -> Result<Token<'a>, MdlError> {
        if self.at_punct(c) {
            self.advance()
        } else {
            Err(self.error(&format!("'{c}'")))
        }
    }

    /// Statements until end of input (top level) or a closing brace (block body).
    fn statements(&mut self, in_block: bool) -> Result<Vec<Statement>, MdlError> {
        let mut out = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::EndOfInput if !in_block => return Ok(out),
                TokenKind::Punctuation('}') if in_block => return Ok(out),
                TokenKind::Comment => {
                    let tok = self.advance()?;
                    out.push(Statement::comment(tok.lexeme));
                }
                TokenKind::Identifier => out.push(self.statement()?),
                _ if in_block => return Err(self.error("statement or '}'")),
                _ => return Err(self.error("statement")),
            }
        }
    }

    /// Block or key-value; the token after the leading identifier decides.
    fn statement(&mut self) -> Result<Statement, MdlError> {
        let head = self.advance()?;
        match self.current.kind {
            TokenKind::Punctuation('=') => {
                self.advance()?;
                let value = self.value()?;
                Ok(Statement::key_value(head.lexeme, value))
            }
            TokenKind::Punctuation('{') => self.block_body(head.lexeme, None),
            TokenKind::Identifier | TokenKind::String => {
                let name = self.advance()?;
                if self.at_punct('{') {
                    self.block_body(head.lexeme, Some(name.value.into_owned()))
                } else {
                    Err(self.error("'{'"))
                }
            }
            _ => Err(self.error("'=', '{' or block name")),
        }
    }

    fn block_body(&mut self, keyword: &str, name: Option<String>) -> Result<Statement, MdlError> {
        self.descend()?;
        self.expect_punct('{')?;
        let body = self.statements(true)?;
        self.expect_punct('}')?;
        self.depth -= 1;
        Ok(Statement::Block(Block {
            keyword: keyword.to_owned(),
            name,
            body,
        }))
    }

    fn value(&mut self) -> Result<Value, MdlError> {
        let scalar = match self.current.kind {
            TokenKind::String => Scalar::String(self.advance()?.value.into_owned()),
            TokenKind::Number => Scalar::Number(self.advance()?.lexeme.to_owned()),
            TokenKind::Boolean => Scalar::Boolean(self.advance()?.lexeme == "true"),
            TokenKind::Identifier => Scalar::Identifier(self.advance()?.lexeme.to_owned()),
            TokenKind::Punctuation('[') => return self.list(),
            _ => return Err(self.error("value")),
        };
        Ok(Value::Scalar(scalar))
    }

    /// `[a, b, c]`, tolerating one trailing comma.
    fn list(&mut self) -> Result<Value, MdlError> {
        self.descend()?;
        self.expect_punct('[')?;
        let mut items = Vec::new();
        while !self.at_punct(']') {
            items.push(self.value()?);
            if self.at_punct(',') {
                self.advance()?;
            } else if !self.at_punct(']') {
                return Err(self.error("',' or ']'"));
            }
        }
        self.advance()?;
        self.depth -= 1;
        Ok(Value::List(items))
    }
}

fn next_from<'a>(lexer: &mut Lexer<'a>) -> Result<Token<'a>, MdlError> {
    match lexer.next() {
        Some(result) => Ok(result?),
        // The lexer ends with EndOfInput; only a parser bug reads past it.
        None => Err(MdlError::Parse(ParseError {
            line: 0,
            column: 0,
            expected: "token".to_owned(),
            found: "end of token stream".to_owned(),
        })),
    }
}

fn describe(tok: &Token<'_>) -> String {
    match tok.kind {
        TokenKind::EndOfInput => "end of input".to_owned(),
        TokenKind::Identifier => format!("identifier '{}'", tok.lexeme),
        TokenKind::String => format!("string {}", tok.lexeme),
        TokenKind::Number => format!("number {}", tok.lexeme),
        TokenKind::Boolean => format!("boolean {}", tok.lexeme),
        TokenKind::Punctuation(c) => format!("'{c}'"),
        TokenKind::Comment => "comment".to_owned(),
    }
}
