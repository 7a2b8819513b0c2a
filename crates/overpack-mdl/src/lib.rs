//! Tokenizer, parser, and canonical serializer for MDL, the text format of
//! VPK configuration components.
//!
//! The pipeline is `tokenize` → `parse` → [`Document`] → `to_mdl_string`.
//! Parsing is pure: no state is shared between calls, so documents can be
//! parsed from any number of threads at once.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod serialize;

pub use ast::{Block, Document, Node, Scalar, Statement, Value, PATH_SEPARATOR};
pub use lexer::{is_identifier, tokenize, LexError, Lexer, Token, TokenKind};
pub use parser::{parse, ParseError, MAX_DEPTH};
pub use serialize::{statement_to_string, to_mdl_string, value_to_string};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MdlError {
    #[error("lex error at {0}")]
    Lex(#[from] LexError),
    #[error("parse error at {0}")]
    Parse(#[from] ParseError),
}

impl MdlError {
    pub fn line(&self) -> usize {
        match self {
            Self::Lex(e) => e.line(),
            Self::Parse(e) => e.line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            Self::Lex(e) => e.column(),
            Self::Parse(e) => e.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mdl_error_display_lex() {
        let e = parse("x = 'open").unwrap_err();
        let msg = e.to_string();
        assert!(msg.starts_with("lex error at 1:5"), "{msg}");
    }

    #[test]
    fn mdl_error_display_parse() {
        let e = parse("x y z").unwrap_err();
        assert_eq!((e.line(), e.column()), (1, 5));
        assert!(e.to_string().contains("expected '{'"));
    }
}
