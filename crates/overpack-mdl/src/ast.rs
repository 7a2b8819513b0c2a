//! Syntax tree for a single MDL component definition.
//!
//! Comments are ordinary statements so that an unmodified tree serializes
//! back to the text it was parsed from.

use serde::{Deserialize, Serialize};

/// Separator used by [`Document::lookup_path`] between path segments.
pub const PATH_SEPARATOR: char = '/';

/// A parsed MDL document: an ordered list of top-level statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub statements: Vec<Statement>,
    /// Whether the source text ended with a newline.
    #[serde(default)]
    pub trailing_newline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    KeyValue { key: String, value: Value },
    Block(Block),
    /// Raw comment text including its leading marker (`//` or `#`).
    Comment { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub keyword: String,
    pub name: Option<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(Scalar),
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    String(String),
    /// Numbers keep their source lexeme so `1.50` stays `1.50`.
    Number(String),
    Boolean(bool),
    Identifier(String),
}

/// Result of a path lookup: either a block or the value of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node<'a> {
    Block(&'a Block),
    Value(&'a Value),
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Document {
    /// A document in canonical form, which ends with a newline.
    pub fn new(statements: Vec<Statement>) -> Self {
        Self {
            statements,
            trailing_newline: true,
        }
    }

    /// Resolve a slash-separated path such as `fields/Status__c/label`.
    pub fn lookup_path(&self, path: &str) -> Option<Node<'_>> {
        let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
        self.lookup(&segments)
    }

    /// Resolve a path one segment per nesting level.
    ///
    /// A segment matches a block by its name, an unnamed block by its
    /// keyword, or a key-value pair by its key. The first match wins.
    pub fn lookup<S: AsRef<str>>(&self, segments: &[S]) -> Option<Node<'_>> {
        lookup_in(&self.statements, segments)
    }

    /// Mutable access to the value stored at `segments`.
    pub fn lookup_value_mut<S: AsRef<str>>(&mut self, segments: &[S]) -> Option<&mut Value> {
        lookup_value_mut_in(&mut self.statements, segments)
    }

    /// Statements that are not comments, in source order.
    pub fn items(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter().filter(|s| !s.is_comment())
    }
}

impl Statement {
    pub fn key_value(key: impl Into<String>, value: Value) -> Self {
        Self::KeyValue {
            key: key.into(),
            value,
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::Comment { text: text.into() }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment { .. })
    }

    /// Whether this statement is addressed by `segment` in a path lookup.
    pub fn matches_segment(&self, segment: &str) -> bool {
        match self {
            Self::KeyValue { key, .. } => key == segment,
            Self::Block(block) => block.label() == segment,
            Self::Comment { .. } => false,
        }
    }
}

impl Block {
    pub fn new(keyword: impl Into<String>, name: Option<&str>, body: Vec<Statement>) -> Self {
        Self {
            keyword: keyword.into(),
            name: name.map(str::to_owned),
            body,
        }
    }

    /// The segment that addresses this block: its name, or its keyword when unnamed.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.keyword)
    }

    pub fn lookup<S: AsRef<str>>(&self, segments: &[S]) -> Option<Node<'_>> {
        lookup_in(&self.body, segments)
    }

    /// First direct child block with the given label.
    pub fn child_block(&self, label: &str) -> Option<&Block> {
        self.body.iter().find_map(|s| match s {
            Statement::Block(b) if b.label() == label => Some(b),
            _ => None,
        })
    }

    /// Value of the first direct key-value child with the given key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.body.iter().find_map(|s| match s {
            Statement::KeyValue { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(s.into()))
    }

    pub fn number(lexeme: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Number(lexeme.into()))
    }

    pub fn boolean(b: bool) -> Self {
        Self::Scalar(Scalar::Boolean(b))
    }

    pub fn identifier(s: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Identifier(s.into()))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Text of a string or identifier scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::String(s) | Scalar::Identifier(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(Scalar::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            Self::Scalar(_) => None,
        }
    }
}

fn lookup_in<'a, S: AsRef<str>>(statements: &'a [Statement], segments: &[S]) -> Option<Node<'a>> {
    let (first, rest) = segments.split_first()?;
    let found = statements
        .iter()
        .find(|s| s.matches_segment(first.as_ref()))?;
    match (found, rest.is_empty()) {
        (Statement::Block(block), true) => Some(Node::Block(block)),
        (Statement::Block(block), false) => lookup_in(&block.body, rest),
        (Statement::KeyValue { value, .. }, true) => Some(Node::Value(value)),
        _ => None,
    }
}

fn lookup_value_mut_in<'a, S: AsRef<str>>(
    statements: &'a mut [Statement],
    segments: &[S],
) -> Option<&'a mut Value> {
    let (first, rest) = segments.split_first()?;
    let found = statements
        .iter_mut()
        .find(|s| s.matches_segment(first.as_ref()))?;
    match found {
        Statement::Block(block) if !rest.is_empty() => lookup_value_mut_in(&mut block.body, rest),
        Statement::KeyValue { value, .. } if rest.is_empty() => Some(value),
        _ => None,
    }
}
