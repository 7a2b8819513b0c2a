//! Canonical MDL rendering.
//!
//! Canonical form: one statement per line, two spaces of indentation per
//! block level, `key = value`, strings always double-quoted, lists without a
//! trailing comma, empty blocks as `keyword name {}`, comments verbatim on
//! their own line. Text produced here parses back to the same tree and
//! re-renders byte for byte.

use crate::ast::{Block, Document, Scalar, Statement, Value};
use crate::lexer::is_identifier;

const INDENT: &str = "  ";

pub fn to_mdl_string(doc: &Document) -> String {
    let mut out = String::new();
    for (i, stmt) in doc.statements.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_statement(&mut out, stmt, 0);
    }
    if doc.trailing_newline {
        out.push('\n');
    }
    out
}

/// Render one statement (and its body) at depth zero, without a final newline.
pub fn statement_to_string(stmt: &Statement) -> String {
    let mut out = String::new();
    write_statement(&mut out, stmt, 0);
    out
}

pub fn value_to_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_statement(out: &mut String, stmt: &Statement, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    match stmt {
        Statement::Comment { text } => out.push_str(text),
        Statement::KeyValue { key, value } => {
            out.push_str(key);
            out.push_str(" = ");
            write_value(out, value);
        }
        Statement::Block(block) => write_block(out, block, depth),
    }
}

fn write_block(out: &mut String, block: &Block, depth: usize) {
    out.push_str(&block.keyword);
    if let Some(name) = &block.name {
        out.push(' ');
        if is_identifier(name) {
            out.push_str(name);
        } else {
            write_string(out, name);
        }
    }
    if block.body.is_empty() {
        out.push_str(" {}");
        return;
    }
    out.push_str(" {");
    for stmt in &block.body {
        out.push('\n');
        write_statement(out, stmt, depth + 1);
    }
    out.push('\n');
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push('}');
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Scalar(scalar) => write_scalar(out, scalar),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
    }
}

fn write_scalar(out: &mut String, scalar: &Scalar) {
    match scalar {
        Scalar::String(s) => write_string(out, s),
        Scalar::Number(lexeme) => out.push_str(lexeme),
        Scalar::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Scalar::Identifier(id) => out.push_str(id),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const CANONICAL: &str = r#"// product object
Object product__v {
  label = "Product"
  active = true
  ratio = 1.50
  fields {
    # status
    field Status__c {
      values = [draft, "in review", 3]
    }
    field "Odd Name" {}
  }
}
"#;

    #[test]
    fn serializes_key_value_literally() {
        let doc = parse(r#"status = "Active""#).unwrap();
        assert_eq!(to_mdl_string(&doc), r#"status = "Active""#);
    }

    #[test]
    fn canonical_text_is_a_fixed_point() {
        let doc = parse(CANONICAL).unwrap();
        assert_eq!(to_mdl_string(&doc), CANONICAL);
    }

    #[test]
    fn hand_written_input_is_normalized() {
        let src = "Object   x{label='X'   tags=[a,b,]\n// c\n}";
        let doc = parse(src).unwrap();
        let out = to_mdl_string(&doc);
        assert_eq!(out, "Object x {\n  label = \"X\"\n  tags = [a, b]\n  // c\n}");
        assert_eq!(parse(&out).unwrap(), doc);
    }

    #[test]
    fn serialization_is_idempotent() {
        let src = "a=1\nb{c='q\\'s'\nd=[ [1] , x ]}\n";
        let once = to_mdl_string(&parse(src).unwrap());
        let twice = to_mdl_string(&parse(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn strings_are_escaped() {
        let value = Value::string("say \"hi\"\\\n");
        assert_eq!(value_to_string(&value), r#""say \"hi\"\\\n""#);
    }

    #[test]
    fn block_names_that_need_quotes_are_quoted() {
        let stmt = Statement::Block(Block::new("layout", Some("true"), vec![]));
        assert_eq!(statement_to_string(&stmt), "layout \"true\" {}");
    }

    #[test]
    fn empty_documents_keep_their_trailing_newline() {
        assert_eq!(to_mdl_string(&Document::new(vec![])), "\n");
        assert_eq!(to_mdl_string(&Document::default()), "\n");
        let bare = Document {
            statements: vec![],
            trailing_newline: false,
        };
        assert_eq!(to_mdl_string(&bare), "");

        for doc in [Document::new(vec![]), bare] {
            let text = to_mdl_string(&doc);
            assert_eq!(parse(&text).unwrap(), doc);
        }
    }
}
