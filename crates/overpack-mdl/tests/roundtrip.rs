//! Round-trip and idempotence over a small corpus of hand-written MDL.

use overpack_mdl::{parse, to_mdl_string, Document, Node, Scalar, Statement, Value};

const CORPUS: &[&str] = &[
    "status = \"Active\"",
    "a=1\nb=-2.5e3\nc=true\nd=false\n",
    "Object product__v {\n  label = \"Product\"\n}\n",
    "# header\nlayout detail {section{field a {} field b {}}}\n",
    "values = [ 'x', \"y\", z, [1, 2,], ]\n",
    "picklist \"Needs Quotes\" { entry = 'it\\'s' }\n",
    "workflow wf__v {\n  // states\n  state draft { next = [review] }\n  state review {}\n}",
];

/// Pascal-style doubled quotes are two string tokens in a row.
const ADJACENT_STRINGS: &str = "picklist \"Needs Quotes\" { entry = 'it''s' }";

#[test]
fn status_scenario_parses_and_renders_literally() {
    let doc = parse("status = \"Active\"").unwrap();
    assert_eq!(
        doc.statements,
        vec![Statement::KeyValue {
            key: "status".to_owned(),
            value: Value::Scalar(Scalar::String("Active".to_owned())),
        }]
    );
    assert_eq!(to_mdl_string(&doc), "status = \"Active\"");
}

#[test]
fn reserialization_is_semantically_equivalent() {
    for src in CORPUS {
        let doc = parse(src).unwrap_or_else(|e| panic!("{src:?}: {e}"));
        let text = to_mdl_string(&doc);
        assert_eq!(parse(&text).unwrap(), doc, "source: {src:?}");
    }
}

#[test]
fn canonical_form_is_a_fixed_point() {
    for src in CORPUS {
        let doc = parse(src).unwrap_or_else(|e| panic!("{src:?}: {e}"));
        let once = to_mdl_string(&doc);
        let twice = to_mdl_string(&parse(&once).unwrap());
        assert_eq!(once, twice, "source: {src:?}");
    }
}

#[test]
fn adjacent_quoted_strings_are_rejected() {
    assert!(parse(ADJACENT_STRINGS).is_err());
}

#[test]
fn nested_lookup_after_roundtrip() {
    let doc = parse(CORPUS[6]).unwrap();
    let doc: Document = parse(&to_mdl_string(&doc)).unwrap();
    match doc.lookup_path("wf__v/draft/next") {
        Some(Node::Value(Value::List(items))) => {
            assert_eq!(items, &[Value::identifier("review")]);
        }
        other => panic!("unexpected lookup result: {other:?}"),
    }
    assert!(matches!(
        doc.lookup_path("wf__v/review"),
        Some(Node::Block(b)) if b.body.is_empty()
    ));
}
