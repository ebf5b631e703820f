use prosemark::extensions::default_schema;
use prosemark::markdown::helper::Builder;
use prosemark::markdown::parse;
use prosemark::model::{record_to_tree, tree_to_record, NodeRecord, RecordError};
use serde_json::json;

#[test]
fn parsed_documents_round_trip_through_json() {
    let schema = default_schema();
    let doc = parse(
        &schema,
        "# Title\n\n- [x] done\n\n| a | b |\n| - | :-: |\n| 1 | 2 |\n\n:::tip Note\nSee [docs](https://x.org \"Docs\").\n:::",
    );
    let text = serde_json::to_string(&tree_to_record(&doc)).unwrap();
    let record: NodeRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(record_to_tree(&schema, &record).unwrap(), doc);
}

#[test]
fn records_are_exact() {
    let schema = default_schema();
    let value = json!({
        "type": "doc",
        "content": [{
            "type": "heading",
            "attrs": { "level": 2 },
            "content": [
                { "type": "text", "text": "a" },
                { "type": "text", "text": "b", "marks": [{ "type": "strong" }] },
                { "type": "text", "text": "c" }
            ]
        }]
    });
    let record: NodeRecord = serde_json::from_value(value.clone()).unwrap();
    let doc = record_to_tree(&schema, &record).unwrap();
    assert_eq!(doc.child(0).unwrap().child_count(), 3);
    assert_eq!(serde_json::to_value(tree_to_record(&doc)).unwrap(), value);
}

#[test]
fn adjacent_text_is_not_merged() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let doc = b.doc(b.p(("a", "b")));
    let record = tree_to_record(&doc);
    assert_eq!(record.content[0].content.len(), 2);
    assert_eq!(record_to_tree(&schema, &record).unwrap(), doc);
}

#[test]
fn defaults_are_written_in_full() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let record = tree_to_record(&b.doc(b.notice("tip", b.p("x"))));
    let attrs = &record.content[0].attrs;
    assert_eq!(attrs.get_str("style"), Some("tip"));
    assert!(attrs.get("title").unwrap().is_null());
}

#[test]
fn invalid_records_are_rejected() {
    let schema = default_schema();
    let unknown: NodeRecord = serde_json::from_value(json!({ "type": "sparkle" })).unwrap();
    assert_eq!(
        record_to_tree(&schema, &unknown).unwrap_err(),
        RecordError::UnknownNodeType("sparkle".into())
    );

    let no_text: NodeRecord = serde_json::from_value(json!({ "type": "text" })).unwrap();
    assert_eq!(record_to_tree(&schema, &no_text).unwrap_err(), RecordError::MissingText);

    let loose_text: NodeRecord = serde_json::from_value(json!({
        "type": "doc",
        "content": [{ "type": "text", "text": "x" }]
    }))
    .unwrap();
    assert_eq!(
        record_to_tree(&schema, &loose_text).unwrap_err(),
        RecordError::InvalidContent("doc".into())
    );

    let bad_attr: NodeRecord = serde_json::from_value(json!({
        "type": "heading",
        "attrs": { "level": "two" }
    }))
    .unwrap();
    assert!(matches!(
        record_to_tree(&schema, &bad_attr),
        Err(RecordError::InvalidAttrs { .. })
    ));

    let mark: NodeRecord = serde_json::from_value(json!({
        "type": "text",
        "text": "x",
        "marks": [{ "type": "link" }]
    }))
    .unwrap();
    assert!(matches!(
        record_to_tree(&schema, &mark),
        Err(RecordError::InvalidAttrs { .. })
    ));
}
