use prosemark::commands::{apply_command, list_commands, Selection};
use prosemark::extensions::default_schema;
use prosemark::markdown::{parse, serialize};
use prosemark::model::{Attrs, Node, Schema};

fn run(schema: &Schema, name: &str, attrs: Attrs, doc: &Node, selection: Selection) -> Option<Node> {
    let factory = schema.command(name)?;
    apply_command(schema, &factory, &attrs, doc, selection)
}

#[test]
fn commands_are_listed_by_name() {
    let schema = default_schema();
    let commands = list_commands(&schema);
    for name in &[
        "heading",
        "blockquote",
        "code_block",
        "bullet_list",
        "ordered_list",
        "checkbox_list",
        "notice",
        "createTable",
        "deleteColumn",
        "createStrong",
        "createLink",
        "createEmoji",
        "createHorizontalRule",
    ] {
        assert!(commands.contains_key(*name), "missing command {}", name);
    }
    assert!(schema.command("emoji").is_some());
    assert!(schema.command("sparkle").is_none());
}

#[test]
fn editing_session() {
    let schema = default_schema();
    let doc = parse(&schema, "hello world");

    let doc = run(&schema, "createStrong", Attrs::new(), &doc, Selection::new(1, 6)).unwrap();
    assert_eq!(serialize(&schema, &doc), "**hello** world");

    let level = Attrs::new().with("level", 2i64);
    let doc = run(&schema, "heading", level, &doc, Selection::cursor(3)).unwrap();
    assert_eq!(serialize(&schema, &doc), "## **hello** world");

    let doc = run(&schema, "createTable", Attrs::new(), &doc, Selection::cursor(3)).unwrap();
    let text = serialize(&schema, &doc);
    assert_eq!(
        text,
        "## **hello** world\n\n\
         |     |     |     |\n\
         | --- | --- | --- |\n\
         |     |     |     |\n\
         |     |     |     |"
    );
    assert_eq!(parse(&schema, &text), doc);
}

#[test]
fn mark_toggles_back_and_forth() {
    let schema = default_schema();
    let doc = parse(&schema, "hello world");
    let selection = Selection::new(1, 6);
    let marked = run(&schema, "createHighlight", Attrs::new(), &doc, selection).unwrap();
    assert_eq!(serialize(&schema, &marked), "==hello== world");
    let plain = run(&schema, "createHighlight", Attrs::new(), &marked, selection).unwrap();
    assert_eq!(plain.normalized(), doc.normalized());
}

#[test]
fn insert_inline_node() {
    let schema = default_schema();
    let doc = parse(&schema, "hello world");
    let attrs = Attrs::new().with("markup", "wave");
    let doc = run(&schema, "createEmoji", attrs, &doc, Selection::cursor(7)).unwrap();
    let text = serialize(&schema, &doc);
    assert_eq!(text, "hello :wave:world");
    assert_eq!(parse(&schema, &text), doc);
}

#[test]
fn rejected_commands_leave_no_document() {
    let schema = default_schema();
    let doc = parse(&schema, "hello");
    assert_eq!(run(&schema, "createStrong", Attrs::new(), &doc, Selection::cursor(2)), None);
    assert_eq!(run(&schema, "deleteRow", Attrs::new(), &doc, Selection::cursor(2)), None);
    assert_eq!(run(&schema, "createEmoji", Attrs::new(), &doc, Selection::cursor(2)), None);
}

#[test]
fn notice_wraps_and_lifts() {
    let schema = default_schema();
    let doc = parse(&schema, "one\n\ntwo");
    let wrapped = run(&schema, "notice", Attrs::new(), &doc, Selection::new(2, 7)).unwrap();
    assert_eq!(serialize(&schema, &wrapped), ":::info\none\n\ntwo\n:::");
    let lifted = run(&schema, "notice", Attrs::new(), &wrapped, Selection::cursor(3)).unwrap();
    assert_eq!(lifted, doc);
}
