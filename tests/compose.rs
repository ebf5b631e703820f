use prosemark::extension::{compose_schema, compose_schema_with, Extension, SchemaError};
use prosemark::extensions::{basic, default_extensions};
use prosemark::markdown::{
    parse, serialize, HardBreakStyle, InlineRule, InlineState, MarkWriter, MarkdownOptions,
    Placement,
};
use prosemark::model::{MarkSpec, NodeSpec};

fn base() -> Vec<Extension> {
    vec![basic::doc(), basic::paragraph(), basic::text()]
}

#[test]
fn duplicate_names_conflict() {
    let mut exts = base();
    exts.push(Extension::mark("paragraph", MarkSpec::default()));
    assert!(matches!(
        compose_schema(&exts),
        Err(SchemaError::SchemaConflict(_))
    ));
}

#[test]
fn unknown_group_is_unsatisfiable() {
    let mut exts = base();
    exts.push(Extension::node(
        "figure",
        NodeSpec::with_content("caption_group").group("block"),
    ));
    assert_eq!(
        compose_schema(&exts).unwrap_err(),
        SchemaError::SchemaUnsatisfiable {
            node: "figure".into(),
            name: "caption_group".into()
        }
    );
}

#[test]
fn missing_top_node() {
    let exts = vec![basic::paragraph(), basic::text()];
    assert_eq!(compose_schema(&exts).unwrap_err(), SchemaError::MissingTopNode);
}

#[test]
fn claimed_delimiter_conflicts() {
    let mut exts = default_extensions();
    exts.push(Extension::mark("mark", MarkSpec::default()).delimiter("=="));
    assert!(matches!(
        compose_schema(&exts),
        Err(SchemaError::SchemaConflict(_))
    ));
}

struct Noop;

impl InlineRule for Noop {
    fn name(&self) -> &str {
        "noop"
    }

    fn markers(&self) -> Vec<char> {
        vec!['%']
    }

    fn run(&self, _state: &mut InlineState) -> bool {
        false
    }
}

#[test]
fn unknown_rule_anchor() {
    let mut exts = base();
    exts.push(
        Extension::mark("percent", MarkSpec::default())
            .inline_rule(Placement::Before("missing".into()), Noop),
    );
    assert_eq!(
        compose_schema(&exts).unwrap_err(),
        SchemaError::UnknownRuleAnchor {
            rule: "noop".into(),
            anchor: "missing".into()
        }
    );
}

#[test]
fn rule_placed_before_an_anchor() {
    let mut exts = base();
    exts.push(
        Extension::mark("percent", MarkSpec::default())
            .inline_rule(Placement::Before("escape".into()), Noop),
    );
    let schema = compose_schema(&exts).unwrap();
    let names = schema.grammar().inline_rule_names();
    let noop = names.iter().position(|n| *n == "noop").unwrap();
    let escape = names.iter().position(|n| *n == "escape").unwrap();
    assert!(noop < escape);
}

#[test]
fn custom_delimiter_mark_round_trips() {
    let mut exts = default_extensions();
    exts.push(
        Extension::mark("spoiler", MarkSpec::default())
            .delimiter("||")
            .mark_writer(MarkWriter::new("||", "||")),
    );
    let schema = compose_schema(&exts).unwrap();
    let doc = parse(&schema, "a ||secret|| b");
    let para = doc.child(0).unwrap();
    let secret = para.child(1).unwrap();
    assert_eq!(secret.text(), Some("secret"));
    assert!(secret.marks().find("spoiler").is_some());
    assert_eq!(serialize(&schema, &doc), "a ||secret|| b");
    assert!(schema.command("createSpoiler").is_some());
}

#[test]
fn options_change_the_output() {
    let options = MarkdownOptions {
        bullet: '*',
        hard_break: HardBreakStyle::Spaces,
        ..MarkdownOptions::default()
    };
    let schema = compose_schema_with(&default_extensions(), options).unwrap();
    let doc = parse(&schema, "- a\\\n  b");
    assert_eq!(serialize(&schema, &doc), "* a  \n  b");
}

#[test]
fn options_load_from_json() {
    let options: MarkdownOptions =
        serde_json::from_str(r#"{"pad_tables": false, "hard_break": "spaces"}"#).unwrap();
    assert!(!options.pad_tables);
    assert_eq!(options.hard_break, HardBreakStyle::Spaces);
    assert_eq!(options.bullet, '-');
}
