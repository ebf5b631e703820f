use prosemark::extensions::default_schema;
use prosemark::markdown::helper::Builder;
use prosemark::markdown::{parse, parse_with_diagnostics, serialize, DegradedKind};

const CANONICAL: &[&str] = &[
    "# Title",
    "Some **bold** and *em* text.",
    "> quoted",
    "```rust\nlet x = 1;\n```",
    "---",
    "- one\n- two",
    "3. three\n4. four",
    "- [ ] todo\n- [x] done",
    "$$\nx^2\n$$",
    "| Name  | Qty |\n| ----- | --: |\n| apple | 3   |",
    ":::warning Mind the gap\nBe careful.\n:::",
    "::video[Launch](https://example.com/v.mp4 \"The launch\")",
    "A ==marked== word, H~2~O and :tada:",
];

#[test]
fn canonical_blocks_round_trip() {
    let schema = default_schema();
    for text in CANONICAL {
        let doc = parse(&schema, text);
        assert_eq!(&serialize(&schema, &doc), text);
    }
}

#[test]
fn canonical_document_round_trips() {
    let schema = default_schema();
    let text = CANONICAL.join("\n\n");
    let doc = parse(&schema, &text);
    assert_eq!(doc.child_count(), CANONICAL.len());
    assert_eq!(serialize(&schema, &doc), text);
    assert_eq!(parse(&schema, &serialize(&schema, &doc)), doc);
}

#[test]
fn serialization_is_idempotent() {
    let schema = default_schema();
    let messy = "Heading\n=======\n\n*  a\n*  b\n\n\n1) x\n\n___\n\n> quote\nlazy\n\n    indented\n";
    let once = serialize(&schema, &parse(&schema, messy));
    let twice = serialize(&schema, &parse(&schema, &once));
    assert_eq!(once, twice);
}

/// Inputs whose trees sit at the edges of the syntax: marks next to their own delimiter
/// characters, pipes in table cells, directive lines in code, heading closers and blocks
/// followed by lists.
const EDGES: &[&str] = &[
    "==a\\===",
    "==\\=b== x",
    "x =",
    "a ==\\=== b",
    "| `a\\|b` | c |\n| --- | --- |\n| d | e\\|f |",
    "| `x` \\| y |\n| :-: |",
    ":::info\n```\n:::tip\n```\n:::\n\npara",
    ":::tip\n~~~\n:::\n~~~\n:::",
    "# a \\#",
    "## \\#",
    "### a \\## b",
    "a\nb\n===",
    "a\\\nb\n---",
    "p\n\n2. x",
    "# h\n\n- a",
    "> q\n\n- a\n- b",
    "```\ncode\n```\n\n1. x\n2. y",
    "- a\n\n  - b\n\n- c",
    "- a\n  1. b\n- c",
];

#[test]
fn edge_inputs_round_trip() {
    let schema = default_schema();
    for input in EDGES {
        let doc = parse(&schema, input);
        let once = serialize(&schema, &doc);
        let reparsed = parse(&schema, &once);
        assert_eq!(
            reparsed.normalized(),
            doc.normalized(),
            "{:?} was written as {:?}",
            input,
            once
        );
        assert_eq!(serialize(&schema, &reparsed), once, "{:?}", input);
    }
}

#[test]
fn blocks_before_lists_keep_a_blank_line() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let doc = b.doc((b.p("p"), b.ol(2, b.li(b.p("x")))));
    assert_eq!(serialize(&schema, &doc), "p\n\n2. x");
    let doc = b.doc((b.h(1, "h"), b.ul(b.li(b.p("a")))));
    assert_eq!(serialize(&schema, &doc), "# h\n\n- a");
}

#[test]
fn strong_emphasis_needs_flanking() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    assert_eq!(
        parse(&schema, "a **b** c"),
        b.doc(b.p(("a ", b.strong("b"), " c")))
    );
    assert_eq!(parse(&schema, "a ** b"), b.doc(b.p("a ** b")));
}

#[test]
fn plain_url_is_an_autolink() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let doc = b.doc(b.p(("see ", b.link("https://example.com", "https://example.com"))));
    let text = serialize(&schema, &doc);
    assert_eq!(text, "see <https://example.com>");
    assert_eq!(parse(&schema, &text), doc);
}

#[test]
fn special_characters_are_escaped() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let doc = b.doc((b.p("# not a heading"), b.p("1. not a list"), b.p("a*b* costs $5")));
    let text = serialize(&schema, &doc);
    assert_eq!(text, "\\# not a heading\n\n1\\. not a list\n\na\\*b\\* costs \\$5");
    assert_eq!(parse(&schema, &text), doc);
}

#[test]
fn unclosed_directive_is_closed_with_a_diagnostic() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let parsed = parse_with_diagnostics(&schema, ":::notice\nstill open");
    assert_eq!(parsed.doc, b.doc(b.notice("info", b.p("still open"))));
    assert!(parsed
        .diagnostics
        .iter()
        .any(|d| d.kind == DegradedKind::UnclosedDirective));
}

#[test]
fn empty_input_gives_a_valid_document() {
    let schema = default_schema();
    let doc = parse(&schema, "");
    assert_eq!(doc.type_name(), "doc");
    assert!(doc.child_count() > 0);
    assert_eq!(serialize(&schema, &doc), "");
}
