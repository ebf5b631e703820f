//! The standard constructs the serializer emits must be read the same way by an independent
//! CommonMark parser.
use prosemark::extensions::default_schema;
use prosemark::markdown::helper::Builder;
use prosemark::markdown::serialize;
use prosemark::model::Attrs;
use pulldown_cmark::{CodeBlockKind, Event, LinkType, Parser, Tag};

fn events(text: &str) -> Vec<Event> {
    Parser::new(text).collect()
}

/// The text of every paragraph
fn paragraphs(events: &[Event]) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Option<String> = None;
    for event in events {
        match event {
            Event::Start(Tag::Paragraph) => current = Some(String::new()),
            Event::End(Tag::Paragraph) => out.extend(current.take()),
            Event::Text(text) => {
                if let Some(current) = current.as_mut() {
                    current.push_str(text);
                }
            }
            _ => {}
        }
    }
    out
}

#[test]
fn standard_blocks_and_marks() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let titled = b.mark(
        "link",
        Attrs::new().with("href", "https://x.org").with("title", "Home"),
    );
    let doc = b.doc((
        b.h(2, "Title"),
        b.p((b.strong("bold"), " and ", b.em("em"), " ", b.marked("home", vec![titled]))),
        b.ol(3, vec![b.li(b.p("three")), b.li(b.p("four"))]),
        b.code_block("rust", "fn main() {}"),
        b.blockquote(b.p(("line one", b.br(), "line two"))),
        b.hr(),
        b.p(b.link("https://example.com", "https://example.com")),
    ));
    let text = serialize(&schema, &doc);
    let events = events(&text);
    let expected = [
        Event::Start(Tag::Heading(2)),
        Event::Start(Tag::Strong),
        Event::Start(Tag::Emphasis),
        Event::Start(Tag::Link(LinkType::Inline, "https://x.org".into(), "Home".into())),
        Event::Start(Tag::List(Some(3))),
        Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced("rust".into()))),
        Event::Start(Tag::BlockQuote),
        Event::HardBreak,
        Event::Rule,
        Event::Start(Tag::Link(
            LinkType::Autolink,
            "https://example.com".into(),
            "".into(),
        )),
    ];
    for event in &expected {
        assert!(events.contains(event), "{:?} missing in {:?}", event, text);
    }
    let items = events
        .iter()
        .filter(|e| matches!(e, Event::Start(Tag::Item)))
        .count();
    assert_eq!(items, 2);
}

#[test]
fn escaped_text_stays_text() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let texts = [
        "1. not a list",
        "# not a heading",
        "- not a bullet",
        "> not a quote",
        "a*b* and [x](y)",
        "snake_case stays",
        "`tick`",
    ];
    let doc = b.doc(texts.iter().map(|t| b.p(*t)).collect::<Vec<_>>());
    let text = serialize(&schema, &doc);
    let events = events(&text);
    assert!(!events.iter().any(|e| matches!(
        e,
        Event::Start(Tag::List(_))
            | Event::Start(Tag::Heading(_))
            | Event::Start(Tag::BlockQuote)
            | Event::Start(Tag::Emphasis)
            | Event::Start(Tag::Link(..))
            | Event::Code(_)
    )));
    assert_eq!(paragraphs(&events), texts);
}

#[test]
fn loose_and_tight_lists() {
    let schema = default_schema();
    let b = Builder::new(&schema);
    let loose = b.node(
        "bullet_list",
        Attrs::new().with("tight", false),
        (b.li(b.p("a")), b.li(b.p("b"))),
    );
    let doc = b.doc((b.ul((b.li(b.p("x")), b.li(b.p("y")))), b.p("between"), loose));
    let text = serialize(&schema, &doc);
    let events = events(&text);
    let lists = events
        .iter()
        .filter(|e| matches!(e, Event::Start(Tag::List(None))))
        .count();
    assert_eq!(lists, 2);
    // only the items of the loose list hold paragraphs
    assert_eq!(paragraphs(&events), vec!["between", "a", "b"]);
}
