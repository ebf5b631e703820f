//! Inline marks. The order of the extensions in [`default_extensions`](super::default_extensions)
//! is their rank.
use crate::extension::Extension;
use crate::markdown::{
    label_end, link_target, Escape, InlineRule, InlineState, MarkWriter, MarkdownWriter,
    Placement, Token,
};
use crate::model::{AttrKind, AttrSpec, Attrs, Mark, MarkSpec, Node};
use crate::util::has_scheme;

fn delimited(name: &str, delims: &[&str], writer: MarkWriter) -> Extension {
    delims
        .iter()
        .fold(Extension::mark(name, MarkSpec::default()), |ext, delim| {
            ext.delimiter(delim)
        })
        .mark_writer(writer)
}

/// Strong emphasis, `**text**`
pub fn strong() -> Extension {
    delimited(
        "strong",
        &["**"],
        MarkWriter::new("**", "**").mixable().expel_whitespace(),
    )
}

/// Emphasis, `*text*` or `_text_`
pub fn em() -> Extension {
    delimited(
        "em",
        &["*", "_"],
        MarkWriter::new("*", "*").mixable().expel_whitespace(),
    )
}

/// Underline, `__text__`
pub fn underline() -> Extension {
    delimited("underline", &["__"], MarkWriter::new("__", "__").expel_whitespace())
}

/// Strikethrough, `~~text~~`
pub fn strikethrough() -> Extension {
    delimited("strikethrough", &["~~"], MarkWriter::new("~~", "~~").expel_whitespace())
}

/// Highlight, `==text==`. A `=` at either end of a text can meet `==` markup of a
/// neighbour, so it is escaped as well.
pub fn highlight() -> Extension {
    delimited("highlight", &["=="], MarkWriter::new("==", "==").expel_whitespace()).escape(
        Escape::when('=', |text, at| {
            at == 0
                || at + 1 == text.len()
                || text[..at].ends_with('=')
                || text[at + 1..].starts_with('=')
        }),
    )
}

/// Subscript, `~text~`
pub fn subscript() -> Extension {
    delimited("subscript", &["~"], MarkWriter::new("~", "~"))
}

/// Superscript, `^text^`
pub fn superscript() -> Extension {
    delimited("superscript", &["^"], MarkWriter::new("^", "^")).escape(Escape::always('^'))
}

/// Links, `[text](href "title")` and `<href>`
pub fn link() -> Extension {
    Extension::mark(
        "link",
        MarkSpec::default()
            .exclusive_end()
            .attr("href", AttrSpec::required(AttrKind::String))
            .attr("title", AttrSpec::optional_string()),
    )
    .inline_rule(Placement::Default, LinkRule)
    .inline_rule(Placement::Default, AutolinkRule)
    .escape(Escape::when('<', |text, at| {
        text[at + 1..].starts_with(|c: char| c.is_ascii_alphabetic())
    }))
    .mark_writer(MarkWriter::with(open_link, close_link))
}

/// Escape a destination so it reads back as one. Empty destinations and destinations with
/// whitespace are written in angle brackets.
pub(crate) fn escape_href(href: &str) -> String {
    let mut out = String::with_capacity(href.len());
    for c in href.chars() {
        if matches!(c, '(' | ')' | '\\' | '<' | '>') {
            out.push('\\');
        }
        out.push(c);
    }
    if href.is_empty() || href.contains(char::is_whitespace) {
        format!("<{}>", out)
    } else {
        out
    }
}

/// Whether the link around `parent.child(index)` can be written as `<href>`
fn is_plain_url(mark: &Mark, parent: &Node, index: usize) -> bool {
    let attrs = mark.attrs();
    let href = match attrs.get_str("href") {
        Some(href) => href,
        None => return false,
    };
    let node = match parent.child(index) {
        Some(node) => node,
        None => return false,
    };
    node.text() == Some(href)
        && attrs.get_str("title").is_none()
        && has_scheme(href)
        && !href.contains(|c: char| c.is_whitespace() || c == '<' || c == '>')
        && node.marks().as_slice().last() == Some(mark)
        && parent
            .child(index + 1)
            .map(|next| !mark.is_in_set(next.marks()))
            .unwrap_or(true)
}

fn open_link(w: &mut MarkdownWriter, mark: &Mark, parent: &Node, index: usize) -> String {
    if is_plain_url(mark, parent, index) {
        w.set_in_autolink(true);
        "<".to_owned()
    } else {
        "[".to_owned()
    }
}

fn close_link(w: &mut MarkdownWriter, mark: &Mark, _parent: &Node, _index: usize) -> String {
    if w.in_autolink() {
        w.set_in_autolink(false);
        return ">".to_owned();
    }
    let attrs = mark.attrs();
    let title = attrs
        .get_str("title")
        .map(|t| format!(" {}", w.quote(t)))
        .unwrap_or_default();
    format!("]({}{})", escape_href(attrs.get_str("href").unwrap_or("")), title)
}

struct LinkRule;

impl InlineRule for LinkRule {
    fn name(&self) -> &str {
        "link"
    }

    fn markers(&self) -> Vec<char> {
        vec!['[']
    }

    fn run(&self, state: &mut InlineState) -> bool {
        let rest = state.rest();
        let end = match label_end(rest) {
            Some(end) => end,
            None => return false,
        };
        let target = match link_target(&rest[end + 1..]) {
            Some(target) => target,
            None => return false,
        };
        let inner = match state.tokenize_nested(&rest[1..end]) {
            Some(inner) => inner,
            None => return false,
        };
        let attrs = Attrs::new()
            .with("href", target.href.as_str())
            .with("title", target.title.clone());
        state.push(Token::open("link").attrs(attrs));
        state.push_all(inner);
        state.push(Token::close("link"));
        state.advance(end + 1 + target.len);
        true
    }
}

struct AutolinkRule;

impl InlineRule for AutolinkRule {
    fn name(&self) -> &str {
        "autolink"
    }

    fn markers(&self) -> Vec<char> {
        vec!['<']
    }

    fn run(&self, state: &mut InlineState) -> bool {
        let rest = state.rest();
        let end = match rest.find('>') {
            Some(end) => end,
            None => return false,
        };
        let href = &rest[1..end];
        if href.contains(|c: char| c.is_whitespace() || c == '<') || !has_scheme(href) {
            return false;
        }
        state.push(Token::open("link").markup("autolink").attrs(Attrs::new().with("href", href)));
        state.push(Token::text(href));
        state.push(Token::close("link").markup("autolink"));
        state.advance(end + 1);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::default_schema;
    use crate::markdown::helper::Builder;
    use crate::markdown::{parse, serialize};

    #[test]
    fn test_escape_href() {
        assert_eq!(escape_href("https://x.org/a"), "https://x.org/a");
        assert_eq!(escape_href("x(1)"), "x\\(1\\)");
        assert_eq!(escape_href("a b"), "<a b>");
        assert_eq!(escape_href(""), "<>");
    }

    #[test]
    fn test_emphasis_round_trip() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let text = "**bold** and *it*";
        let doc = parse(&schema, text);
        assert_eq!(doc, b.doc(b.p((b.strong("bold"), " and ", b.em("it")))));
        assert_eq!(serialize(&schema, &doc), text);
    }

    #[test]
    fn test_tilde_marks() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let strike = b.mark("strikethrough", Attrs::new());
        let sub = b.mark("subscript", Attrs::new());
        let text = "~~gone~~ H~2~O";
        let doc = parse(&schema, text);
        assert_eq!(
            doc,
            b.doc(b.p((
                b.marked("gone", vec![strike]),
                " H",
                b.marked("2", vec![sub]),
                "O"
            )))
        );
        assert_eq!(serialize(&schema, &doc), text);
    }

    #[test]
    fn test_highlight_and_superscript() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let mark = b.mark("highlight", Attrs::new());
        let sup = b.mark("superscript", Attrs::new());
        let doc = b.doc(b.p((b.marked("key", vec![mark]), " x", b.marked("2", vec![sup]))));
        let text = serialize(&schema, &doc);
        assert_eq!(text, "==key== x^2^");
        assert_eq!(parse(&schema, &text), doc);

        let plain = b.doc(b.p("a == b ^ c"));
        let text = serialize(&schema, &plain);
        assert_eq!(text, "a \\=\\= b \\^ c");
        assert_eq!(parse(&schema, &text), plain);
    }

    #[test]
    fn test_equals_at_highlight_edges() {
        let schema = default_schema();
        let doc = parse(&schema, "==a\\=== and ==\\=b==");
        let b = Builder::new(&schema);
        let mark = b.mark("highlight", Attrs::new());
        let expected = b.doc(b.p((
            b.marked("a=", vec![mark.clone()]),
            " and ",
            b.marked("=b", vec![mark]),
        )));
        assert_eq!(doc, expected);
        let text = serialize(&schema, &doc);
        assert_eq!(text, "==a\\=== and ==\\=b==");
        assert_eq!(parse(&schema, &text), doc);

        let plain = b.doc(b.p("x = y ="));
        let text = serialize(&schema, &plain);
        assert_eq!(text, "x = y \\=");
        assert_eq!(parse(&schema, &text), plain);
    }

    #[test]
    fn test_links() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let titled = b.mark(
            "link",
            Attrs::new().with("href", "https://x.com").with("title", "Home"),
        );
        let doc = b.doc(b.p((
            b.marked("home", vec![titled]),
            " and ",
            b.link("https://y.org", "https://y.org"),
        )));
        let text = serialize(&schema, &doc);
        assert_eq!(text, "[home](https://x.com \"Home\") and <https://y.org>");
        assert_eq!(parse(&schema, &text), doc);
    }

    #[test]
    fn test_link_text_that_differs_from_href() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p(b.link("https://y.org", "y.org")));
        assert_eq!(serialize(&schema, &doc), "[y.org](https://y.org)");
    }

    #[test]
    fn test_angle_bracket_escape() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("a <b> 1 < 2"));
        let text = serialize(&schema, &doc);
        assert_eq!(text, "a \\<b> 1 < 2");
        assert_eq!(parse(&schema, &text), doc);
        assert_eq!(parse(&schema, "<not a link>"), b.doc(b.p("<not a link>")));
    }
}
