//! The document, paragraphs, headings, blockquotes, rules and hard breaks.
use crate::commands::{toggle_block_type, toggle_wrap};
use crate::extension::Extension;
use crate::markdown::{
    indent, is_blank, BlockRule, BlockState, HardBreakStyle, MarkdownWriter, Placement, Token,
};
use crate::model::{AttrSpec, Attrs, Node, NodeSpec};

/// The top node
pub fn doc() -> Extension {
    Extension::node("doc", NodeSpec::with_content("block+"))
}

/// Text nodes
pub fn text() -> Extension {
    Extension::node("text", NodeSpec::leaf().group("inline"))
}

/// Paragraphs, the fallback block. Setext headings are read here as well, since their
/// underline can only be told apart at the end of a paragraph.
pub fn paragraph() -> Extension {
    Extension::node("paragraph", NodeSpec::with_content("inline*").group("block"))
        .block_rule(Placement::Fallback, ParagraphRule)
}

/// ATX and setext headings
pub fn heading() -> Extension {
    Extension::node(
        "heading",
        NodeSpec::with_content("inline*")
            .group("block")
            .defining()
            .attr("level", AttrSpec::int(1)),
    )
    .block_rule(Placement::Default, HeadingRule)
    .node_writer(write_heading)
    .command("heading", toggle_block_type("heading", "paragraph"))
}

fn has_line_break(node: &Node) -> bool {
    node.content().children().iter().any(|child| {
        child.type_name() == "hard_break" || child.text().map_or(false, |t| t.contains('\n'))
    })
}

/// The byte offset of a `#` run at the end of heading content that would be read as a
/// closing sequence
fn closing_sequence(content: &str) -> Option<usize> {
    let trimmed = content.trim_end();
    let without = trimmed.trim_end_matches('#');
    let spaced = without.is_empty() || without.ends_with(|c: char| c == ' ' || c == '\t');
    if without.len() < trimmed.len() && spaced {
        Some(without.len())
    } else {
        None
    }
}

/// Headings with line breaks are written in the setext form when their level allows it,
/// others on a single ATX line.
fn write_heading(w: &mut MarkdownWriter, node: &Node, _parent: &Node, _index: usize) {
    let level = node.attrs().get_int("level").unwrap_or(1).clamp(1, 6) as usize;
    if level <= 2 && has_line_break(node) {
        w.render_inline(node);
        w.ensure_new_line();
        w.write(if level == 1 { "===" } else { "---" });
    } else {
        w.write(&format!("{} ", "#".repeat(level)));
        let start = w.out().len();
        let single_line = w.single_line();
        w.set_single_line(true);
        w.render_inline_from(node, false);
        w.set_single_line(single_line);
        if let Some(at) = closing_sequence(&w.out()[start..]) {
            w.insert_str(start + at, "\\");
        }
    }
    w.close_block(node);
}

/// Block quotes, with lazy paragraph continuation
pub fn blockquote() -> Extension {
    Extension::node("blockquote", NodeSpec::with_content("block+").group("block"))
        .block_rule(Placement::Default, BlockquoteRule)
        .node_writer(|w, node, _, _| {
            w.wrap_block("> ", None, node, |w| w.render_content(node));
        })
        .command("blockquote", toggle_wrap("blockquote"))
}

/// Thematic breaks. The markup is kept so `***` stays `***`.
pub fn horizontal_rule() -> Extension {
    Extension::node(
        "horizontal_rule",
        NodeSpec::leaf()
            .group("block")
            .attr("markup", AttrSpec::string("---")),
    )
    .block_rule(Placement::Default, ThematicBreakRule)
    .node_writer(|w, node, _, _| {
        let markup = node
            .attrs()
            .get_str("markup")
            .filter(|m| thematic_break(m).is_some())
            .unwrap_or("---");
        w.write(markup);
        w.close_block(node);
    })
}

/// Hard line breaks. Trailing breaks of a textblock are not written.
pub fn hard_break() -> Extension {
    Extension::node("hard_break", NodeSpec::leaf().inline().group("inline"))
        .node_writer(write_hard_break)
}

fn write_hard_break(w: &mut MarkdownWriter, node: &Node, parent: &Node, index: usize) {
    let followed = parent
        .content()
        .children()
        .iter()
        .skip(index + 1)
        .any(|next| next.type_name() != node.type_name());
    if !followed {
        return;
    }
    if w.single_line() {
        w.text(" ", false);
        return;
    }
    match w.options().hard_break {
        HardBreakStyle::Backslash => w.write("\\\n"),
        HardBreakStyle::Spaces => w.write("  \n"),
    }
}

/// The level of a setext underline
pub(crate) fn setext_level(line: &str) -> Option<i64> {
    if indent(line) > 3 {
        return None;
    }
    let trimmed = line.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c == '=') {
        Some(1)
    } else if !trimmed.is_empty() && trimmed.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

/// The markup of a thematic break line
pub(crate) fn thematic_break(line: &str) -> Option<String> {
    if indent(line) > 3 {
        return None;
    }
    let trimmed = line.trim();
    let ch = trimmed.chars().next().filter(|c| matches!(c, '-' | '*' | '_'))?;
    let mut count = 0;
    for c in trimmed.chars() {
        if c == ch {
            count += 1;
        } else if c != ' ' && c != '\t' {
            return None;
        }
    }
    if count >= 3 {
        Some(trimmed.to_owned())
    } else {
        None
    }
}

/// Level and content of an ATX heading line
fn atx_heading(line: &str) -> Option<(i64, &str)> {
    if indent(line) > 3 {
        return None;
    }
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.is_empty() && !rest.starts_with(|c: char| c == ' ' || c == '\t') {
        return None;
    }
    let content = rest.trim();
    let without_closing = content.trim_end_matches('#');
    let content = if without_closing.is_empty() {
        ""
    } else if without_closing.ends_with(|c: char| c == ' ' || c == '\t') {
        without_closing.trim_end()
    } else {
        content
    };
    Some((hashes as i64, content))
}

fn heading_tokens(level: i64, content: &str) -> Vec<Token> {
    let markup = "#".repeat(level as usize);
    vec![
        Token::open("heading")
            .markup(&markup)
            .attrs(Attrs::new().with("level", level)),
        Token::inline(content),
        Token::close("heading").markup(&markup),
    ]
}

struct ParagraphRule;

impl BlockRule for ParagraphRule {
    fn name(&self) -> &str {
        "paragraph"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let start = state.line_index();
        let mut lines = match state.line() {
            Some(line) => vec![line.trim_start().to_owned()],
            None => return false,
        };
        let setext = state.handles("heading");
        let mut end = start + 1;
        let mut level = None;
        while let Some(line) = state.line_at(end) {
            if is_blank(line) {
                break;
            }
            if setext {
                if let Some(l) = setext_level(line) {
                    level = Some(l);
                    break;
                }
            }
            if state.interrupts_paragraph(line) {
                break;
            }
            lines.push(line.trim_start().to_owned());
            end += 1;
        }
        let text = lines.join("\n");
        let text = text.trim_end();
        match level {
            Some(level) => {
                for token in heading_tokens(level, text) {
                    state.push(token);
                }
                state.advance(end + 1 - start);
            }
            None => {
                state.push_paragraph(text);
                state.advance(end - start);
            }
        }
        true
    }
}

struct HeadingRule;

impl BlockRule for HeadingRule {
    fn name(&self) -> &str {
        "heading"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let tokens = match state.line().and_then(atx_heading) {
            Some((level, content)) => heading_tokens(level, content),
            None => return false,
        };
        for token in tokens {
            state.push(token);
        }
        state.advance(1);
        true
    }

    fn interrupts_paragraph(&self, _state: &BlockState, line: &str) -> bool {
        atx_heading(line).is_some()
    }
}

fn quote_line(line: &str) -> Option<&str> {
    if indent(line) > 3 {
        return None;
    }
    let rest = line.trim_start().strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

struct BlockquoteRule;

impl BlockRule for BlockquoteRule {
    fn name(&self) -> &str {
        "blockquote"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        if state.line().and_then(quote_line).is_none() {
            return false;
        }
        let start = state.line_index();
        let mut end = start;
        let mut inner = Vec::new();
        let mut lazy = false;
        while let Some(line) = state.line_at(end) {
            if let Some(rest) = quote_line(line) {
                lazy = !is_blank(rest);
                inner.push(rest.to_owned());
            } else if lazy && !is_blank(line) && !state.interrupts_paragraph(line) {
                inner.push(line.trim_start().to_owned());
            } else {
                break;
            }
            end += 1;
        }
        let nested = state.tokenize_nested(inner);
        state.push(Token::open("blockquote").markup(">"));
        for token in nested.tokens {
            state.push(token);
        }
        state.push(Token::close("blockquote").markup(">"));
        state.advance(end - start);
        true
    }

    fn interrupts_paragraph(&self, _state: &BlockState, line: &str) -> bool {
        quote_line(line).is_some()
    }
}

struct ThematicBreakRule;

impl BlockRule for ThematicBreakRule {
    fn name(&self) -> &str {
        "horizontal_rule"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let markup = match state.line().and_then(thematic_break) {
            Some(markup) => markup,
            None => return false,
        };
        state.push(
            Token::leaf("horizontal_rule")
                .markup(&markup)
                .attrs(Attrs::new().with("markup", markup.as_str())),
        );
        state.advance(1);
        true
    }

    fn interrupts_paragraph(&self, _state: &BlockState, line: &str) -> bool {
        thematic_break(line).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::default_schema;
    use crate::markdown::helper::Builder;
    use crate::markdown::{parse, serialize};

    #[test]
    fn test_atx_heading() {
        assert_eq!(atx_heading("# Title"), Some((1, "Title")));
        assert_eq!(atx_heading("### Title ###"), Some((3, "Title")));
        assert_eq!(atx_heading("## Title#"), Some((2, "Title#")));
        assert_eq!(atx_heading("#"), Some((1, "")));
        assert_eq!(atx_heading("#hashtag"), None);
        assert_eq!(atx_heading("####### seven"), None);
        assert_eq!(atx_heading("    # code"), None);
    }

    #[test]
    fn test_closing_sequence() {
        assert_eq!(closing_sequence("a #"), Some(2));
        assert_eq!(closing_sequence("##"), Some(0));
        assert_eq!(closing_sequence("a#"), None);
        assert_eq!(closing_sequence("a \\#"), None);
        assert_eq!(closing_sequence(""), None);
    }

    #[test]
    fn test_trailing_hashes_stay_text() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = parse(&schema, "# a \\#");
        assert_eq!(doc, b.doc(b.h(1, "a #")));
        let text = serialize(&schema, &doc);
        assert_eq!(text, "# a \\#");
        assert_eq!(parse(&schema, &text), doc);

        let doc = b.doc(b.h(2, "##"));
        let text = serialize(&schema, &doc);
        assert_eq!(text, "## \\##");
        assert_eq!(parse(&schema, &text), doc);
    }

    #[test]
    fn test_multiline_headings() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = parse(&schema, "a\nb\n===");
        assert_eq!(doc, b.doc(b.h(1, "a\nb")));
        assert_eq!(serialize(&schema, &doc), "a\nb\n===");

        let doc = parse(&schema, "a\\\nb\n---");
        assert_eq!(doc, b.doc(b.h(2, ("a", b.br(), "b"))));
        assert_eq!(serialize(&schema, &doc), "a\\\nb\n---");

        let deep = b.doc(b.h(3, "a\nb"));
        assert_eq!(serialize(&schema, &deep), "### a b");
    }

    #[test]
    fn test_thematic_break() {
        assert_eq!(thematic_break("---").as_deref(), Some("---"));
        assert_eq!(thematic_break(" * * *").as_deref(), Some("* * *"));
        assert_eq!(thematic_break("--"), None);
        assert_eq!(thematic_break("- a -"), None);
        assert_eq!(thematic_break("-*-"), None);
    }

    #[test]
    fn test_setext_level() {
        assert_eq!(setext_level("==="), Some(1));
        assert_eq!(setext_level("-- "), Some(2));
        assert_eq!(setext_level("=-"), None);
        assert_eq!(setext_level(""), None);
    }

    #[test]
    fn test_quote_line() {
        assert_eq!(quote_line("> a"), Some("a"));
        assert_eq!(quote_line(">a"), Some("a"));
        assert_eq!(quote_line(">  a"), Some(" a"));
        assert_eq!(quote_line("a"), None);
    }
}
