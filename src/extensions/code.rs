//! Code blocks, code spans and math.
use crate::commands::toggle_block_type;
use crate::extension::Extension;
use crate::markdown::{
    fence_open, indent, is_blank, is_fence_close, strip_indent, BlockRule, BlockState, Escape,
    InlineRule, InlineState, MarkWriter, Placement, Token,
};
use crate::model::{AttrSpec, Attrs, MarkSpec, Node, NodeSpec};
use crate::util::longest_run;

/// Fenced and indented code blocks
pub fn code_block() -> Extension {
    Extension::node(
        "code_block",
        NodeSpec::with_content("text*")
            .group("block")
            .marks("")
            .code()
            .defining()
            .attr("language", AttrSpec::optional_string()),
    )
    .block_rule(Placement::Default, FenceRule)
    .block_rule(Placement::Default, IndentedCodeRule)
    .node_writer(|w, node, _, _| {
        let text = node.text_content();
        let fence = "`".repeat(usize::max(3, longest_run(&text, '`') + 1));
        let language = node.attrs().get_str("language").unwrap_or("");
        w.write(&format!("{}{}", fence, language));
        w.ensure_new_line();
        if !text.is_empty() {
            w.text(&format!("{}\n", text), false);
        }
        w.write(&fence);
        w.close_block(node);
    })
    .command("code_block", toggle_block_type("code_block", "paragraph"))
}

/// `$$` display math
pub fn math_block() -> Extension {
    Extension::node(
        "math_block",
        NodeSpec::with_content("text*")
            .group("block")
            .marks("")
            .code(),
    )
    .block_rule(Placement::Default, MathBlockRule)
    .node_writer(|w, node, _, _| {
        let text = node.text_content();
        w.write("$$");
        w.ensure_new_line();
        if !text.is_empty() {
            w.text(&format!("{}\n", text), false);
        }
        w.write("$$");
        w.close_block(node);
    })
}

/// `$..$` inline math
pub fn math_inline() -> Extension {
    Extension::node(
        "math_inline",
        NodeSpec::with_content("text*")
            .group("inline")
            .inline()
            .marks("")
            .code()
            .atom(),
    )
    .inline_rule(Placement::Default, MathInlineRule)
    .escape(Escape::always('$'))
    .node_writer(|w, node, _, _| {
        w.text(&format!("${}$", node.text_content()), false);
    })
}

/// Code spans
pub fn code_inline() -> Extension {
    Extension::mark("code_inline", MarkSpec::default())
        .inline_rule(Placement::Default, CodeSpanRule)
        .mark_writer(
            MarkWriter::with(
                |_, _, parent, index| backticks(parent.child(index), true),
                |_, _, parent, index| {
                    backticks(index.checked_sub(1).and_then(|i| parent.child(i)), false)
                },
            )
            .no_escape(),
        )
}

/// The fence of a code span around the text of `node`
fn backticks(node: Option<&Node>, open: bool) -> String {
    let text = node.and_then(Node::text).unwrap_or("");
    let run = longest_run(text, '`');
    let fence = "`".repeat(run + 1);
    let pad = run > 0
        || (text.starts_with(' ') && text.ends_with(' ') && !text.trim().is_empty());
    match (pad, open) {
        (false, _) => fence,
        (true, true) => format!("{} ", fence),
        (true, false) => format!(" {}", fence),
    }
}

struct FenceRule;

impl BlockRule for FenceRule {
    fn name(&self) -> &str {
        "fence"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let (ch, len, base, info) = match state.line().and_then(fence_open) {
            Some((ch, len, base, info)) => (ch, len, base, info.to_owned()),
            None => return false,
        };
        let start = state.line_index();
        let mut end = start + 1;
        let mut lines = Vec::new();
        let mut closed = false;
        while let Some(line) = state.line_at(end) {
            if is_fence_close(line, ch, len) {
                closed = true;
                break;
            }
            lines.push(strip_indent(line, base));
            end += 1;
        }
        let language = info.split_whitespace().next().map(crate::markdown::unescape);
        let fence: String = std::iter::repeat(ch).take(len).collect();
        state.push(
            Token::leaf("code_block")
                .content(&lines.join("\n"))
                .info(&info)
                .markup(&fence)
                .attrs(Attrs::new().with("language", language)),
        );
        state.advance(end + usize::from(closed) - start);
        true
    }

    fn interrupts_paragraph(&self, _state: &BlockState, line: &str) -> bool {
        fence_open(line).is_some()
    }
}

struct IndentedCodeRule;

impl BlockRule for IndentedCodeRule {
    fn name(&self) -> &str {
        "code"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        match state.line() {
            Some(line) if indent(line) >= 4 && !is_blank(line) => {}
            _ => return false,
        }
        let start = state.line_index();
        let mut end = start;
        let mut lines = Vec::new();
        while let Some(line) = state.line_at(end) {
            if is_blank(line) {
                lines.push(String::new());
            } else if indent(line) >= 4 {
                lines.push(strip_indent(line, 4));
            } else {
                break;
            }
            end += 1;
        }
        while lines.last().map(|l| is_blank(l)).unwrap_or(false) {
            lines.pop();
        }
        state.push(Token::leaf("code_block").content(&lines.join("\n")));
        state.advance(end - start);
        true
    }
}

struct MathBlockRule;

fn math_open(line: &str) -> Option<&str> {
    if indent(line) > 3 {
        return None;
    }
    line.trim().strip_prefix("$$")
}

impl BlockRule for MathBlockRule {
    fn name(&self) -> &str {
        "math_block"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let after = match state.line().and_then(math_open) {
            Some(after) => after.to_owned(),
            None => return false,
        };
        let start = state.line_index();
        if !after.is_empty() {
            // single line `$$x$$`
            let body = match after.strip_suffix("$$") {
                Some(body) if !body.trim().is_empty() => body.trim().to_owned(),
                _ => return false,
            };
            state.push(Token::leaf("math_block").content(&body).markup("$$"));
            state.advance(1);
            return true;
        }
        let mut end = start + 1;
        let mut lines = Vec::new();
        let mut closed = false;
        while let Some(line) = state.line_at(end) {
            if line.trim() == "$$" {
                closed = true;
                break;
            }
            lines.push(line.to_owned());
            end += 1;
        }
        state.push(
            Token::leaf("math_block")
                .content(&lines.join("\n"))
                .markup("$$"),
        );
        state.advance(end + usize::from(closed) - start);
        true
    }

    fn interrupts_paragraph(&self, _state: &BlockState, line: &str) -> bool {
        line.trim() == "$$" && indent(line) <= 3
    }
}

struct MathInlineRule;

impl InlineRule for MathInlineRule {
    fn name(&self) -> &str {
        "math_inline"
    }

    fn markers(&self) -> Vec<char> {
        vec!['$']
    }

    fn run(&self, state: &mut InlineState) -> bool {
        let rest = state.rest();
        if rest.starts_with("$$") {
            state.push_pending("$$");
            state.advance(2);
            return true;
        }
        let body = &rest[1..];
        let end = match body.find('$') {
            Some(end) => end,
            None => return false,
        };
        let content = &body[..end];
        if content.trim().is_empty() || content.starts_with(' ') || content.ends_with(' ') {
            return false;
        }
        state.push(Token::leaf("math_inline").content(content).markup("$"));
        state.advance(end + 2);
        true
    }
}

struct CodeSpanRule;

impl InlineRule for CodeSpanRule {
    fn name(&self) -> &str {
        "code_inline"
    }

    fn markers(&self) -> Vec<char> {
        vec!['`']
    }

    fn run(&self, state: &mut InlineState) -> bool {
        let rest = state.rest();
        let run = rest.chars().take_while(|c| *c == '`').count();
        let fence = &rest[..run];
        let after = &rest[run..];
        let mut search = 0;
        let close = loop {
            match after[search..].find('`') {
                Some(i) => {
                    let at = search + i;
                    let len = after[at..].chars().take_while(|c| *c == '`').count();
                    if len == run {
                        break Some(at);
                    }
                    search = at + len;
                }
                None => break None,
            }
        };
        let close = match close {
            Some(close) => close,
            None => {
                state.push_pending(fence);
                state.advance(run);
                return true;
            }
        };
        let mut content = after[..close].replace('\n', " ");
        if content.len() > 2
            && content.starts_with(' ')
            && content.ends_with(' ')
            && !content.trim().is_empty()
        {
            content = content[1..content.len() - 1].to_owned();
        }
        state.push(Token::open("code_inline").markup(fence));
        if !content.is_empty() {
            state.push(Token::text(&content));
        }
        state.push(Token::close("code_inline").markup(fence));
        state.advance(run + close + run);
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
    fn test_backticks() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let plain = b.text("a");
        let ticked = b.text("a`b");
        let spaced = b.text(" a ");
        assert_eq!(backticks(Some(&plain), true), "`");
        assert_eq!(backticks(Some(&ticked), true), "`` ");
        assert_eq!(backticks(Some(&ticked), false), " ``");
        assert_eq!(backticks(Some(&spaced), false), " `");
    }

    #[test]
    fn test_code_block_forms() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let fenced = parse(&schema, "```rust\nfn main() {}\n```");
        assert_eq!(fenced, b.doc(b.code_block("rust", "fn main() {}")));
        let indented = parse(&schema, "    let x;\n\n    let y;\n");
        assert_eq!(indented, b.doc(b.code_block("", "let x;\n\nlet y;")));
        let unclosed = parse(&schema, "~~~\ncode");
        assert_eq!(unclosed, b.doc(b.code_block("", "code")));
    }

    #[test]
    fn test_code_block_fence_grows() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.code_block("", "```\nx\n```"));
        let text = serialize(&schema, &doc);
        assert_eq!(text, "````\n```\nx\n```\n````");
        assert_eq!(parse(&schema, &text), doc);
    }

    #[test]
    fn test_math() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = parse(&schema, "$$\na^2\n$$\n\nso $x$ costs \\$5");
        assert_eq!(
            doc,
            b.doc((b.math_block("a^2"), b.p(("so ", b.math("x"), " costs $5"))))
        );
        assert_eq!(serialize(&schema, &doc), "$$\na^2\n$$\n\nso $x$ costs \\$5");
    }

    #[test]
    fn test_code_spans() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = parse(&schema, "a `` b`c `` d");
        assert_eq!(doc, b.doc(b.p(("a ", b.code("b`c"), " d"))));
        assert_eq!(serialize(&schema, &doc), "a `` b`c `` d");
        let unmatched = parse(&schema, "a ``b` c");
        assert_eq!(unmatched, b.doc(b.p("a ``b` c")));
    }
}
