//! Notices, embedded media, images and emoji.
use super::marks::escape_href;
use crate::commands::toggle_wrap;
use crate::extension::Extension;
use crate::markdown::{
    label_end, link_target, unescape, Escape, InlineRule, InlineState, MarkdownWriter,
    Placement, Token,
};
use crate::model::{AttrKind, AttrSpec, Attrs, Node, NodeSpec};

/// The styles a notice can have. Each is also the name of a container directive.
pub const NOTICE_STYLES: [&str; 4] = ["info", "tip", "warning", "success"];

/// Notices, `:::info Title` … `:::`
pub fn notice() -> Extension {
    let mut extension = Extension::node(
        "notice",
        NodeSpec::with_content("block+")
            .group("block")
            .defining()
            .attr("style", AttrSpec::string("info"))
            .attr("title", AttrSpec::optional_string()),
    )
    .container_directive("notice");
    for style in NOTICE_STYLES.iter() {
        extension = extension.container_directive(style);
    }
    extension
        .token_to_tree(|token| {
            let style = if token.info == "notice" {
                "info"
            } else {
                token.info.as_str()
            };
            Attrs::new()
                .with("style", style)
                .with("title", token.attrs.get_str("title"))
        })
        .node_writer(|w, node, _, _| {
            let style = node
                .attrs()
                .get_str("style")
                .filter(|s| NOTICE_STYLES.contains(s))
                .unwrap_or("notice");
            let mut head = format!(":::{}", style);
            if let Some(title) = node.attrs().get_str("title").filter(|t| !t.trim().is_empty()) {
                head.push(' ');
                head.push_str(&directive_title(title));
            }
            w.write(&head);
            w.ensure_new_line();
            w.render_content(node);
            w.flush_close(1);
            w.write(":::");
            w.close_block(node);
        })
        .command("notice", toggle_wrap("notice"))
}

/// A title that reads back unchanged. Titles that look like the bracket or quote forms are
/// written in the bracket form.
fn directive_title(title: &str) -> String {
    let title = title.trim();
    if title.starts_with('[') || title.starts_with('"') || title.ends_with('"') {
        format!("[{}]", escape_label(title))
    } else {
        title.to_owned()
    }
}

fn escape_label(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn media(name: &str) -> Extension {
    Extension::node(
        name,
        NodeSpec::leaf()
            .group("block")
            .atom()
            .attr("href", AttrSpec::required(AttrKind::String))
            .attr("label", AttrSpec::optional_string())
            .attr("title", AttrSpec::optional_string()),
    )
    .leaf_directive(name)
    .token_to_tree(|token| {
        Attrs::new()
            .with("href", token.attrs.get_str("href"))
            .with("label", token.attrs.get_str("title"))
            .with("title", token.attrs.get_str("href_title"))
    })
    .node_writer(write_media)
}

fn write_media(w: &mut MarkdownWriter, node: &Node, _parent: &Node, _index: usize) {
    let attrs = node.attrs();
    let label = attrs.get_str("label").unwrap_or("");
    let href = attrs.get_str("href").unwrap_or("");
    let title = attrs
        .get_str("title")
        .map(|t| format!(" {}", w.quote(t)))
        .unwrap_or_default();
    w.write(&format!(
        "::{}[{}]({}{})",
        node.type_name(),
        escape_label(label),
        escape_href(href),
        title
    ));
    w.close_block(node);
}

/// Embedded content, `::embed[label](href)`
pub fn embed() -> Extension {
    media("embed")
}

/// Videos, `::video[label](href)`
pub fn video() -> Extension {
    media("video")
}

/// File attachments, `::attachment[name](href)`
pub fn attachment() -> Extension {
    media("attachment")
}

/// Inline images
pub fn image() -> Extension {
    Extension::node(
        "image",
        NodeSpec::leaf()
            .inline()
            .group("inline")
            .attr("src", AttrSpec::required(AttrKind::String))
            .attr("alt", AttrSpec::optional_string())
            .attr("title", AttrSpec::optional_string()),
    )
    .inline_rule(Placement::Default, ImageRule)
    .node_writer(|w, node, _, _| {
        let attrs = node.attrs();
        let alt = w.esc(attrs.get_str("alt").unwrap_or(""), false);
        let title = attrs
            .get_str("title")
            .map(|t| format!(" {}", w.quote(t)))
            .unwrap_or_default();
        let src = escape_href(attrs.get_str("src").unwrap_or(""));
        w.text(&format!("![{}]({}{})", alt, src, title), false);
    })
}

/// Emoji shortcodes, `:smile:`
pub fn emoji() -> Extension {
    Extension::node(
        "emoji",
        NodeSpec::leaf()
            .inline()
            .group("inline")
            .atom()
            .attr("markup", AttrSpec::required(AttrKind::String)),
    )
    .inline_rule(Placement::Default, EmojiRule)
    .escape(Escape::when(':', |text, at| shortcode_len(&text[at..]).is_some()))
    .node_writer(|w, node, _, _| {
        let name = node.attrs().get_str("markup").unwrap_or("");
        w.text(&format!(":{}:", name), false);
    })
}

fn is_shortcode_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')
}

/// Length of the shortcode name at the start of `src`, which starts with `:`
fn shortcode_len(src: &str) -> Option<usize> {
    let name = src.strip_prefix(':')?;
    let len = name.chars().take_while(|c| is_shortcode_char(*c)).count();
    if len > 0 && name[len..].starts_with(':') {
        Some(len)
    } else {
        None
    }
}

struct EmojiRule;

impl InlineRule for EmojiRule {
    fn name(&self) -> &str {
        "emoji"
    }

    fn markers(&self) -> Vec<char> {
        vec![':']
    }

    fn run(&self, state: &mut InlineState) -> bool {
        if state.char_before().map(|c| c.is_alphanumeric()).unwrap_or(false) {
            return false;
        }
        let rest = state.rest();
        let len = match shortcode_len(rest) {
            Some(len) => len,
            None => return false,
        };
        let name = &rest[1..1 + len];
        state.push(
            Token::leaf("emoji")
                .markup(name)
                .attrs(Attrs::new().with("markup", name)),
        );
        state.advance(len + 2);
        true
    }
}

struct ImageRule;

impl InlineRule for ImageRule {
    fn name(&self) -> &str {
        "image"
    }

    fn markers(&self) -> Vec<char> {
        vec!['!']
    }

    fn run(&self, state: &mut InlineState) -> bool {
        let rest = state.rest();
        let label = match rest.strip_prefix('!') {
            Some(label) if label.starts_with('[') => label,
            _ => return false,
        };
        let end = match label_end(label) {
            Some(end) => end,
            None => return false,
        };
        let target = match link_target(&label[end + 1..]) {
            Some(target) => target,
            None => return false,
        };
        let alt = unescape(&label[1..end]);
        let alt = if alt.is_empty() { None } else { Some(alt) };
        let attrs = Attrs::new()
            .with("src", target.href.as_str())
            .with("alt", alt)
            .with("title", target.title.clone());
        state.push(Token::leaf("image").attrs(attrs));
        state.advance(1 + end + 1 + target.len);
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
    fn test_shortcode_len() {
        assert_eq!(shortcode_len(":smile:"), Some(5));
        assert_eq!(shortcode_len(":+1: yes"), Some(2));
        assert_eq!(shortcode_len("::"), None);
        assert_eq!(shortcode_len(":a b:"), None);
    }

    #[test]
    fn test_directive_title() {
        assert_eq!(directive_title("Heads up"), "Heads up");
        assert_eq!(directive_title("[draft]"), "[\\[draft\\]]");
        assert_eq!(directive_title("say \"hi\""), "[say \"hi\"]");
    }

    #[test]
    fn test_notice_round_trip() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let text = ":::warning Mind the gap\nBe careful.\n:::";
        let doc = parse(&schema, text);
        let notice = b.node(
            "notice",
            Attrs::new().with("style", "warning").with("title", "Mind the gap"),
            b.p("Be careful."),
        );
        assert_eq!(doc, b.doc(notice));
        assert_eq!(serialize(&schema, &doc), text);
    }

    #[test]
    fn test_notice_alias() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = parse(&schema, ":::notice\ntext\n:::");
        assert_eq!(doc, b.doc(b.notice("info", b.p("text"))));
        assert_eq!(serialize(&schema, &doc), ":::info\ntext\n:::");
    }

    #[test]
    fn test_directive_lines_in_fenced_code() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let text = ":::info\n```\n:::tip\n:::\n```\n:::\n\npara";
        let doc = parse(&schema, text);
        assert_eq!(
            doc,
            b.doc((b.notice("info", b.code_block("", ":::tip\n:::")), b.p("para")))
        );
        assert_eq!(serialize(&schema, &doc), text);

        // an unclosed fence does not hide the closing line
        let doc = parse(&schema, ":::tip\n```\ncode\n:::\n\nafter");
        assert_eq!(doc.child_count(), 2);
        assert_eq!(doc.child(1).unwrap(), &b.p("after"));
    }

    #[test]
    fn test_media_round_trip() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let text = "::video[Launch](https://example.com/v.mp4 \"The launch\")";
        let doc = parse(&schema, text);
        let attrs = Attrs::new()
            .with("href", "https://example.com/v.mp4")
            .with("label", "Launch")
            .with("title", "The launch");
        assert_eq!(doc, b.doc(b.node("video", attrs, ())));
        assert_eq!(serialize(&schema, &doc), text);
    }

    #[test]
    fn test_image_and_emoji() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let text = "Look ![a cat](cat.png) :smile: a:b:";
        let doc = parse(&schema, text);
        assert_eq!(
            doc,
            b.doc(b.p(("Look ", b.image("cat.png", "a cat"), " ", b.emoji("smile"), " a:b:")))
        );
        assert_eq!(serialize(&schema, &doc), "Look ![a cat](cat.png) :smile: a\\:b:");
    }
}
