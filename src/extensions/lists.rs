//! Bullet, ordered and checkbox lists.
//!
//! One block rule reads all three kinds. A list ends where the marker character, the ordered
//! delimiter or the presence of a task box changes, so adjacent lists of different kinds are
//! written with different markers and read back apart.
use super::basic::thematic_break;
use crate::commands::{toggle_checkbox, toggle_list};
use crate::extension::Extension;
use crate::markdown::{
    indent, is_blank, strip_indent, BlockRule, BlockState, MarkdownWriter, Placement, Token,
};
use crate::model::{AttrSpec, Attrs, Node, NodeSpec};
use log::trace;

/// Bullet lists. Registers the list rule for all list kinds.
pub fn bullet_list() -> Extension {
    Extension::node(
        "bullet_list",
        NodeSpec::with_content("list_item+")
            .group("block list")
            .attr("tight", AttrSpec::bool(true)),
    )
    .block_rule(Placement::Default, ListRule)
    .node_writer(|w, node, parent, index| {
        let bullet = bullet(w, node, parent, index);
        let first = format!("{} ", bullet);
        w.render_list(node, "  ", |_| first.clone());
    })
    .command("bullet_list", toggle_list("bullet_list", "list_item"))
}

/// Ordered lists with a start number
pub fn ordered_list() -> Extension {
    Extension::node(
        "ordered_list",
        NodeSpec::with_content("list_item+")
            .group("block list")
            .attr("order", AttrSpec::int(1))
            .attr("tight", AttrSpec::bool(true)),
    )
    .node_writer(|w, node, parent, index| {
        let start = node.attrs().get_int("order").unwrap_or(1).max(0);
        let last = start + node.child_count().saturating_sub(1) as i64;
        let width = last.to_string().len();
        let delim = if follows_same_type(node, parent, index) {
            w.options().alternate_delimiter()
        } else {
            w.options().ordered_delimiter
        };
        let space = " ".repeat(width + 2);
        w.render_list(node, &space, |i| {
            let number = (start + i as i64).to_string();
            format!("{:>width$}{} ", number, delim, width = width)
        });
    })
    .command("ordered_list", toggle_list("ordered_list", "list_item"))
}

/// Items of bullet and ordered lists
pub fn list_item() -> Extension {
    Extension::node(
        "list_item",
        NodeSpec::with_content("paragraph block*").defining(),
    )
}

/// Task lists, `- [ ]` and `- [x]`
pub fn checkbox_list() -> Extension {
    Extension::node(
        "checkbox_list",
        NodeSpec::with_content("checkbox_item+")
            .group("block list")
            .attr("tight", AttrSpec::bool(true)),
    )
    .node_writer(|w, node, parent, index| {
        let bullet = bullet(w, node, parent, index);
        let heads: Vec<String> = node
            .content()
            .children()
            .iter()
            .map(|item| {
                let checked = item.attrs().get_bool("checked").unwrap_or(false);
                format!("{} [{}] ", bullet, if checked { 'x' } else { ' ' })
            })
            .collect();
        w.render_list(node, "  ", |i| heads.get(i).cloned().unwrap_or_default());
    })
    .command("checkbox_list", toggle_list("checkbox_list", "checkbox_item"))
}

/// Items of task lists
pub fn checkbox_item() -> Extension {
    Extension::node(
        "checkbox_item",
        NodeSpec::with_content("paragraph block*")
            .defining()
            .attr("checked", AttrSpec::bool(false)),
    )
    .command("checkbox_item", toggle_checkbox("checkbox_item"))
}

fn follows_same_type(node: &Node, parent: &Node, index: usize) -> bool {
    index
        .checked_sub(1)
        .and_then(|i| parent.child(i))
        .map(|prev| prev.type_name() == node.type_name())
        .unwrap_or(false)
}

/// Lists directly following a list of the same kind take the alternate bullet, or they
/// would be read as one list.
fn bullet(w: &MarkdownWriter, node: &Node, parent: &Node, index: usize) -> char {
    if follows_same_type(node, parent, index) {
        w.options().alternate_bullet
    } else {
        w.options().bullet
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Marker {
    Bullet(char),
    Ordered { start: i64, delim: char },
}

#[derive(Debug, Clone, PartialEq)]
struct ItemHead {
    marker: Marker,
    /// Column where the item content starts
    offset: usize,
    /// The state of the task box, if there is one
    task: Option<bool>,
    /// Byte length of the task box and the space after it
    task_len: usize,
    empty: bool,
}

fn task_box(text: &str) -> Option<(bool, usize)> {
    let checked = match text.get(..3)? {
        "[ ]" => false,
        "[x]" | "[X]" => true,
        _ => return None,
    };
    match text[3..].chars().next() {
        None => Some((checked, 3)),
        Some(' ') => Some((checked, 4)),
        Some(_) => None,
    }
}

fn item_head(line: &str) -> Option<ItemHead> {
    let ind = indent(line);
    if ind > 3 {
        return None;
    }
    let text = &line[ind..];
    let first = text.chars().next()?;
    let (marker, len) = if matches!(first, '-' | '+' | '*') {
        (Marker::Bullet(first), 1)
    } else {
        let digits = text.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 || digits > 9 {
            return None;
        }
        let delim = text[digits..].chars().next().filter(|c| *c == '.' || *c == ')')?;
        let start = text[..digits].parse().ok()?;
        (Marker::Ordered { start, delim }, digits + 1)
    };
    let after = &text[len..];
    if !after.is_empty() && !after.starts_with(' ') {
        return None;
    }
    let empty = is_blank(after);
    let spaces = indent(after);
    let offset = if empty || spaces > 4 {
        ind + len + 1
    } else {
        ind + len + spaces
    };
    let (task, task_len) = match line.get(offset..).and_then(task_box) {
        Some((checked, len)) if !empty => (Some(checked), len),
        _ => (None, 0),
    };
    Some(ItemHead {
        marker,
        offset,
        task,
        task_len,
        empty,
    })
}

fn same_kind(a: Marker, b: Marker) -> bool {
    match (a, b) {
        (Marker::Bullet(x), Marker::Bullet(y)) => x == y,
        (Marker::Ordered { delim: x, .. }, Marker::Ordered { delim: y, .. }) => x == y,
        _ => false,
    }
}

struct ListRule;

impl ListRule {
    fn kinds(state: &BlockState, head: &ItemHead) -> Option<(&'static str, &'static str, bool)> {
        let tasks = head.task.is_some() && state.handles("checkbox_list");
        let (list, item) = match (head.marker, tasks) {
            (_, true) => ("checkbox_list", "checkbox_item"),
            (Marker::Ordered { .. }, false) => ("ordered_list", "list_item"),
            (Marker::Bullet(_), false) => ("bullet_list", "list_item"),
        };
        if state.handles(list) && state.handles(item) {
            Some((list, item, tasks))
        } else {
            None
        }
    }

    fn continues(state: &BlockState, first: &ItemHead, tasks: bool, line: &str) -> Option<ItemHead> {
        if thematic_break(line).is_some() {
            return None;
        }
        let head = item_head(line)?;
        let is_task = head.task.is_some() && state.handles("checkbox_list");
        if same_kind(first.marker, head.marker) && is_task == tasks {
            Some(head)
        } else {
            None
        }
    }
}

impl BlockRule for ListRule {
    fn name(&self) -> &str {
        "list"
    }

    fn run(&self, state: &mut BlockState) -> bool {
        let first = match state.line().and_then(item_head) {
            Some(head) => head,
            None => return false,
        };
        let (list, item, tasks) = match Self::kinds(state, &first) {
            Some(kinds) => kinds,
            None => return false,
        };
        let start = state.line_index();
        let mut at = start;
        let mut items = Vec::new();
        let mut loose = false;
        while let Some(head) = state.line_at(at).and_then(|l| Self::continues(state, &first, tasks, l)) {
            let line = state.line_at(at).unwrap_or("");
            let skip = if tasks { head.task_len } else { 0 };
            let text = line.get(head.offset + skip..).unwrap_or("");
            let mut lines = vec![text.to_owned()];
            at += 1;
            let mut lazy = !is_blank(text);
            while let Some(line) = state.line_at(at) {
                if is_blank(line) {
                    let next = (at..state.line_count())
                        .find(|i| state.line_at(*i).map(|l| !is_blank(l)).unwrap_or(false));
                    let nested = next
                        .and_then(|i| state.line_at(i))
                        .map(|l| indent(l) >= head.offset)
                        .unwrap_or(false);
                    match next {
                        Some(next) if nested => {
                            lines.extend((at..next).map(|_| String::new()));
                            at = next;
                            lazy = false;
                        }
                        _ => break,
                    }
                } else if indent(line) >= head.offset {
                    lines.push(strip_indent(line, head.offset));
                    lazy = true;
                    at += 1;
                } else if lazy && !state.interrupts_paragraph(line) && item_head(line).is_none() {
                    lines.push(line.trim_start().to_owned());
                    at += 1;
                } else {
                    break;
                }
            }
            items.push((head.task, lines));
            let mut next = at;
            while state.line_at(next).map(is_blank).unwrap_or(false) {
                next += 1;
            }
            if next > at {
                match state.line_at(next).and_then(|l| Self::continues(state, &first, tasks, l)) {
                    Some(_) => {
                        loose = true;
                        at = next;
                    }
                    None => break,
                }
            }
        }
        let mut bodies = Vec::with_capacity(items.len());
        for (task, lines) in items {
            let nested = state.tokenize_nested(lines);
            loose |= nested.blank_between;
            bodies.push((task, nested.tokens));
        }
        trace!("{} with {} items, loose: {}", list, bodies.len(), loose);
        let mut attrs = Attrs::new().with("tight", !loose);
        if let Marker::Ordered { start, .. } = first.marker {
            attrs.insert("order", start);
        }
        let markup = match first.marker {
            Marker::Bullet(c) => c.to_string(),
            Marker::Ordered { delim, .. } => delim.to_string(),
        };
        state.push(Token::open(list).markup(&markup).attrs(attrs));
        for (task, tokens) in bodies {
            let item_attrs = match task {
                Some(checked) if tasks => Attrs::new().with("checked", checked),
                _ => Attrs::new(),
            };
            state.push(Token::open(item).markup(&markup).attrs(item_attrs));
            for token in tokens {
                state.push(token);
            }
            state.push(Token::close(item).markup(&markup));
        }
        state.push(Token::close(list).markup(&markup));
        state.advance(at - start);
        true
    }

    fn interrupts_paragraph(&self, state: &BlockState, line: &str) -> bool {
        match item_head(line) {
            Some(head) if !head.empty => {
                let starts_at_one = match head.marker {
                    Marker::Ordered { start, .. } => start == 1,
                    Marker::Bullet(_) => true,
                };
                starts_at_one && Self::kinds(state, &head).is_some()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::default_schema;
    use crate::markdown::helper::Builder;
    use crate::markdown::{parse, serialize};

    #[test]
    fn test_item_head() {
        let head = item_head("- a").unwrap();
        assert_eq!((head.marker, head.offset, head.task), (Marker::Bullet('-'), 2, None));
        let head = item_head("10) a").unwrap();
        assert_eq!(head.marker, Marker::Ordered { start: 10, delim: ')' });
        assert_eq!(head.offset, 4);
        let head = item_head("* [x] done").unwrap();
        assert_eq!((head.task, head.task_len), (Some(true), 4));
        assert!(item_head("-a").is_none());
        assert!(item_head("1234567890. a").is_none());
        assert!(item_head("-").unwrap().empty);
    }

    #[test]
    fn test_tight_and_loose() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let tight = parse(&schema, "- a\n- b");
        assert_eq!(tight, b.doc(b.ul((b.li(b.p("a")), b.li(b.p("b"))))));
        let loose = parse(&schema, "- a\n\n- b");
        let expected = b.node(
            "bullet_list",
            Attrs::new().with("tight", false),
            (b.li(b.p("a")), b.li(b.p("b"))),
        );
        assert_eq!(loose, b.doc(expected));
        assert_eq!(serialize(&schema, &loose), "- a\n\n- b");
    }

    #[test]
    fn test_nested_lists() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let text = "- a\n  - b\n  - c\n- d";
        let doc = parse(&schema, text);
        let inner = b.ul((b.li(b.p("b")), b.li(b.p("c"))));
        assert_eq!(doc, b.doc(b.ul((b.li((b.p("a"), inner)), b.li(b.p("d"))))));
        assert_eq!(serialize(&schema, &doc), text);
    }

    #[test]
    fn test_ordered_numbers_are_padded() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let items: Vec<Node> = (0..3).map(|i| b.li(b.p(format!("i{}", i)))).collect();
        let doc = b.doc(b.ol(3, items.clone()));
        assert_eq!(serialize(&schema, &doc), "3. i0\n4. i1\n5. i2");
        let doc = b.doc(b.ol(9, items));
        assert_eq!(serialize(&schema, &doc), " 9. i0\n10. i1\n11. i2");
        assert_eq!(parse(&schema, " 9. i0\n10. i1\n11. i2"), doc);
    }

    #[test]
    fn test_lazy_continuation() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = parse(&schema, "- a\nb\n- c");
        assert_eq!(doc, b.doc(b.ul((b.li(b.p("a\nb")), b.li(b.p("c"))))));
    }

    #[test]
    fn test_marker_change_splits_lists() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = parse(&schema, "- a\n+ b\n- [ ] c");
        assert_eq!(
            doc,
            b.doc((
                b.ul(b.li(b.p("a"))),
                b.ul(b.li(b.p("b"))),
                b.checkbox_list(b.checkbox(false, b.p("c"))),
            ))
        );
        assert_eq!(serialize(&schema, &doc), "- a\n\n* b\n\n- [ ] c");
    }

    #[test]
    fn test_ordered_list_interrupts_only_at_one() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = parse(&schema, "The year\n1999. was long");
        assert_eq!(doc, b.doc(b.p("The year\n1999. was long")));
        let doc = parse(&schema, "Steps\n1. one");
        assert_eq!(doc, b.doc((b.p("Steps"), b.ol(1, b.li(b.p("one"))))));
    }
}
