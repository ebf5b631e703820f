use super::{
    command, factory, rejected, replace_ancestor, CommandContext, CommandFactory, Selection,
};
use crate::model::{Attrs, Fragment, MarkSet, Node, NodeTypeRef, ResolvedPos, Schema};
use crate::transform::{apply_steps, ReplaceStep, SetMarkupStep, Span, Step, StepKind, Steps};

/// The textblocks touched by the selection, with the position before each
fn selected_textblocks(doc: &Node, selection: Selection) -> Vec<(usize, Node)> {
    let Selection { from, to } = selection;
    let mut blocks = Vec::new();
    doc.nodes_between(from, usize::max(to, from + 1), &mut |node, pos| {
        if node.is_textblock() {
            blocks.push((pos, node.clone()));
            false
        } else {
            true
        }
    });
    blocks
}

/// Content of `node` made to fit `ty`: marks the type does not allow are dropped, and code
/// blocks keep only the text.
fn fit_content(schema: &Schema, ty: &NodeTypeRef, node: &Node) -> Option<Fragment> {
    if ty.valid_content(node.content()) {
        return Some(node.content().clone());
    }
    let stripped: Vec<Node> = node
        .content()
        .children()
        .iter()
        .map(|child| {
            let marks = MarkSet::from_marks(
                child
                    .marks()
                    .iter()
                    .filter(|m| ty.allows_mark_type(m.type_name()))
                    .cloned(),
            );
            child.mark(marks)
        })
        .collect();
    let stripped = Fragment::from(stripped);
    if ty.valid_content(&stripped) {
        return Some(stripped);
    }
    let text = node.text_content();
    let content = if text.is_empty() {
        Fragment::new()
    } else {
        Fragment::from(schema.text(&text, MarkSet::new()).ok()?)
    };
    Some(content).filter(|c| ty.valid_content(c))
}

/// Converts the selected textblocks to a type, or back to `default` when all of them already
/// have the type and attributes.
pub fn toggle_block_type(name: &str, default: &str) -> CommandFactory {
    let name = name.to_owned();
    let default = default.to_owned();
    factory(move |attrs: &Attrs| {
        let name = name.clone();
        let default = default.clone();
        let attrs = attrs.clone();
        command(move |ctx: &CommandContext| {
            let target = ctx.schema.node_type(&name)?;
            let fallback = ctx.schema.node_type(&default)?;
            let target_attrs = target.compute_attrs(&attrs).ok()?;
            let blocks = selected_textblocks(ctx.doc, ctx.selection);
            if blocks.is_empty() {
                return rejected(&name, "no textblock selected");
            }
            let all_match = blocks
                .iter()
                .all(|(_, n)| n.node_type() == target && n.attrs() == &target_attrs);
            let (ty, attrs) = if all_match {
                (fallback, Attrs::new())
            } else {
                (target, target_attrs)
            };
            // back to front, so earlier positions stay valid
            let mut steps = Steps::with_capacity(blocks.len());
            for (pos, node) in blocks.iter().rev() {
                let content = match fit_content(ctx.schema, ty, node) {
                    Some(content) => content,
                    None => return rejected(&name, "content does not fit"),
                };
                steps.push(if &content == node.content() {
                    Step::SetMarkup(SetMarkupStep::new(*pos, ty.clone(), attrs.clone()))
                } else {
                    let replacement = ty.create(&attrs, content, node.marks().clone()).ok()?;
                    Step::Replace(ReplaceStep::new(
                        Span::new(*pos, pos + node.node_size()),
                        Fragment::from(replacement),
                    ))
                });
            }
            match apply_steps(ctx.doc, &steps) {
                Ok(doc) => Some(doc),
                Err(err) => rejected(&name, &err.to_string()),
            }
        })
    })
}

/// The parent depth and child index range of the blocks the selection spans
fn block_range(doc: &Node, selection: Selection) -> Option<(ResolvedPos, usize, usize, usize)> {
    let rp = doc.resolve(selection.from).ok()?;
    let rp_to = doc.resolve(selection.to).ok()?;
    let mut depth = rp.shared_depth(selection.to);
    while depth > 0 && rp.node(depth).node_type().inline_content() {
        depth -= 1;
    }
    let start = rp.index(depth);
    let end = if rp_to.depth() > depth {
        rp_to.index(depth) + 1
    } else {
        rp_to.index(depth)
    };
    let end = usize::max(end, start + 1);
    if end > rp.node(depth).child_count() {
        return None;
    }
    Some((rp, depth, start, end))
}

/// Position of the child at `index` of the ancestor at `depth`
fn child_pos(rp: &ResolvedPos, depth: usize, index: usize) -> usize {
    rp.start(depth)
        + rp.node(depth).content().children()[..index]
            .iter()
            .map(Node::node_size)
            .sum::<usize>()
}

/// Lifts the selection out of the nearest ancestor of a type, or wraps the selected blocks
/// in a node of that type.
pub fn toggle_wrap(name: &str) -> CommandFactory {
    let name = name.to_owned();
    factory(move |attrs: &Attrs| {
        let name = name.clone();
        let attrs = attrs.clone();
        command(move |ctx: &CommandContext| {
            let wrapper = ctx.schema.node_type(&name)?;
            let rp = ctx.doc.resolve(ctx.selection.from).ok()?;
            if let Some(depth) = rp.find_ancestor(|n| n.node_type() == wrapper).filter(|d| *d > 0) {
                let content = rp.node(depth).content().clone();
                return replace_ancestor(&rp, depth, content)
                    .or_else(|| rejected(&name, "the content does not fit the parent"));
            }
            let (rp, depth, start, end) = block_range(ctx.doc, ctx.selection)?;
            let children = rp.node(depth).content().cut_by_index(start, end);
            let from = child_pos(&rp, depth, start);
            let to = from + children.size();
            let wrapped = match wrapper.create_checked(&attrs, children, MarkSet::new()) {
                Ok(node) => node,
                Err(err) => return rejected(&name, &err.to_string()),
            };
            ReplaceStep::new(Span::new(from, to), Fragment::from(wrapped))
                .apply(ctx.doc)
                .ok()
                .or_else(|| rejected(&name, "the wrapper is not allowed here"))
        })
    })
}

fn is_list(node: &Node) -> bool {
    node.node_type().in_group("list")
}

/// Removes the list around the selection, converts it to another list type, or wraps the
/// selected blocks in a list with one item per block.
pub fn toggle_list(list: &str, item: &str) -> CommandFactory {
    let list = list.to_owned();
    let item = item.to_owned();
    factory(move |attrs: &Attrs| {
        let list = list.clone();
        let item = item.clone();
        let attrs = attrs.clone();
        command(move |ctx: &CommandContext| {
            let list_ty = ctx.schema.node_type(&list)?;
            let item_ty = ctx.schema.node_type(&item)?;
            let list_attrs = Attrs::new()
                .with("tight", ctx.schema.options().tight_lists)
                .merged(&attrs);
            let list_attrs = match list_ty.compute_attrs(&list_attrs) {
                Ok(attrs) => attrs,
                Err(_) => list_ty.compute_attrs(&attrs).ok()?,
            };
            let rp = ctx.doc.resolve(ctx.selection.from).ok()?;
            if let Some(depth) = rp.find_ancestor(is_list).filter(|d| *d > 0) {
                let current = rp.node(depth);
                if current.node_type() == list_ty {
                    let lifted = current
                        .content()
                        .children()
                        .iter()
                        .fold(Fragment::new(), |acc, item| acc.append(item.content().clone()));
                    return replace_ancestor(&rp, depth, lifted)
                        .or_else(|| rejected(&list, "the items do not fit the parent"));
                }
                let mut items = Vec::with_capacity(current.child_count());
                for old in current.content().children() {
                    match item_ty.create_checked(&Attrs::new(), old.content().clone(), MarkSet::new()) {
                        Ok(item) => items.push(item),
                        Err(err) => return rejected(&list, &err.to_string()),
                    }
                }
                let converted = list_ty
                    .create_checked(&list_attrs, Fragment::from(items), MarkSet::new())
                    .ok()?;
                return replace_ancestor(&rp, depth, Fragment::from(converted))
                    .or_else(|| rejected(&list, "the list is not allowed here"));
            }
            let (rp, depth, start, end) = block_range(ctx.doc, ctx.selection)?;
            let blocks = rp.node(depth).content().cut_by_index(start, end);
            let mut items = Vec::with_capacity(blocks.child_count());
            for block in blocks.children() {
                let item = item_ty.create_and_fill(
                    ctx.schema,
                    &Attrs::new(),
                    Fragment::from(block.clone()),
                    MarkSet::new(),
                );
                match item {
                    Some(item) => items.push(item),
                    None => return rejected(&list, "a block does not fit a list item"),
                }
            }
            let wrapped = list_ty
                .create_checked(&list_attrs, Fragment::from(items), MarkSet::new())
                .ok()?;
            let from = child_pos(&rp, depth, start);
            let to = from + blocks.size();
            ReplaceStep::new(Span::new(from, to), Fragment::from(wrapped))
                .apply(ctx.doc)
                .ok()
                .or_else(|| rejected(&list, "the list is not allowed here"))
        })
    })
}

/// Flips `checked` on the enclosing checkbox item
pub fn toggle_checkbox(item: &str) -> CommandFactory {
    let item = item.to_owned();
    factory(move |_: &Attrs| {
        let item = item.clone();
        command(move |ctx: &CommandContext| {
            let rp = ctx.doc.resolve(ctx.selection.from).ok()?;
            let depth = match rp.find_ancestor(|n| n.type_name() == item) {
                Some(depth) if depth > 0 => depth,
                _ => return rejected(&item, "not in a checkbox item"),
            };
            let node = rp.node(depth);
            let checked = node.attrs().get_bool("checked").unwrap_or(false);
            let attrs = node.attrs().clone().with("checked", !checked);
            SetMarkupStep::new(rp.before(depth)?, node.node_type().clone(), attrs)
                .apply(ctx.doc)
                .ok()
        })
    })
}

#[cfg(test)]
mod tests {
    use crate::commands::{apply_command, Selection};
    use crate::extensions::default_schema;
    use crate::markdown::helper::Builder;
    use crate::model::{Attrs, Node, Schema};

    fn run(schema: &Schema, name: &str, attrs: Attrs, doc: &Node, sel: Selection) -> Option<Node> {
        let factory = schema.command(name).unwrap();
        apply_command(schema, &factory, &attrs, doc, sel)
    }

    #[test]
    fn test_toggle_heading() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("title"));
        let level = Attrs::new().with("level", 2i64);
        let heading = run(&schema, "heading", level.clone(), &doc, Selection::cursor(2)).unwrap();
        assert_eq!(heading, b.doc(b.h(2, "title")));
        let back = run(&schema, "heading", level, &heading, Selection::cursor(2)).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_code_block_drops_marks() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p((b.strong("let"), " x")));
        let code = run(&schema, "code_block", Attrs::new(), &doc, Selection::cursor(2)).unwrap();
        assert_eq!(code.normalized(), b.doc(b.code_block("", "let x")).normalized());
    }

    #[test]
    fn test_toggle_blockquote() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc((b.p("one"), b.p("two")));
        let quoted = run(&schema, "blockquote", Attrs::new(), &doc, Selection::new(2, 7)).unwrap();
        assert_eq!(quoted, b.doc(b.blockquote((b.p("one"), b.p("two")))));
        let lifted = run(&schema, "blockquote", Attrs::new(), &quoted, Selection::cursor(3)).unwrap();
        assert_eq!(lifted, doc);
    }

    #[test]
    fn test_toggle_list() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("item"));
        let list = run(&schema, "bullet_list", Attrs::new(), &doc, Selection::cursor(2)).unwrap();
        assert_eq!(list, b.doc(b.ul(b.li(b.p("item")))));
        let ordered = run(&schema, "ordered_list", Attrs::new(), &list, Selection::cursor(3)).unwrap();
        assert_eq!(ordered, b.doc(b.ol(1, b.li(b.p("item")))));
        let plain = run(&schema, "ordered_list", Attrs::new(), &ordered, Selection::cursor(3)).unwrap();
        assert_eq!(plain, doc);
    }

    #[test]
    fn test_toggle_checkbox() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.checkbox_list(b.checkbox(false, b.p("todo"))));
        let done = run(&schema, "checkbox_item", Attrs::new(), &doc, Selection::cursor(4)).unwrap();
        assert_eq!(done, b.doc(b.checkbox_list(b.checkbox(true, b.p("todo")))));
        let outside = b.doc(b.p("todo"));
        assert_eq!(run(&schema, "checkbox_item", Attrs::new(), &outside, Selection::cursor(2)), None);
    }
}
