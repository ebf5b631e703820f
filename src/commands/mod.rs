//! # Commands
//!
//! A command is a named edit. A [`CommandFactory`] takes the attributes of an invocation and
//! returns a [`Command`], which computes a new document from the current one and a selection.
//! A command that does not apply returns `None` and leaves the document alone.
//!
//! Commands are built on the steps of the [`transform`](crate::transform) module, so every
//! document they return has valid content.
mod block;
mod table;

pub use block::{toggle_block_type, toggle_checkbox, toggle_list, toggle_wrap};
pub use table::{
    add_column_after, add_row_after, create_table, delete_column, delete_row,
    set_column_alignment,
};

use crate::model::{Attrs, Fragment, MarkSet, Node, ResolvedPos, Schema};
use crate::transform::{AddMarkStep, RemoveMarkStep, ReplaceStep, Span, StepKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An edit bound to its attributes
pub type Command = Box<dyn Fn(&CommandContext) -> Option<Node> + Send + Sync>;

/// Creates a command from the attributes of an invocation
pub type CommandFactory = Arc<dyn Fn(&Attrs) -> Command + Send + Sync>;

/// A range of document positions. `from == to` is a cursor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Selection {
    /// Start of the selection
    pub from: usize,
    /// End of the selection
    pub to: usize,
}

impl Selection {
    /// A collapsed selection
    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Whether the selection is collapsed
    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

/// What a command sees
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// The schema of the document
    pub schema: &'a Schema,
    /// The current document
    pub doc: &'a Node,
    /// The current selection
    pub selection: Selection,
}

/// The commands of a schema, by name
pub fn list_commands(schema: &Schema) -> BTreeMap<String, CommandFactory> {
    schema.commands.clone()
}

/// Bind a command to its attributes and run it. Returns the new document, or `None` if the
/// command was rejected.
pub fn apply_command(
    schema: &Schema,
    factory: &CommandFactory,
    attrs: &Attrs,
    doc: &Node,
    selection: Selection,
) -> Option<Node> {
    let command = factory(attrs);
    command(&CommandContext {
        schema,
        doc,
        selection,
    })
}

pub(crate) fn factory<F>(f: F) -> CommandFactory
where
    F: Fn(&Attrs) -> Command + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn command<F>(f: F) -> Command
where
    F: Fn(&CommandContext) -> Option<Node> + Send + Sync + 'static,
{
    Box::new(f)
}

pub(crate) fn rejected<T>(command: &str, reason: &str) -> Option<T> {
    debug!("command `{}` rejected: {}", command, reason);
    None
}

/// Adds a mark to the selection, or removes it if all selected text already carries it with
/// the same attributes.
pub fn toggle_mark(name: &str) -> CommandFactory {
    let name = name.to_owned();
    factory(move |attrs: &Attrs| {
        let name = name.clone();
        let attrs = attrs.clone();
        command(move |ctx: &CommandContext| {
            let Selection { from, to } = ctx.selection;
            if from >= to {
                return rejected(&name, "empty selection");
            }
            let mark = ctx.schema.mark(&name, &attrs).ok()?;
            let mut texts = 0;
            let mut covered = true;
            ctx.doc.nodes_between(from, to, &mut |node, _| {
                if node.is_text() {
                    texts += 1;
                    covered &= mark.is_in_set(node.marks());
                }
                true
            });
            if texts == 0 {
                return rejected(&name, "no text selected");
            }
            let span = Span::new(from, to);
            let result = if covered {
                RemoveMarkStep::new(span, mark).apply(ctx.doc)
            } else {
                AddMarkStep::new(span, mark).apply(ctx.doc)
            };
            match result {
                Ok(doc) if doc != *ctx.doc => Some(doc),
                Ok(_) => rejected(&name, "the mark is not allowed here"),
                Err(err) => rejected(&name, &err.to_string()),
            }
        })
    })
}

/// Inserts an inline node at the selection, or a block node after the block holding the
/// selection.
pub fn insert_node(name: &str) -> CommandFactory {
    let name = name.to_owned();
    factory(move |attrs: &Attrs| {
        let name = name.clone();
        let attrs = attrs.clone();
        command(move |ctx: &CommandContext| {
            let ty = ctx.schema.node_type(&name)?;
            if ty.is_text() {
                return rejected(&name, "text is not inserted as a node");
            }
            let node = match ty.create_and_fill(ctx.schema, &attrs, Fragment::new(), MarkSet::new()) {
                Some(node) => node,
                None => return rejected(&name, "invalid attributes"),
            };
            if ty.is_inline() {
                let Selection { from, to } = ctx.selection;
                ReplaceStep::new(Span::new(from, to), Fragment::from(node))
                    .apply(ctx.doc)
                    .ok()
                    .or_else(|| rejected(&name, "inline content is not allowed here"))
            } else {
                let rp = ctx.doc.resolve(ctx.selection.from).ok()?;
                insert_block_after(&rp, node).or_else(|| rejected(&name, "no place for the block"))
            }
        })
    })
}

/// Insert a block after the innermost ancestor of the position that can be followed by it
pub(crate) fn insert_block_after(rp: &ResolvedPos, node: Node) -> Option<Node> {
    if rp.depth() == 0 {
        let pos = rp.pos();
        return ReplaceStep::new(Span::new(pos, pos), Fragment::from(node))
            .apply(rp.doc())
            .ok();
    }
    (1..=rp.depth()).rev().find_map(|depth| {
        let pos = rp.after(depth)?;
        ReplaceStep::new(Span::new(pos, pos), Fragment::from(node.clone()))
            .apply(rp.doc())
            .ok()
    })
}

/// Replace the ancestor at `depth` with the given nodes
pub(crate) fn replace_ancestor(rp: &ResolvedPos, depth: usize, nodes: Fragment) -> Option<Node> {
    let from = rp.before(depth)?;
    let to = rp.after(depth)?;
    ReplaceStep::new(Span::new(from, to), nodes).apply(rp.doc()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::default_schema;
    use crate::markdown::helper::Builder;

    fn run(schema: &Schema, name: &str, attrs: Attrs, doc: &Node, sel: Selection) -> Option<Node> {
        let factory = schema.command(name).unwrap();
        apply_command(schema, &factory, &attrs, doc, sel)
    }

    #[test]
    fn test_toggle_mark() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("hello"));
        let strong = run(&schema, "strong", Attrs::new(), &doc, Selection::new(1, 6)).unwrap();
        assert_eq!(strong, b.doc(b.p(b.strong("hello"))));
        let plain = run(&schema, "strong", Attrs::new(), &strong, Selection::new(1, 6)).unwrap();
        assert_eq!(plain, doc);
    }

    #[test]
    fn test_toggle_mark_needs_a_range() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("hello"));
        assert_eq!(run(&schema, "em", Attrs::new(), &doc, Selection::cursor(2)), None);
    }

    #[test]
    fn test_toggle_mark_partial_selection_adds() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p((b.em("he"), "llo")));
        let result = run(&schema, "em", Attrs::new(), &doc, Selection::new(1, 6)).unwrap();
        assert_eq!(result.normalized(), b.doc(b.p(b.em("hello"))).normalized());
    }

    #[test]
    fn test_toggle_link_with_other_href_replaces() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p(b.link("a", "x")));
        let attrs = Attrs::new().with("href", "b");
        let result = run(&schema, "link", attrs, &doc, Selection::new(1, 2)).unwrap();
        assert_eq!(result, b.doc(b.p(b.link("b", "x"))));
    }

    #[test]
    fn test_marks_are_not_added_in_code() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.code_block("", "let"));
        assert_eq!(run(&schema, "strong", Attrs::new(), &doc, Selection::new(1, 4)), None);
    }

    #[test]
    fn test_insert_inline_node() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("ab"));
        let attrs = Attrs::new().with("markup", "smile");
        let result = run(&schema, "emoji", attrs, &doc, Selection::cursor(2)).unwrap();
        assert_eq!(result, b.doc(b.p(("a", b.emoji("smile"), "b"))));
    }

    #[test]
    fn test_insert_block_after_current() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc((b.p("one"), b.p("two")));
        let result = run(&schema, "horizontal_rule", Attrs::new(), &doc, Selection::cursor(2)).unwrap();
        assert_eq!(result, b.doc((b.p("one"), b.hr(), b.p("two"))));
    }

    #[test]
    fn test_insert_requires_attrs() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let doc = b.doc(b.p("ab"));
        assert_eq!(run(&schema, "image", Attrs::new(), &doc, Selection::cursor(2)), None);
    }
}
