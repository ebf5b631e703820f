//! # The document model
//!
//! This module is derived from the `prosemirror-model` package, with node and mark types
//! allocated at runtime from the composed extensions.
mod attrs;
mod content;
mod fragment;
mod marks;
mod node;
mod record;
mod resolved_pos;
mod schema;
pub(crate) mod util;

pub use attrs::{coerce_attrs, compute_attrs, AttrError, AttrKind, AttrSpec, AttrValue, Attrs};
pub use content::{compile_content, ContentExprError, ContentMatch};
pub use fragment::Fragment;
pub use marks::{Mark, MarkSet};
pub use node::{Node, Text};
pub use record::{record_to_tree, tree_to_record, MarkRecord, NodeRecord, RecordError};
pub(crate) use resolved_pos::Index;
pub use resolved_pos::{ResolveErr, ResolvedPos};
pub use schema::{
    ContentError, MarkSpec, MarkType, MarkTypeRef, NodeSpec, NodeType, NodeTypeRef, Schema,
    TOP_NODE,
};

#[cfg(test)]
mod tests {
    use super::{Attrs, ContentError, Index, MarkSet, Node, ResolvedPos};
    use crate::extensions::default_schema;
    use crate::markdown::helper::Builder;
    use std::ops::Deref;

    #[test]
    fn test_size() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        assert_eq!(b.text("Hello").node_size(), 5);
        assert_eq!(b.text("\u{1F60A}").node_size(), 2);

        let test_3 = b.p((b.strong("Hallo"), "Foo"));
        assert_eq!(test_3.node_size(), 10);
        let ct_3 = test_3.content();
        assert_eq!(ct_3.find_index(0, false), Ok(Index::new(0, 0)));
        assert_eq!(ct_3.find_index(4, false), Ok(Index::new(0, 0)));
        assert_eq!(ct_3.find_index(5, false), Ok(Index::new(1, 5)));
        assert_eq!(ct_3.find_index(7, false), Ok(Index::new(1, 5)));
        assert_eq!(ct_3.find_index(8, false), Ok(Index::new(2, 8)));
        assert_eq!(ct_3.find_index(9, false), Err(()));

        assert_eq!(
            ResolvedPos::resolve(&test_3, 0),
            Ok(ResolvedPos::new(0, vec![(&test_3, 0, 0)], 0))
        );
    }

    #[derive(Debug, Copy, Clone, PartialEq)]
    struct Sol<'a> {
        node: &'a Node,
        start: usize,
        end: usize,
    }

    fn sol(node: &Node, start: usize, end: usize) -> Sol {
        Sol { node, start, end }
    }

    #[derive(Copy, Clone, Debug, PartialEq)]
    enum Exp<'a> {
        Node(&'a Node),
        Str(&'static str),
        Null,
    }

    fn matches(actual: Option<std::borrow::Cow<Node>>, expected: Exp) -> bool {
        match (actual, expected) {
            (Some(node), Exp::Node(exp)) => node.deref() == exp,
            (Some(node), Exp::Str(text)) => node.text_content() == text,
            (None, Exp::Null) => true,
            _ => false,
        }
    }

    #[test]
    fn test_resolve() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let test_doc = b.doc((b.p("ab"), b.blockquote(b.p((b.em("cd"), "ef")))));
        let _doc = sol(&test_doc, 0, 12);
        let _p1 = sol(test_doc.child(0).unwrap(), 1, 3);
        let _blk = sol(test_doc.child(1).unwrap(), 5, 11);
        let _p2 = sol(_blk.node.child(0).unwrap(), 6, 10);

        let expected = [
            (&[_doc][..], 0, Exp::Null, Exp::Node(_p1.node)),
            (&[_doc, _p1], 0, Exp::Null, Exp::Str("ab")),
            (&[_doc, _p1], 1, Exp::Str("a"), Exp::Str("b")),
            (&[_doc, _p1], 2, Exp::Str("ab"), Exp::Null),
            (&[_doc], 4, Exp::Node(_p1.node), Exp::Node(_blk.node)),
            (&[_doc, _blk], 0, Exp::Null, Exp::Node(_p2.node)),
            (&[_doc, _blk, _p2], 0, Exp::Null, Exp::Str("cd")),
            (&[_doc, _blk, _p2], 1, Exp::Str("c"), Exp::Str("d")),
            (&[_doc, _blk, _p2], 2, Exp::Str("cd"), Exp::Str("ef")),
            (&[_doc, _blk, _p2], 3, Exp::Str("e"), Exp::Str("f")),
            (&[_doc, _blk, _p2], 4, Exp::Str("ef"), Exp::Null),
            (&[_doc, _blk], 6, Exp::Node(_p2.node), Exp::Null),
            (&[_doc], 12, Exp::Node(_blk.node), Exp::Null),
        ];

        for (pos, (path, parent_offset, before, after)) in expected.iter().enumerate() {
            let pos = test_doc.resolve(pos).unwrap();
            assert_eq!(pos.depth, path.len() - 1);

            for (i, exp_i) in path.iter().enumerate() {
                let act = sol(pos.node(i), pos.start(i), pos.end(i));
                assert_eq!((i, &act), (i, exp_i));
                if i > 0 {
                    assert_eq!(pos.before(i), Some(exp_i.start - 1));
                    assert_eq!(pos.after(i), Some(exp_i.end + 1));
                }
            }
            assert_eq!(pos.parent_offset, *parent_offset);
            assert!(matches(pos.node_before(), *before));
            assert!(matches(pos.node_after(), *after));
        }
    }

    #[test]
    fn test_checked_constructor_rejects_invalid_content() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let err = schema
            .node("doc", &Attrs::new(), vec![b.text("loose")], MarkSet::new())
            .unwrap_err();
        assert_eq!(err, ContentError::InvalidContent("doc".into()));
        assert!(schema
            .node("doc", &Attrs::new(), vec![b.p("ok")], MarkSet::new())
            .is_ok());
        assert_eq!(
            schema.text("", MarkSet::new()).unwrap_err(),
            ContentError::EmptyText
        );
    }

    #[test]
    fn test_mark_set_order_and_exclusion() {
        let schema = default_schema();
        let strong = schema.mark("strong", &Attrs::new()).unwrap();
        let em = schema.mark("em", &Attrs::new()).unwrap();
        let set = MarkSet::from_marks(vec![strong.clone(), em.clone()]);
        let names: Vec<&str> = set.iter().map(|m| m.type_name()).collect();
        let rank = |n: &str| schema.mark_type(n).unwrap().rank();
        assert_eq!(rank(names[0]) < rank(names[1]), true);

        let a = schema
            .mark("link", &Attrs::new().with("href", "a"))
            .unwrap();
        let b = schema
            .mark("link", &Attrs::new().with("href", "b"))
            .unwrap();
        let links = b.add_to_set(&a.add_to_set(&MarkSet::new()));
        assert_eq!(links.len(), 1);
        assert_eq!(links.find("link").unwrap().attrs().get_str("href"), Some("b"));
        assert!(em.is_in_set(&set));
        assert!(!em.is_in_set(&em.remove_from_set(&set)));
    }

    #[test]
    fn test_normalized_merges_text_and_collapses_attrs() {
        let schema = default_schema();
        let b = Builder::new(&schema);
        let para = b.p(("a", "b"));
        // the builder keeps both text nodes
        let split = para.copy(super::Fragment::from(vec![b.text("a"), b.text("b")]));
        assert_eq!(split.child_count(), 2);
        assert_eq!(split.normalized().child_count(), 1);

        let code = b.code_block("", "x");
        let blank = code.with_attrs(code.attrs().clone().with("language", ""));
        assert_eq!(blank.normalized(), code.normalized());
    }
}
