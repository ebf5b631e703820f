//! # Helpers
//!
//! This module contains functions to create nodes programmatically, mostly for tests. The
//! helpers panic on unknown types or invalid attributes, and they do not merge text nodes.
//!
//! See also: <https://github.com/prosemirror/prosemirror-test-builder>
use crate::model::{AttrValue, Attrs, Fragment, Mark, MarkSet, Node, Schema};

/// Values that can be turned into child nodes
pub trait IntoNodes {
    /// Create the nodes
    fn into_nodes(self, b: &Builder) -> Vec<Node>;
}

impl IntoNodes for &str {
    fn into_nodes(self, b: &Builder) -> Vec<Node> {
        if self.is_empty() {
            vec![]
        } else {
            vec![b.text(self)]
        }
    }
}

impl IntoNodes for String {
    fn into_nodes(self, b: &Builder) -> Vec<Node> {
        self.as_str().into_nodes(b)
    }
}

impl IntoNodes for Node {
    fn into_nodes(self, _b: &Builder) -> Vec<Node> {
        vec![self]
    }
}

impl IntoNodes for () {
    fn into_nodes(self, _b: &Builder) -> Vec<Node> {
        vec![]
    }
}

impl<T: IntoNodes> IntoNodes for Vec<T> {
    fn into_nodes(self, b: &Builder) -> Vec<Node> {
        self.into_iter().flat_map(|t| t.into_nodes(b)).collect()
    }
}

macro_rules! tuple_into_nodes {
    ($($name:ident),+) => {
        impl<$($name: IntoNodes),+> IntoNodes for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_nodes(self, b: &Builder) -> Vec<Node> {
                let ($($name,)+) = self;
                let mut nodes = Vec::new();
                $(nodes.extend($name.into_nodes(b));)+
                nodes
            }
        }
    };
}

tuple_into_nodes!(A);
tuple_into_nodes!(A, B);
tuple_into_nodes!(A, B, C);
tuple_into_nodes!(A, B, C, D);
tuple_into_nodes!(A, B, C, D, E);
tuple_into_nodes!(A, B, C, D, E, F);
tuple_into_nodes!(A, B, C, D, E, F, G);

/// Creates nodes of a schema
#[derive(Debug, Clone, Copy)]
pub struct Builder<'a> {
    schema: &'a Schema,
}

impl<'a> Builder<'a> {
    /// A builder for the given schema
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Create a node of any type. Content is not checked.
    pub fn node<C: IntoNodes>(&self, name: &str, attrs: Attrs, content: C) -> Node {
        let ty = self
            .schema
            .node_type(name)
            .unwrap_or_else(|| panic!("unknown node type `{}`", name));
        let content = Fragment::from(content.into_nodes(self));
        ty.create(&attrs, content, MarkSet::new())
            .unwrap_or_else(|e| panic!("invalid attributes for `{}`: {}", name, e))
    }

    /// Create a mark
    pub fn mark(&self, name: &str, attrs: Attrs) -> Mark {
        self.schema
            .mark(name, &attrs)
            .unwrap_or_else(|e| panic!("invalid mark `{}`: {}", name, e))
    }

    /// Create a text node
    pub fn text(&self, text: &str) -> Node {
        self.marked(text, vec![])
    }

    /// Create a text node with marks
    pub fn marked(&self, text: &str, marks: Vec<Mark>) -> Node {
        self.schema
            .text(text, MarkSet::from_marks(marks))
            .unwrap_or_else(|e| panic!("invalid text: {}", e))
    }

    /// Create a document node.
    pub fn doc<C: IntoNodes>(&self, content: C) -> Node {
        self.node("doc", Attrs::new(), content)
    }

    /// Create a paragraph node.
    pub fn p<C: IntoNodes>(&self, content: C) -> Node {
        self.node("paragraph", Attrs::new(), content)
    }

    /// Create a heading node.
    pub fn h<C: IntoNodes>(&self, level: i64, content: C) -> Node {
        self.node("heading", Attrs::new().with("level", level), content)
    }

    /// Create a blockquote node.
    pub fn blockquote<C: IntoNodes>(&self, content: C) -> Node {
        self.node("blockquote", Attrs::new(), content)
    }

    /// Create a code block node. An empty language is left unset.
    pub fn code_block(&self, language: &str, text: &str) -> Node {
        let language = if language.is_empty() {
            AttrValue::Null
        } else {
            language.into()
        };
        self.node("code_block", Attrs::new().with("language", language), text)
    }

    /// Create a math block node.
    pub fn math_block(&self, text: &str) -> Node {
        self.node("math_block", Attrs::new(), text)
    }

    /// Create a horizontal rule.
    pub fn hr(&self) -> Node {
        self.node("horizontal_rule", Attrs::new(), ())
    }

    /// Create a bullet list.
    pub fn ul<C: IntoNodes>(&self, content: C) -> Node {
        self.node("bullet_list", Attrs::new(), content)
    }

    /// Create an ordered list starting at `order`.
    pub fn ol<C: IntoNodes>(&self, order: i64, content: C) -> Node {
        self.node("ordered_list", Attrs::new().with("order", order), content)
    }

    /// Create a list item.
    pub fn li<C: IntoNodes>(&self, content: C) -> Node {
        self.node("list_item", Attrs::new(), content)
    }

    /// Create a checkbox list.
    pub fn checkbox_list<C: IntoNodes>(&self, content: C) -> Node {
        self.node("checkbox_list", Attrs::new(), content)
    }

    /// Create a checkbox item.
    pub fn checkbox<C: IntoNodes>(&self, checked: bool, content: C) -> Node {
        self.node("checkbox_item", Attrs::new().with("checked", checked), content)
    }

    /// Create a table.
    pub fn table<C: IntoNodes>(&self, content: C) -> Node {
        self.node("table", Attrs::new(), content)
    }

    /// Create a table row.
    pub fn tr<C: IntoNodes>(&self, content: C) -> Node {
        self.node("tr", Attrs::new(), content)
    }

    /// Create a header cell holding one paragraph.
    pub fn th<C: IntoNodes>(&self, alignment: Option<&str>, content: C) -> Node {
        let p = self.p(content);
        self.node("th", Attrs::new().with("alignment", alignment), p)
    }

    /// Create a cell holding one paragraph.
    pub fn td<C: IntoNodes>(&self, alignment: Option<&str>, content: C) -> Node {
        let p = self.p(content);
        self.node("td", Attrs::new().with("alignment", alignment), p)
    }

    /// Create a notice.
    pub fn notice<C: IntoNodes>(&self, style: &str, content: C) -> Node {
        self.node("notice", Attrs::new().with("style", style), content)
    }

    /// Create an image.
    pub fn image(&self, src: &str, alt: &str) -> Node {
        let alt = if alt.is_empty() { None } else { Some(alt) };
        self.node("image", Attrs::new().with("src", src).with("alt", alt), ())
    }

    /// Create a hard break.
    pub fn br(&self) -> Node {
        self.node("hard_break", Attrs::new(), ())
    }

    /// Create an emoji.
    pub fn emoji(&self, name: &str) -> Node {
        self.node("emoji", Attrs::new().with("markup", name), ())
    }

    /// Create an inline math node.
    pub fn math(&self, text: &str) -> Node {
        self.node("math_inline", Attrs::new(), text)
    }

    /// Create a strong text node.
    pub fn strong(&self, text: &str) -> Node {
        self.marked(text, vec![self.mark("strong", Attrs::new())])
    }

    /// Create an emphasized text node.
    pub fn em(&self, text: &str) -> Node {
        self.marked(text, vec![self.mark("em", Attrs::new())])
    }

    /// Create an inline code text node.
    pub fn code(&self, text: &str) -> Node {
        self.marked(text, vec![self.mark("code_inline", Attrs::new())])
    }

    /// Create a linked text node.
    pub fn link(&self, href: &str, text: &str) -> Node {
        self.marked(text, vec![self.mark("link", Attrs::new().with("href", href))])
    }
}
