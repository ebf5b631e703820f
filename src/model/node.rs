use super::{
    util, AttrValue, Attrs, ContentError, Fragment, MarkSet, NodeTypeRef, ResolveErr, ResolvedPos,
};
use std::borrow::Cow;
use std::fmt;
use std::ops::RangeBounds;

/// This class represents a node in the tree that makes up a document. So a document is
/// an instance of Node, with children that are also instances of Node.
///
/// Nodes are persistent data structures. Instead of changing them, you create new ones with the
/// content you want.
#[derive(Clone, PartialEq)]
pub struct Node {
    ty: NodeTypeRef,
    attrs: Attrs,
    content: Fragment,
    marks: MarkSet,
    text: Option<Text>,
}

impl Node {
    pub(crate) fn new_unchecked(
        ty: NodeTypeRef,
        attrs: Attrs,
        content: Fragment,
        marks: MarkSet,
    ) -> Self {
        Node {
            ty,
            attrs,
            content,
            marks,
            text: None,
        }
    }

    pub(crate) fn new_text(ty: NodeTypeRef, text: Text, marks: MarkSet) -> Self {
        Node {
            ty,
            attrs: Attrs::new(),
            content: Fragment::new(),
            marks,
            text: Some(text),
        }
    }

    /// The type of node that this is.
    pub fn node_type(&self) -> &NodeTypeRef {
        &self.ty
    }

    /// The name of the type of this node
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// An object mapping attribute names to values.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// A container holding the node's children.
    pub fn content(&self) -> &Fragment {
        &self.content
    }

    /// The marks (things like whether it is emphasized or part of a link) applied to this node.
    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    /// Get the text if this is a text node
    pub fn text(&self) -> Option<&str> {
        self.text.as_ref().map(Text::as_str)
    }

    /// Get the text with its utf-16 length if this is a text node
    pub fn text_node(&self) -> Option<&Text> {
        self.text.as_ref()
    }

    /// Get the child node at the given index, if it exists.
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.maybe_child(index)
    }

    /// The number of children that the node has.
    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    /// The first child, if any
    pub fn first_child(&self) -> Option<&Node> {
        self.content.first_child()
    }

    /// The last child, if any
    pub fn last_child(&self) -> Option<&Node> {
        self.content.last_child()
    }

    /// True when this is a text node.
    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// True when this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.ty.is_leaf()
    }

    /// True when this is a block (non-inline node)
    pub fn is_block(&self) -> bool {
        self.ty.is_block()
    }

    /// True when this is an inline node (a text node or a node that can appear among text).
    pub fn is_inline(&self) -> bool {
        self.ty.is_inline()
    }

    /// True when this is a textblock node, a block node with inline content.
    pub fn is_textblock(&self) -> bool {
        self.ty.is_textblock()
    }

    /// True when this is an atom, i.e. when it does not have directly editable content.
    pub fn is_atom(&self) -> bool {
        self.ty.is_atom()
    }

    /// The size of this node, as defined by the integer-based indexing scheme. For text nodes,
    /// this is the amount of characters. For other leaf nodes, it is one. For non-leaf nodes, it
    /// is the size of the content plus two (the start and end token).
    pub fn node_size(&self) -> usize {
        match &self.text {
            Some(text) => text.len_utf16(),
            None if self.is_leaf() => 1,
            None => self.content.size() + 2,
        }
    }

    /// Represents `.content.size` in JS
    pub fn content_size(&self) -> usize {
        self.content.size()
    }

    /// Create a new node with the same markup as this node, containing the given content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node {
            ty: self.ty.clone(),
            attrs: self.attrs.clone(),
            content,
            marks: self.marks.clone(),
            text: self.text.clone(),
        }
    }

    /// Create a copy of this node, with the given set of marks instead of the node's own marks.
    pub fn mark(&self, marks: MarkSet) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    /// Create a copy of this node with other attributes.
    pub fn with_attrs(&self, attrs: Attrs) -> Node {
        Node {
            attrs,
            ..self.clone()
        }
    }

    /// Create a copy of this text node with other text.
    pub fn with_text(&self, text: Text) -> Node {
        Node {
            text: Some(text),
            ..self.clone()
        }
    }

    /// Compare the markup (type, attributes, and marks) of this node to those of another.
    /// Returns true if both have the same markup.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.ty == other.ty && self.attrs == other.attrs && self.marks == other.marks
    }

    /// Create a copy of this node with only the content between the given positions.
    pub fn cut<R: RangeBounds<usize>>(&self, range: R) -> Cow<Node> {
        let from = util::from(&range);

        if let Some(text) = &self.text {
            let len = text.len_utf16();
            let to = util::to(&range, len);

            if from == 0 && to == len {
                return Cow::Borrowed(self);
            }
            let (_, rest) = util::split_at_utf16(text.as_str(), from);
            let (rest, _) = util::split_at_utf16(rest, to - from);

            Cow::Owned(self.with_text(Text::from(rest.to_owned())))
        } else {
            let content_size = self.content_size();
            let to = util::to(&range, content_size);

            if from == 0 && to == content_size {
                Cow::Borrowed(self)
            } else {
                Cow::Owned(self.copy(self.content.cut(from..to)))
            }
        }
    }

    /// Resolve the given position in the document, returning a struct with information about its
    /// context.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ResolveErr> {
        ResolvedPos::resolve(self, pos)
    }

    /// Concatenates all the text nodes found in this node and its children.
    pub fn text_content(&self) -> String {
        if let Some(text) = &self.text {
            text.as_str().to_owned()
        } else {
            let mut buf = String::new();
            self.content
                .text_between(&mut buf, true, 0, self.content.size(), Some(""), None);
            buf
        }
    }

    /// Invoke a callback for all descendant nodes recursively between the given two positions
    /// that are relative to start of this node's content.
    pub fn nodes_between<F: FnMut(&Node, usize) -> bool>(&self, from: usize, to: usize, f: &mut F) {
        self.content.nodes_between(from, to, f, 0)
    }

    /// Call the given callback for every descendant node.
    pub fn descendants<F: FnMut(&Node, usize) -> bool>(&self, f: &mut F) {
        self.nodes_between(0, self.content_size(), f)
    }

    /// Check whether this node and its descendants conform to the schema, and return an error
    /// when they do not.
    pub fn check(&self) -> Result<(), ContentError> {
        if let Some(text) = &self.text {
            if text.as_str().is_empty() {
                return Err(ContentError::EmptyText);
            }
        } else if !self.ty.valid_content(&self.content) {
            let marks_ok = self
                .content
                .children()
                .iter()
                .all(|c| self.ty.allows_marks(c.marks()));
            return Err(if marks_ok {
                ContentError::InvalidContent(self.ty.name().to_owned())
            } else {
                ContentError::InvalidMarks(self.ty.name().to_owned())
            });
        }
        self.ty.compute_attrs(&self.attrs)?;
        for child in self.content.children() {
            child.check()?;
        }
        Ok(())
    }

    /// Return the canonical form of this tree: adjacent text nodes with the same marks are
    /// merged and empty optional string attributes are replaced by their default.
    pub fn normalized(&self) -> Node {
        let attrs = normalize_attrs(&self.attrs, self.ty.attr_specs());
        if self.is_text() {
            return self.clone();
        }
        let mut content = Fragment::new();
        for child in self.content.children() {
            content = content.append(Fragment::from(vec![child.normalized()]));
        }
        Node {
            attrs,
            content,
            ..self.clone()
        }
    }
}

fn normalize_attrs(attrs: &Attrs, specs: &[(String, super::AttrSpec)]) -> Attrs {
    attrs
        .iter()
        .map(|(name, value)| {
            let default_null = specs
                .iter()
                .any(|(n, s)| n == name && s.default == Some(AttrValue::Null));
            let value = match value {
                AttrValue::String(s) if s.is_empty() && default_null => AttrValue::Null,
                other => other.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.text {
            if self.marks.is_empty() {
                return write!(f, "{:?}", text.as_str());
            }
            return write!(f, "{:?}{:?}", self.marks, text.as_str());
        }
        write!(f, "{}", self.ty.name())?;
        if !self.attrs.is_empty() {
            write!(f, "{:?}", self.attrs)?;
        }
        if !self.marks.is_empty() {
            write!(f, "{:?}", self.marks)?;
        }
        if self.content.child_count() > 0 {
            f.debug_list().entries(self.content.children()).finish()?;
        }
        Ok(())
    }
}

/// A string that stores its length in utf-16
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text {
    len_utf16: usize,
    content: String,
}

impl Text {
    /// Return the contained string
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// The length of this string if it were encoded in utf-16
    pub fn len_utf16(&self) -> usize {
        self.len_utf16
    }
}

impl From<String> for Text {
    fn from(src: String) -> Text {
        Text {
            len_utf16: src.encode_utf16().count(),
            content: src,
        }
    }
}
