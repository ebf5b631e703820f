use super::{
    compute_attrs, AttrError, AttrSpec, Attrs, ContentMatch, Fragment, Mark, MarkSet, Node, Text,
};
use crate::commands::CommandFactory;
use crate::markdown::{Grammar, MarkdownOptions};
use displaydoc::Display;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A shared reference to a node type
pub type NodeTypeRef = Arc<NodeType>;
/// A shared reference to a mark type
pub type MarkTypeRef = Arc<MarkType>;

/// Errors when constructing or checking nodes against the schema
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum ContentError {
    /// unknown node type `{0}`
    UnknownNodeType(String),
    /// unknown mark type `{0}`
    UnknownMarkType(String),
    /// invalid content for node `{0}`
    InvalidContent(String),
    /// invalid marks on a child of `{0}`
    InvalidMarks(String),
    /// text nodes must not be empty
    EmptyText,
    /// {0}
    Attr(#[from] AttrError),
}

/// The schema contribution of a node extension
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// The content expression for this node. Leaf nodes have none.
    pub content: Option<String>,
    /// The groups this node belongs to, separated by spaces
    pub group: Option<String>,
    /// Whether this is an inline node
    pub inline: bool,
    /// Atom nodes are leafs for editing purposes, even with content
    pub atom: bool,
    /// Isolating nodes are not split or joined by commands
    pub isolating: bool,
    /// Defining nodes keep their type when their content is replaced
    pub defining: bool,
    /// The content of this node is code
    pub code: bool,
    /// The marks allowed inside this node: `_` for all, an empty string for none, or names
    /// and groups separated by spaces. Defaults to all marks in textblocks.
    pub marks: Option<String>,
    /// The attributes of this node, in declaration order
    pub attrs: Vec<(String, AttrSpec)>,
}

impl NodeSpec {
    /// A node with the given content expression
    pub fn with_content(content: &str) -> Self {
        Self {
            content: Some(content.to_owned()),
            ..Self::default()
        }
    }

    /// A node without content
    pub fn leaf() -> Self {
        Self::default()
    }

    /// Set the groups
    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_owned());
        self
    }

    /// Mark as inline
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// Mark as atom
    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    /// Mark as isolating
    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    /// Mark as defining
    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    /// Mark as code
    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    /// Set the allowed marks
    pub fn marks(mut self, marks: &str) -> Self {
        self.marks = Some(marks.to_owned());
        self
    }

    /// Add an attribute
    pub fn attr(mut self, name: &str, spec: AttrSpec) -> Self {
        self.attrs.push((name.to_owned(), spec));
        self
    }
}

/// The schema contribution of a mark extension
#[derive(Debug, Clone)]
pub struct MarkSpec {
    /// The attributes of this mark
    pub attrs: Vec<(String, AttrSpec)>,
    /// The marks this one excludes: `_` for all, names or groups separated by spaces.
    /// Defaults to excluding other marks of the same type.
    pub excludes: Option<String>,
    /// The groups this mark belongs to
    pub group: Option<String>,
    /// Whether the mark extends to text typed at its end
    pub inclusive: bool,
}

impl Default for MarkSpec {
    fn default() -> Self {
        Self {
            attrs: Vec::new(),
            excludes: None,
            group: None,
            inclusive: true,
        }
    }
}

impl MarkSpec {
    /// Set the excluded marks
    pub fn excludes(mut self, excludes: &str) -> Self {
        self.excludes = Some(excludes.to_owned());
        self
    }

    /// Set the groups
    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_owned());
        self
    }

    /// Make the mark non-inclusive
    pub fn exclusive_end(mut self) -> Self {
        self.inclusive = false;
        self
    }

    /// Add an attribute
    pub fn attr(mut self, name: &str, spec: AttrSpec) -> Self {
        self.attrs.push((name.to_owned(), spec));
        self
    }
}

/// Node types are objects allocated once per `Schema` and used to tag `Node` instances. They
/// contain information about the node type, such as its name and what kind of node it
/// represents.
pub struct NodeType {
    pub(crate) name: String,
    pub(crate) spec: NodeSpec,
    pub(crate) groups: Vec<String>,
    pub(crate) content_match: ContentMatch,
    pub(crate) inline_content: bool,
    pub(crate) mark_set: Option<Vec<String>>,
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name)
    }
}

impl NodeType {
    /// The name the node type has in this schema.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The spec this type is based on
    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    /// The groups this type belongs to
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Test whether the type is in the given group
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// The starting match of the node type's content expression.
    pub fn content_match(&self) -> &ContentMatch {
        &self.content_match
    }

    /// True if this is the text node type.
    pub fn is_text(&self) -> bool {
        self.name == "text"
    }

    /// True if this is an inline type.
    pub fn is_inline(&self) -> bool {
        self.spec.inline || self.is_text()
    }

    /// True if this is a block type
    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    /// True if this is a textblock type, a block that contains inline content.
    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    /// True if this node type has inline content
    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    /// True for node types that allow no content.
    pub fn is_leaf(&self) -> bool {
        self.content_match.is_empty()
    }

    /// True when this node is an atom, i.e. when it does not have directly editable content.
    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec.atom
    }

    /// True for code nodes
    pub fn is_code(&self) -> bool {
        self.spec.code
    }

    /// True if this type has attributes without a default
    pub fn has_required_attrs(&self) -> bool {
        self.spec.attrs.iter().any(|(_, a)| a.is_required())
    }

    /// The declared attributes of this type
    pub fn attr_specs(&self) -> &[(String, AttrSpec)] {
        &self.spec.attrs
    }

    /// Compute the full attribute map, with defaults filled in
    pub fn compute_attrs(&self, attrs: &Attrs) -> Result<Attrs, AttrError> {
        compute_attrs(&self.spec.attrs, attrs)
    }

    /// Check whether the given mark type is allowed in this node.
    pub fn allows_mark_type(&self, name: &str) -> bool {
        match &self.mark_set {
            None => true,
            Some(set) => set.iter().any(|m| m == name),
        }
    }

    /// Test whether the given set of marks are allowed in this node.
    pub fn allows_marks(&self, marks: &MarkSet) -> bool {
        marks.iter().all(|m| self.allows_mark_type(m.type_name()))
    }

    /// Returns true if the given fragment is valid content for this node type.
    pub fn valid_content(&self, content: &Fragment) -> bool {
        match self.content_match.match_fragment(content) {
            Some(end) if end.valid_end() => content
                .children()
                .iter()
                .all(|child| self.allows_marks(child.marks())),
            _ => false,
        }
    }

    /// Create a node of this type. The attributes are checked and defaulted, the content is
    /// not checked.
    pub fn create(
        self: &Arc<Self>,
        attrs: &Attrs,
        content: Fragment,
        marks: MarkSet,
    ) -> Result<Node, AttrError> {
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::new_unchecked(self.clone(), attrs, content, marks))
    }

    /// Like [`NodeType::create`], but check the given content against the node type's content
    /// restrictions.
    pub fn create_checked(
        self: &Arc<Self>,
        attrs: &Attrs,
        content: Fragment,
        marks: MarkSet,
    ) -> Result<Node, ContentError> {
        if !self.valid_content(&content) {
            return Err(ContentError::InvalidContent(self.name.clone()));
        }
        Ok(self.create(attrs, content, marks)?)
    }

    /// Like [`NodeType::create`], but see if it is necessary to add nodes to the start or end
    /// of the given fragment to make it fit the node. If no fitting wrapping can be found,
    /// return `None`.
    pub fn create_and_fill(
        self: &Arc<Self>,
        schema: &Schema,
        attrs: &Attrs,
        content: Fragment,
        marks: MarkSet,
    ) -> Option<Node> {
        let attrs = self.compute_attrs(attrs).ok()?;
        let content = self.fill(schema, content, 0)?;
        Some(Node::new_unchecked(self.clone(), attrs, content, marks))
    }

    pub(crate) fn create_and_fill_depth(self: &Arc<Self>, schema: &Schema, depth: usize) -> Option<Node> {
        let attrs = self.compute_attrs(&Attrs::new()).ok()?;
        let content = self.fill(schema, Fragment::new(), depth)?;
        Some(Node::new_unchecked(self.clone(), attrs, content, MarkSet::new()))
    }

    fn fill(&self, schema: &Schema, content: Fragment, depth: usize) -> Option<Fragment> {
        if depth > MAX_FILL_DEPTH {
            return None;
        }
        let mut content = content;
        if content.size() > 0 {
            let before = self
                .content_match
                .fill_before_depth(schema, &content, false, depth)?;
            content = before.append(content);
        }
        let matched = self.content_match.match_fragment(&content)?;
        let after = matched.fill_before_depth(schema, &Fragment::new(), true, depth)?;
        Some(content.append(after))
    }
}

const MAX_FILL_DEPTH: usize = 32;

/// Like nodes, marks (which are associated with nodes to signify things like emphasis or being
/// part of a link) are tagged with type objects, which are instantiated once per `Schema`.
pub struct MarkType {
    pub(crate) name: String,
    pub(crate) rank: usize,
    pub(crate) spec: MarkSpec,
    pub(crate) excluded: Vec<String>,
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name)
    }
}

impl MarkType {
    /// The name of the mark type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The position of this type in the schema's mark order
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The spec this type is based on
    pub fn spec(&self) -> &MarkSpec {
        &self.spec
    }

    /// Whether the mark extends to content inserted at its end
    pub fn is_inclusive(&self) -> bool {
        self.spec.inclusive
    }

    /// Queries whether a given mark type is excluded by this one.
    pub fn excludes(&self, other: &MarkType) -> bool {
        self.excluded.iter().any(|e| *e == other.name)
    }

    /// The declared attributes of this type
    pub fn attr_specs(&self) -> &[(String, AttrSpec)] {
        &self.spec.attrs
    }

    /// Create a mark of this type
    pub fn create(self: &Arc<Self>, attrs: &Attrs) -> Result<Mark, AttrError> {
        Ok(Mark {
            ty: self.clone(),
            attrs: compute_attrs(&self.spec.attrs, attrs)?,
        })
    }
}

/// A document schema. Holds node and mark type objects for the nodes and marks that may occur
/// in conforming documents, the markdown grammar for reading and writing them, and the named
/// commands that edit them.
pub struct Schema {
    pub(crate) nodes: Vec<NodeTypeRef>,
    pub(crate) marks: Vec<MarkTypeRef>,
    pub(crate) node_index: BTreeMap<String, usize>,
    pub(crate) mark_index: BTreeMap<String, usize>,
    pub(crate) grammar: Grammar,
    pub(crate) commands: BTreeMap<String, CommandFactory>,
    pub(crate) options: MarkdownOptions,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.nodes)
            .field("marks", &self.marks)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The name of the top node type
pub const TOP_NODE: &str = "doc";

impl Schema {
    /// Look up a node type
    pub fn node_type(&self, name: &str) -> Option<&NodeTypeRef> {
        self.node_index.get(name).map(|i| &self.nodes[*i])
    }

    /// Look up a mark type
    pub fn mark_type(&self, name: &str) -> Option<&MarkTypeRef> {
        self.mark_index.get(name).map(|i| &self.marks[*i])
    }

    /// The type of the top node of a document
    pub fn top_node_type(&self) -> &NodeTypeRef {
        // composition guarantees `doc` exists
        &self.nodes[self.node_index[TOP_NODE]]
    }

    /// All node types, in extension order
    pub fn node_types(&self) -> &[NodeTypeRef] {
        &self.nodes
    }

    /// All mark types, in rank order
    pub fn mark_types(&self) -> &[MarkTypeRef] {
        &self.marks
    }

    /// The markdown options
    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// The markdown grammar composed from the extensions
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Create a text node in the schema. Empty text nodes are not allowed.
    pub fn text(&self, text: &str, marks: MarkSet) -> Result<Node, ContentError> {
        if text.is_empty() {
            return Err(ContentError::EmptyText);
        }
        let ty = self
            .node_type("text")
            .ok_or_else(|| ContentError::UnknownNodeType("text".into()))?;
        Ok(Node::new_text(ty.clone(), Text::from(text.to_owned()), marks))
    }

    /// Create a node in this schema, checking attributes and content.
    pub fn node(
        &self,
        name: &str,
        attrs: &Attrs,
        content: Vec<Node>,
        marks: MarkSet,
    ) -> Result<Node, ContentError> {
        let ty = self
            .node_type(name)
            .ok_or_else(|| ContentError::UnknownNodeType(name.to_owned()))?;
        ty.create_checked(attrs, Fragment::from(content), marks)
    }

    /// Create a mark with the given type and attributes.
    pub fn mark(&self, name: &str, attrs: &Attrs) -> Result<Mark, ContentError> {
        let ty = self
            .mark_type(name)
            .ok_or_else(|| ContentError::UnknownMarkType(name.to_owned()))?;
        Ok(ty.create(attrs)?)
    }

    /// Look up a command: the exact name first, then the `create<Name>` convention.
    pub fn command(&self, name: &str) -> Option<CommandFactory> {
        self.commands
            .get(name)
            .or_else(|| {
                self.commands
                    .get(&format!("create{}", crate::util::camel_case(name)))
            })
            .cloned()
    }
}
