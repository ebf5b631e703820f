//! # Extensions
//!
//! An extension declares one node or mark type together with everything the engine needs to
//! read, write and edit it. Extensions are composed into a [`Schema`](crate::model::Schema)
//! with [`compose_schema`].
mod compose;

pub use compose::{compose_schema, compose_schema_with, SchemaError};

use crate::commands::CommandFactory;
use crate::markdown::{
    BlockRule, Escape, InlineRule, MarkWriter, MarkdownWriter, NodeWriter, Placement, Token,
    TokenToTree,
};
use crate::model::{Attrs, MarkSpec, Node, NodeSpec};
use derivative::Derivative;
use std::sync::Arc;

/// Whether an extension declares a node or a mark
#[derive(Debug, Clone)]
pub enum ExtensionKind {
    /// A node type
    Node(NodeSpec),
    /// A mark type
    Mark(MarkSpec),
}

/// How the type of an extension is written as markdown
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub enum ToMarkdown {
    /// A node writer
    Node(#[derivative(Debug = "ignore")] NodeWriter),
    /// A mark writer
    Mark(MarkWriter),
}

/// The descriptor of one node or mark type and its markdown and command contributions
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Extension {
    /// The name of the node or mark type
    pub name: String,
    /// The schema contribution
    pub kind: ExtensionKind,
    /// Block tokenizer rules
    #[derivative(Debug = "ignore")]
    pub block_rules: Vec<(Placement, Arc<dyn BlockRule>)>,
    /// Inline tokenizer rules
    #[derivative(Debug = "ignore")]
    pub inline_rules: Vec<(Placement, Arc<dyn InlineRule>)>,
    /// Delimiter strings handled by the delimiter engine, for marks
    pub delimiters: Vec<String>,
    /// Names of `:::name` container directives that produce this node
    pub container_directives: Vec<String>,
    /// Names of `::name[..](..)` leaf directives that produce this node
    pub leaf_directives: Vec<String>,
    /// Token kinds mapped to this type. Defaults to the name of the type.
    pub token_kinds: Vec<String>,
    /// Computes attributes from a token. Defaults to the token attributes.
    #[derivative(Debug = "ignore")]
    pub token_to_tree: Option<TokenToTree>,
    /// The markdown writer
    pub to_markdown: Option<ToMarkdown>,
    /// Characters in text that need escaping because of this extension's syntax
    pub escapes: Vec<Escape>,
    /// Named commands
    #[derivative(Debug = "ignore")]
    pub commands: Vec<(String, CommandFactory)>,
}

impl Extension {
    fn new(name: &str, kind: ExtensionKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            block_rules: Vec::new(),
            inline_rules: Vec::new(),
            delimiters: Vec::new(),
            container_directives: Vec::new(),
            leaf_directives: Vec::new(),
            token_kinds: Vec::new(),
            token_to_tree: None,
            to_markdown: None,
            escapes: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// An extension declaring a node type
    pub fn node(name: &str, spec: NodeSpec) -> Self {
        Self::new(name, ExtensionKind::Node(spec))
    }

    /// An extension declaring a mark type
    pub fn mark(name: &str, spec: MarkSpec) -> Self {
        Self::new(name, ExtensionKind::Mark(spec))
    }

    /// True for node extensions
    pub fn is_node(&self) -> bool {
        matches!(self.kind, ExtensionKind::Node(_))
    }

    /// Add a block rule
    pub fn block_rule<R: BlockRule + 'static>(mut self, placement: Placement, rule: R) -> Self {
        self.block_rules.push((placement, Arc::new(rule)));
        self
    }

    /// Add an inline rule
    pub fn inline_rule<R: InlineRule + 'static>(mut self, placement: Placement, rule: R) -> Self {
        self.inline_rules.push((placement, Arc::new(rule)));
        self
    }

    /// Add a delimiter string
    pub fn delimiter(mut self, delim: &str) -> Self {
        self.delimiters.push(delim.to_owned());
        self
    }

    /// Add a container directive name
    pub fn container_directive(mut self, name: &str) -> Self {
        self.container_directives.push(name.to_owned());
        self
    }

    /// Add a leaf directive name
    pub fn leaf_directive(mut self, name: &str) -> Self {
        self.leaf_directives.push(name.to_owned());
        self
    }

    /// Add a token kind
    pub fn token(mut self, kind: &str) -> Self {
        self.token_kinds.push(kind.to_owned());
        self
    }

    /// Set the token attribute mapping
    pub fn token_to_tree<F>(mut self, f: F) -> Self
    where
        F: Fn(&Token) -> Attrs + Send + Sync + 'static,
    {
        self.token_to_tree = Some(Arc::new(f));
        self
    }

    /// Set the node writer
    pub fn node_writer<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut MarkdownWriter, &Node, &Node, usize) + Send + Sync + 'static,
    {
        self.to_markdown = Some(ToMarkdown::Node(Arc::new(f)));
        self
    }

    /// Set the mark writer
    pub fn mark_writer(mut self, writer: MarkWriter) -> Self {
        self.to_markdown = Some(ToMarkdown::Mark(writer));
        self
    }

    /// Add an escape rule
    pub fn escape(mut self, escape: Escape) -> Self {
        self.escapes.push(escape);
        self
    }

    /// Add a named command
    pub fn command(mut self, name: &str, factory: CommandFactory) -> Self {
        self.commands.push((name.to_owned(), factory));
        self
    }

    /// The token kinds this extension handles
    pub fn handled_tokens(&self) -> Vec<String> {
        if self.token_kinds.is_empty() {
            vec![self.name.clone()]
        } else {
            self.token_kinds.clone()
        }
    }
}
