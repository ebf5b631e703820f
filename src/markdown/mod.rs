//! # Markdown
//!
//! Reading and writing the markdown dialect of a schema. The grammar is assembled from the
//! extensions at composition: block and inline tokenizer rules, the delimiter table, the
//! directive table, token handlers, writers and escapes.
//!
//! The tokenizer follows the design of `markdown-it` and the serializer the one of
//! `prosemirror-markdown`.
mod block;
mod delimiter;
mod directive;
mod escape;
mod from_markdown;
pub mod helper;
mod inline;
mod options;
mod ruler;
mod to_markdown;
mod token;

pub use block::{
    expand_tabs, fence_open, indent, is_blank, is_fence_close, strip_indent, BlockRule,
    BlockState, Nested,
};
pub use directive::{parse_directive_info, DirectiveInfo};
pub use escape::{Escape, EscapePredicate};
pub use from_markdown::{
    parse, parse_with_diagnostics, tokenize, DegradedKind, ParseDegraded, Parsed,
};
pub use inline::{label_end, link_target, unescape, InlineRule, InlineState, LinkTarget};
pub use options::{HardBreakStyle, MarkdownOptions};
pub use ruler::Placement;
pub use to_markdown::{serialize, MarkDelim, MarkWriter, MarkdownWriter, NodeWriter};
pub use token::{Nesting, Token, INLINE, TEXT};

pub(crate) use block::paragraph_tokens;
pub(crate) use delimiter::{DelimiterTable, EmphasisRule};
pub(crate) use directive::{ContainerDirectiveRule, DirectiveTable, LeafDirectiveRule};
pub(crate) use inline::{EscapeRule, NewlineRule};
pub(crate) use ruler::{order_rules, OrderError};

use crate::model::Attrs;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Computes the attributes of a node or mark from the token that produced it
pub type TokenToTree = Arc<dyn Fn(&Token) -> Attrs + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HandlerTarget {
    Node(String),
    Mark(String),
}

#[derive(Clone)]
pub(crate) struct TokenHandler {
    pub(crate) target: HandlerTarget,
    pub(crate) attrs: Option<TokenToTree>,
}

/// The markdown grammar of a schema
#[derive(Default)]
pub struct Grammar {
    pub(crate) block_rules: Vec<Arc<dyn BlockRule>>,
    pub(crate) inline_rules: Vec<Arc<dyn InlineRule>>,
    pub(crate) inline_markers: BTreeMap<char, Vec<usize>>,
    pub(crate) delimiters: DelimiterTable,
    pub(crate) directives: DirectiveTable,
    pub(crate) handlers: BTreeMap<String, TokenHandler>,
    pub(crate) node_writers: BTreeMap<String, NodeWriter>,
    pub(crate) mark_writers: BTreeMap<String, MarkWriter>,
    pub(crate) escapes: Vec<Escape>,
}

impl Grammar {
    /// The names of the block rules, in the order they are tried
    pub fn block_rule_names(&self) -> Vec<&str> {
        self.block_rules.iter().map(|r| r.name()).collect()
    }

    /// The names of the inline rules, in the order they are tried
    pub fn inline_rule_names(&self) -> Vec<&str> {
        self.inline_rules.iter().map(|r| r.name()).collect()
    }

    pub(crate) fn index_markers(&mut self) {
        self.inline_markers.clear();
        for (i, rule) in self.inline_rules.iter().enumerate() {
            for marker in rule.markers() {
                self.inline_markers.entry(marker).or_default().push(i);
            }
        }
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("block_rules", &self.block_rule_names())
            .field("inline_rules", &self.inline_rule_names())
            .field("delimiters", &self.delimiters)
            .field("directives", &self.directives)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
