use crate::model::{AttrError, Node, ResolveErr};
use displaydoc::Display;
use thiserror::Error;

/// Different ways a step application can fail
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum StepError {
    /// Invalid indices
    Resolve(#[from] ResolveErr),
    /// The range {from}..{to} does not lie within a single parent
    NotFlat {
        /// Start of the range
        from: usize,
        /// End of the range
        to: usize,
    },
    /// The new content does not fit into `{0}`
    InvalidContent(String),
    /// There is no node at position {0}
    NoNodeAt(usize),
    /// Unknown node type `{0}`
    UnknownType(String),
    /// Invalid attributes
    Attr(#[from] AttrError),
}

/// The result of [applying](StepKind::apply) a step. Contains either a
/// new document or a failure value.
pub type StepResult = Result<Node, StepError>;

/// A step object represents an atomic change.
///
/// It generally applies only to the document it was created for, since the positions
/// stored in it will only make sense for that document.
pub trait StepKind {
    /// Applies this step to the given document, returning a result
    /// object that either indicates failure, if the step can not be
    /// applied to this document, or indicates success by containing a
    /// transformed document.
    fn apply(&self, doc: &Node) -> StepResult;
}
