//! # The document transformations
//!
mod mark_step;
mod replace_step;
mod step;
mod util;

pub use mark_step::{AddMarkStep, RemoveMarkStep};
pub use replace_step::{ReplaceStep, SetMarkupStep};
pub use step::{StepError, StepKind, StepResult};
pub use util::Span;
pub(crate) use util::replace_at_depth;

use crate::model::Node;

/// A list of steps
pub type Steps = Vec<Step>;

/// Steps that can be applied on a document
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace some content
    Replace(ReplaceStep),
    /// Change the type of a node
    SetMarkup(SetMarkupStep),
    /// Add a mark to a span
    AddMark(AddMarkStep),
    /// Remove a mark from a span
    RemoveMark(RemoveMarkStep),
}

impl Step {
    /// Apply the step to the given node
    pub fn apply(&self, doc: &Node) -> StepResult {
        match self {
            Self::Replace(r_step) => r_step.apply(doc),
            Self::SetMarkup(sm_step) => sm_step.apply(doc),
            Self::AddMark(am_step) => am_step.apply(doc),
            Self::RemoveMark(rm_step) => rm_step.apply(doc),
        }
    }
}

/// Apply a list of steps in order, stopping at the first failure
pub fn apply_steps(doc: &Node, steps: &[Step]) -> StepResult {
    let mut doc = doc.clone();
    for step in steps {
        doc = step.apply(&doc)?;
    }
    Ok(doc)
}
