use super::{util::replace_at_depth, Span, StepError, StepKind, StepResult};
use crate::model::{Attrs, Fragment, Node, NodeTypeRef};

/// Replace the content between two positions that share a parent with new content. The
/// resulting content of the parent must be valid for its type.
#[derive(Debug, Clone, PartialEq, new)]
pub struct ReplaceStep {
    /// The affected span
    pub span: Span,
    /// The content to put in place of the span
    pub content: Fragment,
}

impl StepKind for ReplaceStep {
    fn apply(&self, doc: &Node) -> StepResult {
        let Span { from, to } = self.span;
        if from > to {
            return Err(StepError::NotFlat { from, to });
        }
        let rp_from = doc.resolve(from)?;
        let rp_to = doc.resolve(to)?;
        let depth = rp_from.depth();
        if rp_to.depth() != depth || rp_from.start(depth) != rp_to.start(depth) {
            return Err(StepError::NotFlat { from, to });
        }
        let parent = rp_from.parent();
        let start = rp_from.start(depth);
        let content = parent
            .content()
            .cut(..from - start)
            .append(self.content.clone())
            .append(parent.content().cut(to - start..));
        if !parent.node_type().valid_content(&content) {
            return Err(StepError::InvalidContent(parent.type_name().to_owned()));
        }
        Ok(replace_at_depth(&rp_from, depth, content))
    }
}

/// Change the type and attributes of the node directly after a position.
#[derive(Debug, Clone, PartialEq, new)]
pub struct SetMarkupStep {
    /// The position before the node
    pub pos: usize,
    /// The new type
    pub node_type: NodeTypeRef,
    /// The new attributes, defaults are filled in
    pub attrs: Attrs,
}

impl StepKind for SetMarkupStep {
    fn apply(&self, doc: &Node) -> StepResult {
        let rp = doc.resolve(self.pos)?;
        let depth = rp.depth();
        let target = rp
            .node_after()
            .filter(|n| !n.is_text())
            .ok_or(StepError::NoNodeAt(self.pos))?
            .into_owned();
        if !self.node_type.valid_content(target.content()) {
            return Err(StepError::InvalidContent(self.node_type.name().to_owned()));
        }
        let updated = self
            .node_type
            .create(&self.attrs, target.content().clone(), target.marks().clone())?;
        let parent = rp.parent();
        let index = rp.index(depth);
        let content = parent
            .content()
            .replace_child(index, updated)
            .ok_or(StepError::NoNodeAt(self.pos))?
            .into_owned();
        if !parent.node_type().valid_content(&content) {
            return Err(StepError::InvalidContent(parent.type_name().to_owned()));
        }
        Ok(replace_at_depth(&rp, depth, content))
    }
}
