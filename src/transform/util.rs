use crate::model::{Fragment, Node, ResolvedPos};
use serde::{Deserialize, Serialize};

/// A span within a document
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, new)]
pub struct Span {
    /// Start of the span
    pub from: usize,
    /// End of the span
    pub to: usize,
}

/// Rebuild the ancestors of the node at `depth` after its content was replaced.
pub(crate) fn replace_at_depth(rp: &ResolvedPos, depth: usize, content: Fragment) -> Node {
    let mut node = rp.node(depth).copy(content);
    for d in (0..depth).rev() {
        let parent = rp.node(d);
        let index = rp.index(d);
        let content = match parent.content().replace_child(index, node.clone()) {
            Some(content) => content.into_owned(),
            None => parent.content().clone(),
        };
        node = parent.copy(content);
    }
    node
}
